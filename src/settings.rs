use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const CONFIG_ENV: &str = "SHIFTWATCH_CONFIG";
const API_BASE_ENV: &str = "SHIFTWATCH_API_BASE";
const STAGING_DIR_ENV: &str = "SHIFTWATCH_STAGING_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentSettings {
    /// Base URL of the recording service, without a trailing slash.
    pub api_base: String,
    pub tick_interval_ms: u64,
    pub capture_every_secs: u64,
    /// Upper bound for one capture + upload, so a hung request can't stall the loop.
    pub capture_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub staging_dir: Option<PathBuf>,
    /// Overrides the platform screenshot command. `{path}` is replaced by the output file.
    pub screen_command: Option<Vec<String>>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:5000".into(),
            tick_interval_ms: 1000,
            capture_every_secs: 10,
            capture_timeout_secs: 20,
            request_timeout_secs: 15,
            staging_dir: None,
            screen_command: None,
        }
    }
}

impl AgentSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: AgentSettings,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing file yields defaults; a malformed
    /// one is logged and also falls back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings at {}: {err}", path.display());
                AgentSettings::default()
            })
        } else {
            AgentSettings::default()
        };

        Ok(Self { path, data })
    }

    /// Resolves the settings file from `SHIFTWATCH_CONFIG`, then the user config dir.
    pub fn load_default() -> Result<Self> {
        let path = match env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("shiftwatch")
                .join("settings.json"),
        };
        let mut store = Self::new(path)?;
        store.apply_env_overrides(|key| env::var(key).ok());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn agent(&self) -> AgentSettings {
        self.data.clone()
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.data.api_base = api_base.trim().trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup(STAGING_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.data.staging_dir = Some(PathBuf::from(dir));
        }
    }
}
