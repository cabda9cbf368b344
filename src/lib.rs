pub mod console;
pub mod error;
pub mod models;
pub mod network;
pub mod reporting;
pub mod sensing;
pub mod settings;
pub mod timer;
mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};

use console::{run_console, Console};
use network::SystemIdentityResolver;
use reporting::{DirectoryClient, HttpReporter};
use sensing::{CommandScreenSource, ScreenSource, UnavailableScreenSource};
use settings::{AgentSettings, SettingsStore};
use timer::SessionTracker;

pub use error::{TrackerError, TrackerResult};

fn screen_source(settings: &AgentSettings) -> Result<Arc<dyn ScreenSource>> {
    if let Some(argv) = settings.screen_command.clone() {
        let source = CommandScreenSource::new(argv).context("invalid screen_command setting")?;
        return Ok(Arc::new(source));
    }
    match CommandScreenSource::platform_default() {
        Some(source) => Ok(Arc::new(source)),
        None => {
            log::warn!("No screenshot tool known for this platform; captures will be skipped");
            Ok(Arc::new(UnavailableScreenSource))
        }
    }
}

async fn run_agent() -> Result<()> {
    let store = SettingsStore::load_default()?;
    let settings = store.agent();
    log::info!(
        "Settings from {} (service: {})",
        store.path().display(),
        settings.api_base
    );

    let reporter = HttpReporter::new(&settings.api_base, settings.request_timeout())
        .context("failed to build HTTP client")?;
    let directory = DirectoryClient::new(reporter.client().clone(), reporter.base_url());

    let tracker = SessionTracker::new(
        screen_source(&settings)?,
        Arc::new(reporter),
        Arc::new(SystemIdentityResolver),
        &settings,
    );

    run_console(Console::new(tracker, directory)).await
}

pub fn run() -> Result<()> {
    let debug_mode = std::env::var("SHIFTWATCH_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if debug_mode {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    log::info!("shiftwatch starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run_agent())
}
