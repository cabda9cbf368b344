use std::{
    env, fs,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use async_trait::async_trait;
use image::DynamicImage;
use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};

const PATH_PLACEHOLDER: &str = "{path}";

/// Platform primitive that grabs the full screen as a raster image.
///
/// The future may be dropped when a capture times out; implementations must
/// not leave work running behind it.
#[async_trait]
pub trait ScreenSource: Send + Sync {
    async fn grab(&self) -> TrackerResult<DynamicImage>;
}

/// Grabs the screen by running an OS screenshot tool that writes a file.
///
/// The argument list must contain `{path}`, which is replaced by a fresh
/// temporary file that is read back and removed afterwards.
#[derive(Debug, Clone)]
pub struct CommandScreenSource {
    argv: Vec<String>,
}

impl CommandScreenSource {
    pub fn new(argv: Vec<String>) -> TrackerResult<Self> {
        if argv.is_empty() {
            return Err(TrackerError::CaptureUnavailable(
                "screen command is empty".into(),
            ));
        }
        if !argv.iter().any(|arg| arg.contains(PATH_PLACEHOLDER)) {
            return Err(TrackerError::CaptureUnavailable(format!(
                "screen command must contain {PATH_PLACEHOLDER}"
            )));
        }
        Ok(Self { argv })
    }

    /// The stock screenshot tool for this platform, if there is one.
    pub fn platform_default() -> Option<Self> {
        let argv: Vec<&str> = if cfg!(target_os = "macos") {
            vec!["screencapture", "-x", "-t", "png", PATH_PLACEHOLDER]
        } else if cfg!(target_os = "linux") {
            if env::var_os("WAYLAND_DISPLAY").is_some() {
                vec!["grim", PATH_PLACEHOLDER]
            } else {
                vec!["import", "-window", "root", PATH_PLACEHOLDER]
            }
        } else {
            return None;
        };

        Some(Self {
            argv: argv.into_iter().map(String::from).collect(),
        })
    }

    async fn run(&self, output: &Path) -> TrackerResult<()> {
        let output = output.to_string_lossy();
        let args: Vec<String> = self.argv[1..]
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &output))
            .collect();

        let mut command = Command::new(&self.argv[0]);
        command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
        // Own group, so a timeout can take down anything the tool forked.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|err| {
            TrackerError::CaptureUnavailable(format!("failed to run {}: {err}", self.argv[0]))
        })?;
        let status = ToolProcess(child).wait().await.map_err(|err| {
            TrackerError::CaptureUnavailable(format!("failed to wait on {}: {err}", self.argv[0]))
        })?;

        if !status.success() {
            return Err(TrackerError::CaptureUnavailable(format!(
                "{} exited with {status}",
                self.argv[0]
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ScreenSource for CommandScreenSource {
    async fn grab(&self) -> TrackerResult<DynamicImage> {
        let shot = TempShot(env::temp_dir().join(format!("shiftwatch-{}.png", Uuid::new_v4())));
        self.run(&shot.0).await?;

        let path = shot.0.clone();
        tokio::task::spawn_blocking(move || {
            image::open(&path).map_err(|err| {
                TrackerError::CaptureUnavailable(format!(
                    "unreadable screenshot at {}: {err}",
                    path.display()
                ))
            })
        })
        .await
        .map_err(|err| TrackerError::CaptureUnavailable(format!("decode worker failed: {err}")))?
    }
}

/// A spawned screenshot tool. Dropping it before the tool has been reaped
/// kills the tool's whole process group.
struct ToolProcess(Child);

impl ToolProcess {
    async fn wait(mut self) -> std::io::Result<ExitStatus> {
        self.0.wait().await
    }
}

impl Drop for ToolProcess {
    fn drop(&mut self) {
        // `id` is None once the child has been reaped.
        #[cfg(unix)]
        if let Some(pid) = self.0.id() {
            // SAFETY: plain signal delivery; the group was created for this child.
            unsafe {
                libc::killpg(pid as libc::pid_t, libc::SIGKILL);
            }
        }
    }
}

/// Output file of one grab, removed however the grab ends.
struct TempShot(PathBuf);

impl Drop for TempShot {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

/// Source for platforms without a known screenshot tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableScreenSource;

#[async_trait]
impl ScreenSource for UnavailableScreenSource {
    async fn grab(&self) -> TrackerResult<DynamicImage> {
        Err(TrackerError::CaptureUnavailable(
            "no screen capture primitive on this platform".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn command_requires_path_placeholder() {
        assert!(CommandScreenSource::new(vec![]).is_err());
        assert!(CommandScreenSource::new(vec!["grim".into()]).is_err());
        assert!(CommandScreenSource::new(vec!["grim".into(), "{path}".into()]).is_ok());
    }

    #[tokio::test]
    async fn missing_program_is_capture_unavailable() {
        let source = CommandScreenSource::new(vec![
            "shiftwatch-no-such-screenshot-tool".into(),
            "{path}".into(),
        ])
        .unwrap();
        assert!(matches!(
            source.grab().await,
            Err(TrackerError::CaptureUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_source_always_fails() {
        assert!(matches!(
            UnavailableScreenSource.grab().await,
            Err(TrackerError::CaptureUnavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_writing_nothing_is_capture_unavailable() {
        let source =
            CommandScreenSource::new(vec!["sh".into(), "-c".into(), ": {path}".into()]).unwrap();
        assert!(matches!(
            source.grab().await,
            Err(TrackerError::CaptureUnavailable(message)) if message.contains("unreadable")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_grab_kills_the_tool_and_its_children() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        // The touch runs in a forked subshell, not in the tool itself.
        let script = format!("(sleep 1; touch '{}') & wait; : {{path}}", marker.display());
        let source = CommandScreenSource::new(vec!["sh".into(), "-c".into(), script]).unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(200), source.grab()).await;
        assert!(outcome.is_err(), "grab should still be waiting on the tool");

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists(), "a forked child outlived the timed-out grab");
    }
}
