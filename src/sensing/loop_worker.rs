use std::{path::PathBuf, sync::Arc};

use chrono::Local;
use tokio::{
    sync::{watch, Mutex},
    time::{Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::TrackerResult,
    models::{CaptureEvent, SessionIdentity},
    reporting::Reporter,
    timer::{cadence::CaptureGate, TrackerState},
};

use super::{
    capture::CaptureTransport,
    staging::{safe_timestamp, stage_capture},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Grab + stage + upload, shared by the cadence loop and the stop sequence.
#[derive(Clone)]
pub struct CapturePipeline {
    transport: CaptureTransport,
    reporter: Arc<dyn Reporter>,
    staging_dir: Option<PathBuf>,
}

impl CapturePipeline {
    pub fn new(
        transport: CaptureTransport,
        reporter: Arc<dyn Reporter>,
        staging_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            transport,
            reporter,
            staging_dir,
        }
    }

    pub async fn perform_capture(&self, identity: &SessionIdentity) -> TrackerResult<()> {
        let capture_start = Instant::now();

        let png_bytes = self.transport.capture().await?;
        let screenshot_ms = capture_start.elapsed().as_millis();

        let event = CaptureEvent::new(
            identity,
            safe_timestamp(Local::now().naive_local()),
            png_bytes,
        );

        if let Some(root) = &self.staging_dir {
            match stage_capture(root, &event).await {
                Ok(path) => log_debug!("staged capture at {}", path.display()),
                Err(err) => log_warn!("failed to stage capture under {}: {err}", root.display()),
            }
        }

        self.reporter.upload_screenshot(&event).await?;

        log_info!(
            "Capture uploaded for {} / {} ({} bytes, screenshot: {}ms, total: {}ms)",
            event.project_name,
            event.employee_name,
            event.png_bytes.len(),
            screenshot_ms,
            capture_start.elapsed().as_millis()
        );
        Ok(())
    }
}

pub struct CadenceConfig {
    pub tick_interval: Duration,
    pub capture_every_secs: u64,
    pub capture_timeout: Duration,
}

/// Ticks while the session is active: publishes elapsed seconds and fires
/// captures when the gate says so. Ends on cancellation or when the tracker
/// is found idle.
pub async fn cadence_loop(
    state: Arc<Mutex<TrackerState>>,
    pipeline: CapturePipeline,
    elapsed_tx: Arc<watch::Sender<u64>>,
    config: CadenceConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut gate = CaptureGate::new(config.capture_every_secs);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("cadence loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let (elapsed, identity) = {
                    let guard = state.lock().await;
                    match guard.session() {
                        Some(session) => (session.elapsed_secs(), session.identity.clone()),
                        None => {
                            log_debug!("tracker idle, cadence loop exiting");
                            break;
                        }
                    }
                };

                elapsed_tx.send_replace(elapsed);

                if !gate.should_capture(elapsed) {
                    continue;
                }

                let fut = pipeline.perform_capture(&identity);
                match tokio::time::timeout(config.capture_timeout, fut).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => log_error!(
                        "capture at {}s failed for employee {}: {err}",
                        elapsed,
                        identity.employee_id
                    ),
                    Err(_) => log_warn!(
                        "capture at {}s timed out (> {:?}) for employee {}",
                        elapsed,
                        config.capture_timeout,
                        identity.employee_id
                    ),
                }
            }
        }
    }
}
