use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{TrackerError, TrackerResult};
use crate::timer::TrackerState;

use super::loop_worker::{cadence_loop, CadenceConfig, CapturePipeline};

const ENABLE_LOGS: bool = true;

use crate::log_error;

/// Owns the single cadence task. At most one loop exists at a time.
#[derive(Default)]
pub struct CadenceController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl CadenceController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn start(
        &mut self,
        state: Arc<Mutex<TrackerState>>,
        pipeline: CapturePipeline,
        elapsed_tx: Arc<watch::Sender<u64>>,
        config: CadenceConfig,
    ) -> TrackerResult<()> {
        if self.is_running() {
            return Err(TrackerError::InvalidState("cadence loop already running"));
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(cadence_loop(
            state,
            pipeline,
            elapsed_tx,
            config,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the loop and waits for it to exit. An in-flight capture is
    /// allowed to finish (bounded by the capture timeout).
    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                log_error!("cadence loop task failed to join: {err}");
            }
        }
    }
}
