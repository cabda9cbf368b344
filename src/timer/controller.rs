use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    time::Duration,
};

use crate::{
    error::{TrackerError, TrackerResult},
    models::{NetworkIdentity, SessionIdentity, TimeReport},
    network::{format_mac, IdentityResolver},
    reporting::Reporter,
    sensing::{CadenceConfig, CadenceController, CaptureTransport, CapturePipeline, ScreenSource},
    settings::AgentSettings,
};

use super::{TrackerState, TrackerStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub status: TrackerStatus,
    pub elapsed_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub identity: Option<SessionIdentity>,
}

/// Owns the one tracking session of this process.
///
/// `start` and `stop` are serialized through the cadence controller lock;
/// the tick loop only ever takes the state lock, and only to read.
#[derive(Clone)]
pub struct SessionTracker {
    state: Arc<Mutex<TrackerState>>,
    cadence: Arc<Mutex<CadenceController>>,
    pipeline: CapturePipeline,
    reporter: Arc<dyn Reporter>,
    resolver: Arc<dyn IdentityResolver>,
    elapsed_tx: Arc<watch::Sender<u64>>,
    tick_interval: Duration,
    capture_every_secs: u64,
    capture_timeout: Duration,
}

impl SessionTracker {
    pub fn new(
        source: Arc<dyn ScreenSource>,
        reporter: Arc<dyn Reporter>,
        resolver: Arc<dyn IdentityResolver>,
        settings: &AgentSettings,
    ) -> Self {
        let pipeline = CapturePipeline::new(
            CaptureTransport::new(source),
            reporter.clone(),
            settings.staging_dir.clone(),
        );
        let (elapsed_tx, _) = watch::channel(0);

        Self {
            state: Arc::new(Mutex::new(TrackerState::default())),
            cadence: Arc::new(Mutex::new(CadenceController::new())),
            pipeline,
            reporter,
            resolver,
            elapsed_tx: Arc::new(elapsed_tx),
            tick_interval: settings.tick_interval(),
            capture_every_secs: settings.capture_every_secs,
            capture_timeout: settings.capture_timeout(),
        }
    }

    pub async fn status(&self) -> TrackerStatus {
        self.state.lock().await.status()
    }

    /// Whole seconds since `start`, or 0 while idle.
    pub async fn elapsed_secs(&self) -> u64 {
        self.state.lock().await.elapsed_secs()
    }

    /// Elapsed seconds as published by each tick; holds the final duration
    /// after `stop`.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.elapsed_tx.subscribe()
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        let guard = self.state.lock().await;
        let session = guard.session();
        TrackerSnapshot {
            status: guard.status(),
            elapsed_secs: guard.elapsed_secs(),
            started_at: session.map(|s| s.started_at),
            identity: session.map(|s| s.identity.clone()),
        }
    }

    pub async fn start(&self, identity: SessionIdentity) -> TrackerResult<TrackerSnapshot> {
        let mut cadence = self.cadence.lock().await;

        {
            let mut state = self.state.lock().await;
            if !state.begin_session(identity.clone(), Utc::now()) {
                return Err(TrackerError::InvalidState("a tracking session is already active"));
            }
        }

        self.elapsed_tx.send_replace(0);

        let config = CadenceConfig {
            tick_interval: self.tick_interval,
            capture_every_secs: self.capture_every_secs,
            capture_timeout: self.capture_timeout,
        };
        if let Err(err) = cadence.start(
            self.state.clone(),
            self.pipeline.clone(),
            self.elapsed_tx.clone(),
            config,
        ) {
            self.state.lock().await.end_session();
            return Err(err);
        }
        drop(cadence);

        log_info!(
            "Tracking started for {} ({}) on {} task {}",
            identity.employee_name,
            identity.employee_id,
            identity.project_name,
            display_task(&identity)
        );
        Ok(self.snapshot().await)
    }

    /// Ends the session, sends the time report, then one final capture.
    ///
    /// Returns `Ok(None)` without reporting anything when no session is
    /// active. Report and capture failures are logged, not returned.
    pub async fn stop(&self, identity: SessionIdentity) -> TrackerResult<Option<TimeReport>> {
        let mut cadence = self.cadence.lock().await;

        let (session, end_time, duration_seconds) = {
            let mut state = self.state.lock().await;
            let Some(session) = state.end_session() else {
                log_debug!("stop ignored: no active session");
                return Ok(None);
            };
            let (end_time, duration_seconds) = session.finish();
            (session, end_time, duration_seconds)
        };

        cadence.stop().await;
        drop(cadence);
        self.elapsed_tx.send_replace(duration_seconds);

        if session.identity != identity {
            log_warn!(
                "stop identity differs from the started session (started {:?}, stopping {:?})",
                session.identity,
                identity
            );
        }

        let network = self.resolve_network().await;
        let report = TimeReport {
            employee_id: identity.employee_id.clone(),
            task_id: identity.task_id.clone(),
            start_time: session.started_at,
            end_time,
            duration_seconds,
            ip: network.ip,
            mac: network.mac,
        };

        match self.reporter.send_time_report(&report).await {
            Ok(()) => log_info!(
                "Time report sent for {}: {}s",
                report.employee_id,
                report.duration_seconds
            ),
            Err(err) => log_error!("time report for {} failed: {err}", report.employee_id),
        }

        match tokio::time::timeout(self.capture_timeout, self.pipeline.perform_capture(&identity))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log_error!("final capture failed for {}: {err}", identity.employee_id),
            Err(_) => log_warn!(
                "final capture timed out (> {:?}) for {}",
                self.capture_timeout,
                identity.employee_id
            ),
        }

        Ok(Some(report))
    }

    async fn resolve_network(&self) -> NetworkIdentity {
        let resolver = self.resolver.clone();
        match tokio::task::spawn_blocking(move || resolver.resolve()).await {
            Ok(identity) => identity,
            Err(err) => {
                log_error!("network identity worker failed: {err}");
                NetworkIdentity {
                    ip: "127.0.0.1".into(),
                    mac: format_mac([0; 6]),
                }
            }
        }
    }
}

fn display_task(identity: &SessionIdentity) -> String {
    identity
        .task_id
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string)
}
