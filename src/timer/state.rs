use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::models::SessionIdentity;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerStatus {
    Idle,
    Active,
}

/// The live session. Elapsed time is measured against a monotonic anchor
/// taken at the same moment as `started_at`, so wall-clock jumps during a
/// session don't distort durations.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: SessionIdentity,
    pub started_at: DateTime<Utc>,
    anchor: Instant,
}

impl Session {
    pub fn elapsed_secs(&self) -> u64 {
        self.anchor.elapsed().as_secs()
    }

    /// End time and whole-second duration if the session ended now.
    /// `duration == floor(end - started_at)` always holds.
    pub fn finish(&self) -> (DateTime<Utc>, u64) {
        let elapsed = self.anchor.elapsed();
        let end = TimeDelta::from_std(elapsed)
            .ok()
            .and_then(|delta| self.started_at.checked_add_signed(delta))
            .unwrap_or_else(Utc::now);
        (end, elapsed.as_secs())
    }
}

/// `started_at` exists exactly when the tracker is active.
#[derive(Debug, Clone, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Active(Session),
}

impl TrackerState {
    pub fn status(&self) -> TrackerStatus {
        match self {
            TrackerState::Idle => TrackerStatus::Idle,
            TrackerState::Active(_) => TrackerStatus::Active,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            TrackerState::Idle => None,
            TrackerState::Active(session) => Some(session),
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.session().map_or(0, Session::elapsed_secs)
    }

    /// Returns `false` if a session is already running.
    pub fn begin_session(&mut self, identity: SessionIdentity, started_at: DateTime<Utc>) -> bool {
        if matches!(self, TrackerState::Active(_)) {
            return false;
        }
        *self = TrackerState::Active(Session {
            identity,
            started_at,
            anchor: Instant::now(),
        });
        true
    }

    pub fn end_session(&mut self) -> Option<Session> {
        match std::mem::take(self) {
            TrackerState::Active(session) => Some(session),
            TrackerState::Idle => None,
        }
    }
}
