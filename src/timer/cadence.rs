/// Decides which ticks trigger a capture.
///
/// Fires on the first tick whose elapsed value has reached the next multiple
/// of `every_secs`. On punctual one-second ticks this is exactly the set
/// 0, 10, 20, ...; when a tick is delayed past a boundary the capture happens
/// late instead of being skipped.
#[derive(Debug, Clone)]
pub struct CaptureGate {
    every_secs: u64,
    next_due: u64,
}

impl CaptureGate {
    pub fn new(every_secs: u64) -> Self {
        Self {
            every_secs: every_secs.max(1),
            next_due: 0,
        }
    }

    pub fn should_capture(&mut self, elapsed_secs: u64) -> bool {
        if elapsed_secs < self.next_due {
            return false;
        }
        self.next_due = (elapsed_secs / self.every_secs + 1) * self.every_secs;
        true
    }
}
