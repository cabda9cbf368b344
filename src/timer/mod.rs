pub mod cadence;
pub mod controller;
pub mod state;

pub use controller::{SessionTracker, TrackerSnapshot};
pub use state::{Session, TrackerState, TrackerStatus};
