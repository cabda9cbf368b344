pub mod report;
pub mod session;

pub use report::{CaptureEvent, NetworkIdentity, TimeReport};
pub use session::{RecordId, SessionIdentity};
