pub mod capture;
pub mod controller;
pub mod loop_worker;
pub mod source;
pub mod staging;

pub use capture::CaptureTransport;
pub use controller::CadenceController;
pub use loop_worker::{CadenceConfig, CapturePipeline};
pub use source::{CommandScreenSource, ScreenSource, UnavailableScreenSource};
