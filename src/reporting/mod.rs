pub mod client;
pub mod directory;

pub use client::{HttpReporter, Reporter};
pub use directory::{AssignedProject, Assignment, DirectoryClient};
