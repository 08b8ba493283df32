// AIScope Core Services

pub mod config_store;
pub mod providers;
pub mod demo;
pub mod detection;

pub use config_store::*;
pub use providers::*;

// Re-export detection entry points
pub use detection::{Detector, DetectionError, PollSettings};
