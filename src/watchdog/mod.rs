//! Stuck-loop watchdog.
//!
//! Provides the loop and non-retryable detectors plus a thin coordinating service.

mod config;
mod loop_detector;
mod non_retryable;
mod service;
mod types;

pub use config::WatchdogConfig;
pub use loop_detector::{detect_loop, LoopDetector};
pub use non_retryable::{detect_non_retryable, NonRetryableDetector};
pub use service::Watchdog;
pub use types::{
    ErrorTriplet, LoopDetection, LoopKind, NonRetryableDetection, Severity, ToolCall,
    WatchdogError,
};
