#![deny(missing_docs)]
//! Agent watchdog library.
//!
//! Stateless detectors that flag a tool-calling agent stuck in a loop.

/// Loop and non-retryable failure detection.
pub mod watchdog;

pub use watchdog::{
    detect_loop, detect_non_retryable, ErrorTriplet, LoopDetection, LoopDetector, LoopKind,
    NonRetryableDetection, NonRetryableDetector, Severity, ToolCall, Watchdog, WatchdogConfig,
    WatchdogError,
};
