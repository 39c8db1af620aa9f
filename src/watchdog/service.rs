//! Watchdog service coordinating both detectors.

use super::config::WatchdogConfig;
use super::loop_detector::LoopDetector;
use super::non_retryable::NonRetryableDetector;
use super::types::{ErrorTriplet, LoopDetection, NonRetryableDetection, Severity, ToolCall};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Central entry point for the orchestration loop.
///
/// Holds configuration only; the caller owns both history windows.
#[derive(Debug, Clone)]
pub struct Watchdog {
    config: Arc<WatchdogConfig>,
    loop_detector: LoopDetector,
    non_retryable_detector: NonRetryableDetector,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(Arc::new(WatchdogConfig::default()))
    }
}

impl Watchdog {
    /// Create a watchdog with the given configuration.
    #[must_use]
    pub fn new(config: Arc<WatchdogConfig>) -> Self {
        Self {
            loop_detector: LoopDetector::new(&config),
            non_retryable_detector: NonRetryableDetector::new(&config),
            config,
        }
    }

    /// Create a watchdog from files and environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Arc::new(WatchdogConfig::from_env()))
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Whether detection is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check the recent call window for loops.
    #[must_use]
    pub fn check_calls(&self, recent_calls: &[ToolCall]) -> Option<LoopDetection> {
        if !self.is_enabled() {
            debug!("watchdog: detection disabled");
            return None;
        }

        let detection = self.loop_detector.detect(recent_calls)?;
        match detection.severity {
            Severity::Kill => warn!(
                loop_type = %detection.kind,
                pattern = %detection.pattern,
                count = detection.count,
                window = recent_calls.len(),
                "watchdog: LOOP DETECTED, run should stop"
            ),
            Severity::Warning => info!(
                loop_type = %detection.kind,
                pattern = %detection.pattern,
                count = detection.count,
                window = recent_calls.len(),
                "watchdog: possible loop"
            ),
        }
        Some(detection)
    }

    /// Check the recent error window for a failure that will not go away.
    #[must_use]
    pub fn check_errors(&self, recent_errors: &[ErrorTriplet]) -> Option<NonRetryableDetection> {
        if !self.is_enabled() {
            debug!("watchdog: detection disabled");
            return None;
        }

        let detection = self.non_retryable_detector.detect(recent_errors)?;
        warn!(
            tool = %detection.tool,
            target = %detection.target,
            count = detection.count,
            "watchdog: non-retryable failure"
        );
        Some(detection)
    }
}
