//! Non-retryable failure detector.

use super::config::WatchdogConfig;
use super::types::{ErrorTriplet, NonRetryableDetection};
use indexmap::IndexMap;

/// Detect a recurring identical failure using the default threshold.
#[must_use]
pub fn detect_non_retryable(recent_errors: &[ErrorTriplet]) -> Option<NonRetryableDetection> {
    NonRetryableDetector::default().detect(recent_errors)
}

/// Flags a (tool, target, error) triplet that keeps failing the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonRetryableDetector {
    threshold: usize,
}

impl Default for NonRetryableDetector {
    fn default() -> Self {
        Self::new(&WatchdogConfig::default())
    }
}

impl NonRetryableDetector {
    /// Create a detector from the configured threshold.
    #[must_use]
    pub fn new(config: &WatchdogConfig) -> Self {
        Self {
            threshold: config.non_retryable_threshold.max(2),
        }
    }

    /// Return the first triplet, in first-seen order, that recurs enough times.
    #[must_use]
    pub fn detect(&self, recent_errors: &[ErrorTriplet]) -> Option<NonRetryableDetection> {
        if recent_errors.len() < self.threshold {
            return None;
        }

        let mut seen: IndexMap<String, (&ErrorTriplet, usize)> = IndexMap::new();
        for error in recent_errors {
            let entry = seen.entry(error.key()).or_insert((error, 0));
            entry.1 = entry.1.saturating_add(1);
        }

        seen.into_values()
            .find(|(_, count)| *count >= self.threshold)
            .map(|(error, count)| NonRetryableDetection {
                tool: error.tool.clone(),
                target: error.target.clone(),
                error_snippet: error.error_snippet.clone(),
                count,
            })
    }
}
