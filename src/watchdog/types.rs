//! Types for the watchdog detectors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator used when joining identity key components.
pub(crate) const KEY_SEPARATOR: &str = "::";

/// One tool invocation as recorded by the orchestration loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name.
    pub tool: String,
    /// Optional target the tool acted on (file path, URL, query).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ToolCall {
    /// Create a call without a target.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            target: None,
        }
    }

    /// Create a call against a target.
    #[must_use]
    pub fn with_target(tool: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            target: Some(target.into()),
        }
    }

    /// Key used for equality in pattern matching: `tool` or `tool::target`.
    ///
    /// An empty target is treated the same as a missing one.
    #[must_use]
    pub fn identity_key(&self) -> String {
        match self.target.as_deref() {
            Some(target) if !target.is_empty() => {
                format!("{}{KEY_SEPARATOR}{target}", self.tool)
            }
            _ => self.tool.clone(),
        }
    }
}

/// One failed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTriplet {
    /// Tool name.
    pub tool: String,
    /// Target the tool acted on.
    pub target: String,
    /// Short excerpt of the error message.
    pub error_snippet: String,
}

impl ErrorTriplet {
    /// Create a new error triplet.
    #[must_use]
    pub fn new(
        tool: impl Into<String>,
        target: impl Into<String>,
        error_snippet: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            target: target.into(),
            error_snippet: error_snippet.into(),
        }
    }

    /// Full `tool::target::snippet` key.
    #[must_use]
    pub fn key(&self) -> String {
        [
            self.tool.as_str(),
            self.target.as_str(),
            self.error_snippet.as_str(),
        ]
        .join(KEY_SEPARATOR)
    }
}

/// Shape of a detected loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopKind {
    /// The same identity key recurs across the window.
    GenericRepeat,
    /// Strict two-key alternation at the tail of the window.
    PingPong,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenericRepeat => f.write_str("generic repeat"),
            Self::PingPong => f.write_str("ping-pong"),
        }
    }
}

/// How strongly the watchdog reacts to a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory, the agent continues.
    Warning,
    /// Terminal, the run should stop.
    Kill,
}

impl Severity {
    /// Whether the run should be terminated.
    #[must_use]
    pub const fn is_kill(self) -> bool {
        matches!(self, Self::Kill)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Kill => f.write_str("kill"),
        }
    }
}

/// Verdict of the loop detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopDetection {
    /// Loop shape.
    #[serde(rename = "type")]
    pub kind: LoopKind,
    /// Repeated identity key, or `"B ↔ A"` for ping-pong.
    pub pattern: String,
    /// Occurrences (generic repeat) or alternations (ping-pong).
    pub count: usize,
    /// Warning or kill.
    pub severity: Severity,
}

impl fmt::Display for LoopDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} \"{}\" x{}",
            self.severity, self.kind, self.pattern, self.count
        )
    }
}

/// Verdict of the non-retryable detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonRetryableDetection {
    /// Tool name.
    pub tool: String,
    /// Target the tool acted on.
    pub target: String,
    /// Error excerpt that keeps recurring.
    pub error_snippet: String,
    /// How many times the identical failure was seen.
    pub count: usize,
}

impl fmt::Display for NonRetryableDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "non-retryable: {} on \"{}\" failed {} times: {}",
            self.tool, self.target, self.count, self.error_snippet
        )
    }
}

/// Errors produced while loading watchdog configuration.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// Thresholds violate an ordering or range constraint.
    #[error("invalid watchdog config: {0}")]
    InvalidConfig(String),
    /// Config sources could not be loaded or deserialized.
    #[error("failed to load watchdog config: {0}")]
    Config(#[from] config::ConfigError),
}
