//! Tool call loop detector.

use super::config::WatchdogConfig;
use super::types::{LoopDetection, LoopKind, Severity, ToolCall};
use indexmap::IndexMap;
use tracing::debug;

/// Detect a loop in `recent_calls` using the default thresholds.
#[must_use]
pub fn detect_loop(recent_calls: &[ToolCall]) -> Option<LoopDetection> {
    LoopDetector::default().detect(recent_calls)
}

/// Detects repeated and alternating tool calls over a caller-owned window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopDetector {
    repeat_kill_threshold: usize,
    repeat_warning_threshold: usize,
    ping_pong_kill_threshold: usize,
    ping_pong_warning_threshold: usize,
    ping_pong_min_window: usize,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(&WatchdogConfig::default())
    }
}

impl LoopDetector {
    /// Create a loop detector from config thresholds.
    #[must_use]
    pub fn new(config: &WatchdogConfig) -> Self {
        Self {
            repeat_kill_threshold: config.repeat_kill_threshold.max(1),
            repeat_warning_threshold: config.repeat_warning_threshold.max(1),
            ping_pong_kill_threshold: config.ping_pong_kill_threshold.max(1),
            ping_pong_warning_threshold: config.ping_pong_warning_threshold.max(1),
            ping_pong_min_window: config.ping_pong_min_window.max(2),
        }
    }

    /// Classify the window, oldest call first.
    ///
    /// Kill verdicts return immediately. Among warnings a generic repeat
    /// always wins over ping-pong.
    #[must_use]
    pub fn detect(&self, recent_calls: &[ToolCall]) -> Option<LoopDetection> {
        if recent_calls.is_empty() {
            return None;
        }

        let keys: Vec<String> = recent_calls.iter().map(ToolCall::identity_key).collect();
        let counts = Self::count_keys(&keys);

        if let Some((key, &count)) = counts
            .iter()
            .find(|(_, count)| **count >= self.repeat_kill_threshold)
        {
            return Some(LoopDetection {
                kind: LoopKind::GenericRepeat,
                pattern: (*key).to_string(),
                count,
                severity: Severity::Kill,
            });
        }

        let mut best = counts
            .iter()
            .find(|(_, count)| **count >= self.repeat_warning_threshold)
            .map(|(key, &count)| LoopDetection {
                kind: LoopKind::GenericRepeat,
                pattern: (*key).to_string(),
                count,
                severity: Severity::Warning,
            });

        if let Some((key_b, key_a, alternations)) = self.tail_alternation(&keys) {
            debug!(
                key_a,
                key_b,
                alternations,
                "loop_detector: tail alternation measured"
            );
            let pattern = format!("{key_b} ↔ {key_a}");
            if alternations >= self.ping_pong_kill_threshold {
                return Some(LoopDetection {
                    kind: LoopKind::PingPong,
                    pattern,
                    count: alternations,
                    severity: Severity::Kill,
                });
            }
            if alternations >= self.ping_pong_warning_threshold && best.is_none() {
                best = Some(LoopDetection {
                    kind: LoopKind::PingPong,
                    pattern,
                    count: alternations,
                    severity: Severity::Warning,
                });
            }
        }

        best
    }

    /// Occurrence counts in first-seen order.
    fn count_keys(keys: &[String]) -> IndexMap<&str, usize> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for key in keys {
            let count = counts.entry(key.as_str()).or_insert(0);
            *count = count.saturating_add(1);
        }
        counts
    }

    /// Measure the strict `A, B, A, B, …` run ending at the tail.
    ///
    /// Returns `(key_b, key_a, alternations)` where `key_a` is the last key and
    /// `alternations` counts only the positions holding `key_a`.
    fn tail_alternation<'a>(&self, keys: &'a [String]) -> Option<(&'a str, &'a str, usize)> {
        if keys.len() < self.ping_pong_min_window {
            return None;
        }
        let [.., key_b, key_a] = keys else {
            return None;
        };
        if key_a == key_b {
            return None;
        }

        let mut alternations = 0usize;
        for (offset, key) in keys.iter().rev().enumerate() {
            let expects_a = offset % 2 == 0;
            let expected = if expects_a { key_a } else { key_b };
            if key != expected {
                break;
            }
            if expects_a {
                alternations = alternations.saturating_add(1);
            }
        }

        Some((key_b.as_str(), key_a.as_str(), alternations))
    }
}

#[cfg(test)]
mod tests {
    use super::{detect_loop, LoopDetector};
    use crate::watchdog::{LoopDetection, LoopKind, Severity, ToolCall, WatchdogConfig};

    fn calls(names: &[&str]) -> Vec<ToolCall> {
        names.iter().map(|name| ToolCall::new(*name)).collect()
    }

    fn detection(kind: LoopKind, pattern: &str, count: usize, severity: Severity) -> LoopDetection {
        LoopDetection {
            kind,
            pattern: pattern.to_string(),
            count,
            severity,
        }
    }

    #[test]
    fn empty_window_is_clean() {
        assert_eq!(detect_loop(&[]), None);
    }

    #[test]
    fn varied_calls_are_clean() {
        let window = calls(&["read", "grep", "edit", "read", "test", "edit"]);
        assert_eq!(detect_loop(&window), None);
    }

    #[test]
    fn five_repeats_kill() {
        let window = calls(&["read", "read", "grep", "read", "read", "read"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::GenericRepeat, "read", 5, Severity::Kill))
        );
    }

    #[test]
    fn repeats_are_counted_across_whole_window() {
        let window = calls(&["read", "read", "read", "grep", "edit", "test"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(
                LoopKind::GenericRepeat,
                "read",
                3,
                Severity::Warning
            ))
        );
    }

    #[test]
    fn four_repeats_warn() {
        let window = calls(&["grep", "read", "read", "edit", "read", "read"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(
                LoopKind::GenericRepeat,
                "read",
                4,
                Severity::Warning
            ))
        );
    }

    #[test]
    fn first_seen_key_wins_kill_tie_break() {
        let mut names = vec!["write"];
        names.extend(["read"; 6]);
        names.extend(["write"; 4]);
        let window = calls(&names);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::GenericRepeat, "write", 5, Severity::Kill))
        );
    }

    #[test]
    fn first_seen_key_wins_warning_tie_break() {
        let window = calls(&["edit", "read", "read", "read", "read", "edit", "edit"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(
                LoopKind::GenericRepeat,
                "edit",
                3,
                Severity::Warning
            ))
        );
    }

    #[test]
    fn six_call_alternation_is_reported_as_generic_repeat() {
        // Both keys reach the repeat warning threshold, which outranks the
        // ping-pong warning.
        let window = calls(&["a", "b", "a", "b", "a", "b"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::GenericRepeat, "a", 3, Severity::Warning))
        );
    }

    #[test]
    fn eight_call_alternation_kills() {
        let window = calls(&["a", "b", "a", "b", "a", "b", "a", "b"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::PingPong, "a ↔ b", 4, Severity::Kill))
        );
    }

    #[test]
    fn ping_pong_kill_overrides_repeat_warning() {
        let window = calls(&["c", "c", "c", "a", "b", "a", "b", "a", "b", "a", "b"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::PingPong, "a ↔ b", 4, Severity::Kill))
        );
    }

    #[test]
    fn alternation_runs_to_window_start() {
        let window = calls(&["b", "a", "b", "a", "b", "a", "b"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::PingPong, "a ↔ b", 4, Severity::Kill))
        );
    }

    #[test]
    fn repeat_warning_outranks_ping_pong_warning() {
        let window = calls(&["c", "c", "c", "a", "b", "a", "b", "a", "b"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::GenericRepeat, "c", 3, Severity::Warning))
        );
    }

    #[test]
    fn ping_pong_warning_when_no_repeat_candidate() {
        let config = WatchdogConfig {
            repeat_warning_threshold: 4,
            ..WatchdogConfig::default()
        };
        let detector = LoopDetector::new(&config);
        let window = calls(&["x", "a", "b", "a", "b", "a", "b"]);
        assert_eq!(
            detector.detect(&window),
            Some(detection(LoopKind::PingPong, "a ↔ b", 3, Severity::Warning))
        );
    }

    #[test]
    fn broken_alternation_stops_the_walk() {
        let config = WatchdogConfig {
            repeat_warning_threshold: 4,
            ..WatchdogConfig::default()
        };
        let detector = LoopDetector::new(&config);
        // Only a,b,a,b alternates at the tail; "c" breaks the run.
        let window = calls(&["a", "b", "c", "a", "b", "a", "b"]);
        assert_eq!(detector.detect(&window), None);
    }

    #[test]
    fn identical_tail_skips_ping_pong() {
        let keys: Vec<String> = ["a", "b", "a", "b", "c", "c"]
            .iter()
            .map(|key| (*key).to_string())
            .collect();
        assert_eq!(LoopDetector::default().tail_alternation(&keys), None);

        let window = calls(&["a", "b", "a", "b", "a", "a"]);
        assert_eq!(
            detect_loop(&window),
            Some(detection(LoopKind::GenericRepeat, "a", 4, Severity::Warning))
        );
    }

    #[test]
    fn short_window_never_ping_pongs() {
        let window = calls(&["a", "b", "a", "b", "a"]);
        let verdict = detect_loop(&window);
        assert!(!matches!(
            verdict,
            Some(LoopDetection {
                kind: LoopKind::PingPong,
                ..
            })
        ));
    }

    #[test]
    fn targets_distinguish_calls() {
        let window: Vec<ToolCall> = (0..8)
            .map(|i| {
                let target = if i % 2 == 0 { "a.rs" } else { "b.rs" };
                ToolCall::with_target("edit", target)
            })
            .collect();
        assert_eq!(
            detect_loop(&window),
            Some(detection(
                LoopKind::PingPong,
                "edit::a.rs ↔ edit::b.rs",
                4,
                Severity::Kill
            ))
        );
    }

    #[test]
    fn same_tool_different_targets_do_not_repeat() {
        let window: Vec<ToolCall> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|target| ToolCall::with_target("read", *target))
            .collect();
        assert_eq!(detect_loop(&window), None);
    }
}
