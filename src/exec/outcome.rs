// src/exec/outcome.rs

//! Raw execution results and the success/failure policy applied to them.

use std::fmt;
use std::time::Duration;

use crate::config::SuccessCodes;

/// Which child stream a pump is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamKind::Stdin => "stdin",
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        })
    }
}

/// What the process did, before any policy is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub watchdog_fired: bool,
}

/// Output may be incomplete: some pumps did not drain within the grace
/// period, or failed with an I/O error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamIoWarning {
    pub not_drained: Vec<StreamKind>,
    pub failures: Vec<(StreamKind, String)>,
}

impl StreamIoWarning {
    pub fn is_empty(&self) -> bool {
        self.not_drained.is_empty() && self.failures.is_empty()
    }
}

impl fmt::Display for StreamIoWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for kind in &self.not_drained {
            parts.push(format!("{kind} did not drain"));
        }
        for (kind, err) in &self.failures {
            parts.push(format!("{kind} failed: {err}"));
        }
        write!(f, "partial stream I/O: {}", parts.join(", "))
    }
}

/// Returned on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub result: ExecutionResult,
    /// Wall-clock time from spawn to reaping.
    pub duration: Duration,
    pub stream_warning: Option<StreamIoWarning>,
}

impl ExecutionReport {
    pub fn exit_code(&self) -> i32 {
        self.result.exit_code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    TimedOut,
    Failed(i32),
}

/// Decide the outcome of a finished process.
///
/// A fired watchdog means timeout regardless of the exit code.
pub fn classify(result: &ExecutionResult, success_codes: &SuccessCodes) -> Outcome {
    if result.watchdog_fired {
        Outcome::TimedOut
    } else if success_codes.contains(result.exit_code) {
        Outcome::Succeeded
    } else {
        Outcome::Failed(result.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_wins_over_exit_code() {
        let result = ExecutionResult { exit_code: 0, watchdog_fired: true };
        assert_eq!(classify(&result, &SuccessCodes::Any), Outcome::TimedOut);
    }

    #[test]
    fn default_codes_only_accept_zero() {
        let codes = SuccessCodes::default();
        let ok = ExecutionResult { exit_code: 0, watchdog_fired: false };
        let bad = ExecutionResult { exit_code: 2, watchdog_fired: false };
        assert_eq!(classify(&ok, &codes), Outcome::Succeeded);
        assert_eq!(classify(&bad, &codes), Outcome::Failed(2));
    }

    #[test]
    fn warning_display_lists_each_problem() {
        let warning = StreamIoWarning {
            not_drained: vec![StreamKind::Stdout],
            failures: vec![(StreamKind::Stderr, "broken".to_string())],
        };
        assert_eq!(
            warning.to_string(),
            "partial stream I/O: stdout did not drain, stderr failed: broken"
        );
    }
}
