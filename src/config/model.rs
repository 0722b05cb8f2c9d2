// src/config/model.rs

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

/// How long the watchdog lets a process run.
///
/// `Infinite` is not the same as a zero duration: it never fires, while
/// `After(Duration::ZERO)` fires as soon as the timer task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    #[default]
    Infinite,
    After(Duration),
}

impl Timeout {
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Timeout::Infinite => None,
            Timeout::After(d) => Some(d),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::After(d)
    }
}

/// Exit codes treated as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessCodes {
    /// Exit codes are not checked at all.
    Any,
    Only(BTreeSet<i32>),
}

impl SuccessCodes {
    pub fn only(codes: impl IntoIterator<Item = i32>) -> Self {
        SuccessCodes::Only(codes.into_iter().collect())
    }

    pub fn contains(&self, code: i32) -> bool {
        match self {
            SuccessCodes::Any => true,
            SuccessCodes::Only(set) => set.contains(&code),
        }
    }
}

impl Default for SuccessCodes {
    fn default() -> Self {
        SuccessCodes::only([0])
    }
}

fn default_drain_grace_period() -> Duration {
    Duration::from_secs(2)
}

/// Validated settings for one [`Executor`](crate::exec::Executor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    pub timeout: Timeout,
    pub success_codes: SuccessCodes,
    /// How long to wait for output pumps after the process has exited.
    pub drain_grace_period: Duration,
    /// Kill the child's whole process group on timeout (unix only).
    pub kill_process_tree: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout: Timeout::Infinite,
            success_codes: SuccessCodes::default(),
            drain_grace_period: default_drain_grace_period(),
            kill_process_tree: true,
        }
    }
}

impl ExecConfig {
    pub fn with_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn with_success_codes(mut self, codes: SuccessCodes) -> Self {
        self.success_codes = codes;
        self
    }

    pub fn with_drain_grace_period(mut self, grace: Duration) -> Self {
        self.drain_grace_period = grace;
        self
    }

    pub fn with_kill_process_tree(mut self, enabled: bool) -> Self {
        self.kill_process_tree = enabled;
        self
    }
}

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [exec]
/// timeout = "3s"
/// successful_exit_codes = [0, 1]
/// drain_grace_period = "500ms"
/// kill_process_tree = true
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub exec: RawExecSection,
}

/// `[exec]` section, before validation.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawExecSection {
    /// Duration string or `"infinite"`.
    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub successful_exit_codes: Option<Vec<i32>>,

    /// Skip exit-code checking entirely.
    #[serde(default)]
    pub accept_any_exit_code: bool,

    #[serde(default)]
    pub drain_grace_period: Option<String>,

    #[serde(default)]
    pub kill_process_tree: Option<bool>,
}
