// src/errors.rs

//! Crate-wide error type and result alias.

use std::time::Duration;

use thiserror::Error;

use crate::exec::outcome::StreamIoWarning;

#[derive(Error, Debug)]
pub enum ProcwardError {
    /// The OS refused to start the process (missing program, permissions,
    /// bad working directory). No watchdog or pump was started.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The watchdog fired and the process was destroyed.
    #[error("process killed by watchdog after {}ms", .timeout.as_millis())]
    Timeout {
        timeout: Duration,
        warning: Option<StreamIoWarning>,
    },

    /// The process exited on its own with a code outside the success set.
    #[error("process exited with unsuccessful code {exit_code}")]
    ExecutionFailed {
        exit_code: i32,
        warning: Option<StreamIoWarning>,
    },

    #[error("Watchdog error: {0}")]
    Watchdog(String),

    /// The blocking API was called from inside a tokio runtime.
    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProcwardError {
    /// The stream warning attached to a timeout or execution failure, if any.
    pub fn stream_warning(&self) -> Option<&StreamIoWarning> {
        match self {
            ProcwardError::Timeout { warning, .. }
            | ProcwardError::ExecutionFailed { warning, .. } => warning.as_ref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcwardError::Timeout { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProcwardError>;
