// src/exec/supervisor.rs

//! The executor: runs one command under a watchdog and returns one outcome.

use std::io::{self, IsTerminal};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::ExecConfig;
use crate::errors::{ProcwardError, Result};
use crate::exec::outcome::{classify, ExecutionReport, ExecutionResult, Outcome};
use crate::exec::process::{exit_code, ProcessHandle};
use crate::exec::router::StreamRouter;
use crate::exec::streams::{InputSource, StreamConfig};
use crate::exec::watchdog::Watchdog;

/// Supervises single process executions according to an [`ExecConfig`].
///
/// Each call to [`execute`](Executor::execute) is independent: it creates
/// its own process handle, pumps and watchdog and tears all of them down
/// before returning. An `Executor` can be shared and reused freely.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecConfig,
}

impl Executor {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Run `command` and apply the success policy.
    ///
    /// - watchdog fired → [`ProcwardError::Timeout`], whatever the exit code
    /// - exit code outside the success set → [`ProcwardError::ExecutionFailed`]
    /// - otherwise the report, possibly carrying a stream warning
    pub async fn execute(&self, command: &Command, streams: StreamConfig) -> Result<ExecutionReport> {
        let report = self.run(command, streams).await?;

        match classify(&report.result, &self.config.success_codes) {
            Outcome::Succeeded => Ok(report),
            Outcome::TimedOut => Err(ProcwardError::Timeout {
                timeout: self.config.timeout.as_duration().unwrap_or_default(),
                warning: report.stream_warning,
            }),
            Outcome::Failed(exit_code) => Err(ProcwardError::ExecutionFailed {
                exit_code,
                warning: report.stream_warning,
            }),
        }
    }

    /// Blocking variant of [`execute`](Executor::execute) for callers
    /// without a tokio runtime. Inside a runtime it returns
    /// [`ProcwardError::Runtime`]; use `execute` there.
    pub fn execute_blocking(&self, command: &Command, streams: StreamConfig) -> Result<ExecutionReport> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ProcwardError::Runtime(
                "execute_blocking called from within a tokio runtime".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.execute(command, streams))
    }

    /// Run `command` and report what happened without judging the exit
    /// code. Only launch and wait failures are errors here.
    pub async fn run(&self, command: &Command, streams: StreamConfig) -> Result<ExecutionReport> {
        check_launchable(command)?;

        let stdin_is_tty = std::io::stdin().is_terminal();
        let kill_tree = detach_process_group(
            self.config.kill_process_tree,
            &streams.stdin,
            stdin_is_tty,
        );
        if self.config.kill_process_tree && !kill_tree {
            debug!("child shares the terminal; keeping it in our process group");
        }

        let mut router = StreamRouter::new(streams);
        let mut cmd = command.to_tokio_command();
        router.configure(&mut cmd);

        let started = Instant::now();
        let mut process = ProcessHandle::spawn(cmd, kill_tree).map_err(|source| {
            ProcwardError::Launch {
                program: command.program().to_string(),
                source,
            }
        })?;

        info!(
            pid = ?process.id(),
            cmd = %command,
            timeout = ?self.config.timeout,
            "process started"
        );

        router.start(process.child_mut());

        let mut watchdog = Watchdog::new();
        if let Some(destroyer) = process.destroyer() {
            watchdog.arm(destroyer, self.config.timeout)?;
        }

        let waited = process.wait().await;

        // Must precede `has_expired`: from here on the state is final.
        watchdog.disarm();
        watchdog.join().await;
        let watchdog_fired = watchdog.has_expired();
        let duration = started.elapsed();

        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                process.kill_now();
                router.stop_and_join(Duration::ZERO).await;
                return Err(anyhow::Error::new(e)
                    .context(format!("waiting for process '{}'", command.program()))
                    .into());
            }
        };

        let result = ExecutionResult {
            exit_code: exit_code(status),
            watchdog_fired,
        };

        info!(
            pid = ?process.id(),
            exit_code = result.exit_code,
            watchdog_fired,
            elapsed = ?duration,
            "process exited"
        );

        let drain = router.stop_and_join(self.config.drain_grace_period).await;
        let stream_warning = drain.into_warning();
        if let Some(ref warning) = stream_warning {
            warn!(pid = ?process.id(), %warning, "process output may be incomplete");
        } else {
            debug!(pid = ?process.id(), "all stream pumps drained");
        }

        Ok(ExecutionReport {
            result,
            duration,
            stream_warning,
        })
    }
}

/// Whether the child gets its own process group.
///
/// A child reading an inherited terminal must stay in the foreground group:
/// in a background group a tty read stops it with SIGTTIN and terminal
/// signals like Ctrl-C would not reach it.
fn detach_process_group(kill_tree: bool, stdin: &InputSource, stdin_is_tty: bool) -> bool {
    kill_tree && !(matches!(stdin, InputSource::Inherit) && stdin_is_tty)
}

/// Checks done before anything is spawned. Failures are launch errors.
fn check_launchable(command: &Command) -> Result<()> {
    if command.validate().is_err() {
        return Err(ProcwardError::Launch {
            program: command.program().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "program must not be empty"),
        });
    }

    if let Some(dir) = command.get_current_dir() {
        if !dir.is_dir() {
            return Err(ProcwardError::Launch {
                program: command.program().to_string(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("working directory '{}' does not exist", dir.display()),
                ),
            });
        }
    }

    Ok(())
}
