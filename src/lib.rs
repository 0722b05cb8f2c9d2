// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod os;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::command::Command;
use crate::config::{load_and_validate, parse_duration, parse_timeout, ExecConfig, SuccessCodes};
use crate::errors::ProcwardError;
use crate::exec::{ExecutionReport, Executor, InputSource, OutputSink, StreamConfig};

pub use crate::os::OsFamily;

/// Run `command` once under `config`.
///
/// Shorthand for `Executor::new(config).execute(command, streams)`.
pub async fn execute(
    command: &Command,
    config: ExecConfig,
    streams: StreamConfig,
) -> errors::Result<ExecutionReport> {
    Executor::new(config).execute(command, streams).await
}

/// Exit code used by the binary when the watchdog killed the child.
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code used by the binary when the child could not be started.
pub const EXIT_LAUNCH_FAILED: i32 = 127;

/// High-level entry point used by `main.rs`.
///
/// Builds the configuration (file, then CLI overrides), runs the command
/// with console pumping and returns the exit code the binary should use.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = resolve_config(&args)?;
    debug!(?config, "resolved executor configuration");

    let mut command = Command::new(&args.program).args(args.args.iter().cloned());
    if let Some(ref dir) = args.cwd {
        command = command.current_dir(dir);
    }

    let streams = StreamConfig::default()
        .stdout(OutputSink::Inherit)
        .stderr(OutputSink::Inherit)
        .stdin(InputSource::Inherit);

    // Ctrl-C / SIGTERM → drop the execution, which kills the child and its
    // process group before we exit.
    let outcome = tokio::select! {
        res = execute(&command, config, streams) => res,
        signal = shutdown_signal() => {
            let (name, code) = signal?;
            info!(signal = name, "interrupted; child process killed");
            return Ok(code);
        }
    };

    let code = match outcome {
        Ok(report) => {
            if let Some(warning) = report.stream_warning {
                eprintln!("procward: {warning}");
            }
            report.result.exit_code
        }
        Err(err) => exit_code_for(&err),
    };
    Ok(code)
}

/// Wait for SIGINT (or SIGTERM on unix). Returns the signal name and the
/// shell-style exit code for it.
async fn shutdown_signal() -> Result<(&'static str, i32)> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|()| ("SIGINT", 130)).map_err(Into::into),
            _ = term.recv() => Ok(("SIGTERM", 143)),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(("SIGINT", 130))
    }
}

/// Map an execution error to the binary's exit code, printing it.
fn exit_code_for(err: &ProcwardError) -> i32 {
    eprintln!("procward: {err}");
    if let Some(warning) = err.stream_warning() {
        eprintln!("procward: {warning}");
    }
    match err {
        ProcwardError::Timeout { .. } => EXIT_TIMEOUT,
        ProcwardError::Launch { .. } => EXIT_LAUNCH_FAILED,
        ProcwardError::ExecutionFailed { exit_code, .. } => *exit_code,
        _ => 1,
    }
}

fn resolve_config(args: &CliArgs) -> errors::Result<ExecConfig> {
    let mut config = match args.config {
        Some(ref path) => load_and_validate(Path::new(path))?,
        None => ExecConfig::default(),
    };

    if let Some(ref timeout) = args.timeout {
        config.timeout = parse_timeout(timeout)?;
    }
    if let Some(ref grace) = args.grace {
        config.drain_grace_period = parse_duration(grace)?;
    }
    if args.any_exit_code {
        config.success_codes = SuccessCodes::Any;
    } else if !args.ok_codes.is_empty() {
        config.success_codes = SuccessCodes::only(args.ok_codes.iter().copied());
    }
    if args.no_kill_tree {
        config.kill_process_tree = false;
    }

    Ok(config)
}
