// src/config/validate.rs

use crate::config::duration::{parse_duration, parse_timeout};
use crate::config::model::{ExecConfig, RawConfigFile, RawExecSection, SuccessCodes};
use crate::errors::{ProcwardError, Result};

impl TryFrom<RawConfigFile> for ExecConfig {
    type Error = ProcwardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        build_exec_config(&raw.exec)
    }
}

fn build_exec_config(raw: &RawExecSection) -> Result<ExecConfig> {
    let mut cfg = ExecConfig::default();

    if let Some(ref timeout) = raw.timeout {
        cfg.timeout = parse_timeout(timeout).map_err(for_key("[exec].timeout"))?;
    }

    cfg.success_codes = success_codes(raw)?;

    if let Some(ref grace) = raw.drain_grace_period {
        cfg.drain_grace_period = parse_duration(grace).map_err(for_key("[exec].drain_grace_period"))?;
    }

    if let Some(kill_tree) = raw.kill_process_tree {
        cfg.kill_process_tree = kill_tree;
    }

    Ok(cfg)
}

/// Prefix a config error message with the offending key.
fn for_key(key: &'static str) -> impl Fn(ProcwardError) -> ProcwardError {
    move |err| match err {
        ProcwardError::ConfigError(msg) => ProcwardError::ConfigError(format!("{key}: {msg}")),
        other => other,
    }
}

fn success_codes(raw: &RawExecSection) -> Result<SuccessCodes> {
    match (raw.accept_any_exit_code, &raw.successful_exit_codes) {
        (true, Some(_)) => Err(ProcwardError::ConfigError(
            "[exec].accept_any_exit_code conflicts with [exec].successful_exit_codes".to_string(),
        )),
        (true, None) => Ok(SuccessCodes::Any),
        (false, Some(codes)) if codes.is_empty() => Err(ProcwardError::ConfigError(
            "[exec].successful_exit_codes must not be empty".to_string(),
        )),
        (false, Some(codes)) => Ok(SuccessCodes::only(codes.iter().copied())),
        (false, None) => Ok(SuccessCodes::default()),
    }
}
