// src/config/duration.rs

use std::time::Duration;

use crate::config::model::Timeout;
use crate::errors::{ProcwardError, Result};

/// Parse a duration such as `"500ms"`, `"3s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ProcwardError::ConfigError("empty duration string".to_string()));
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| {
            ProcwardError::ConfigError(format!("duration '{s}' is missing a unit suffix"))
        })?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part.parse().map_err(|e| {
        ProcwardError::ConfigError(format!("invalid duration number '{num_part}': {e}"))
    })?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(ProcwardError::ConfigError(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            )));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| ProcwardError::ConfigError(format!("duration '{s}' is too large")))
}

/// Parse a watchdog timeout: a duration, or `"infinite"` / `"none"` for a
/// watchdog that never fires.
pub fn parse_timeout(s: &str) -> Result<Timeout> {
    match s.trim().to_lowercase().as_str() {
        "infinite" | "none" | "never" => Ok(Timeout::Infinite),
        _ => parse_duration(s).map(Timeout::After),
    }
}
