use std::time::Duration;

use anyhow::{Context, Result};

/// Parse the first line of `output` as a pid.
pub fn first_line_pid(output: &str) -> Result<u32> {
    let line = output.lines().next().context("no output captured")?;
    line.trim()
        .parse()
        .with_context(|| format!("not a pid: {line:?}"))
}

/// Whether `pid` names a live (non-zombie) process.
///
/// Reads `/proc`; zombies count as dead because a reparented grandchild
/// may wait for an init that never reaps it.
#[cfg(target_os = "linux")]
pub fn is_alive(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // Format: `pid (comm) state ...`; comm may contain spaces or parens.
    match stat.rfind(')') {
        Some(idx) => !matches!(stat[idx + 1..].trim_start().chars().next(), Some('Z' | 'X')),
        None => false,
    }
}

/// Poll until `pid` is gone or `within` elapses. Returns whether it died.
#[cfg(target_os = "linux")]
pub async fn wait_until_dead(pid: u32, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    !is_alive(pid)
}
