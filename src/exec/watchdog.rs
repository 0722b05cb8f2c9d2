// src/exec/watchdog.rs

//! Deadline timer bound to exactly one process.
//!
//! State transitions (`arm`, `disarm`, expiry) all happen under one mutex,
//! so when the timer fires at the moment the process exits, exactly one of
//! `Disarmed` / `Expired` is recorded and `has_expired` reports it
//! consistently.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::config::Timeout;
use crate::errors::{ProcwardError, Result};
use crate::exec::process::Destroyer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    /// `deadline` is `None` for an infinite timeout.
    Armed { deadline: Option<Instant> },
    Expired,
    Disarmed,
}

#[derive(Debug)]
struct Inner {
    state: WatchdogState,
    target: Option<Destroyer>,
    cancel: Option<oneshot::Sender<()>>,
}

#[derive(Debug)]
pub struct Watchdog {
    inner: Arc<Mutex<Inner>>,
    timer: Option<JoinHandle<()>>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: WatchdogState::Idle,
                target: None,
                cancel: None,
            })),
            timer: None,
        }
    }

    /// Bind to `target` and start the timer.
    ///
    /// Fails unless the watchdog is still `Idle`: a watchdog guards one
    /// process for one execution and is never re-armed.
    pub fn arm(&mut self, target: Destroyer, timeout: Timeout) -> Result<()> {
        let mut inner = lock(&self.inner);
        if inner.state != WatchdogState::Idle {
            return Err(ProcwardError::Watchdog(format!(
                "cannot arm watchdog in state {:?}; it is bound to another process",
                inner.state
            )));
        }

        let pid = target.pid();
        inner.target = Some(target);

        // A deadline past the end of the clock is as good as none.
        let Some((duration, deadline)) = timeout
            .as_duration()
            .and_then(|d| Instant::now().checked_add(d).map(|at| (d, at)))
        else {
            inner.state = WatchdogState::Armed { deadline: None };
            debug!(?pid, ?timeout, "watchdog armed without deadline");
            return Ok(());
        };

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        inner.state = WatchdogState::Armed {
            deadline: Some(deadline),
        };
        inner.cancel = Some(cancel_tx);
        drop(inner);

        debug!(?pid, timeout = ?duration, "watchdog armed");

        let shared = Arc::clone(&self.inner);
        self.timer = Some(tokio::spawn(async move {
            tokio::select! {
                _ = sleep_until(deadline) => expire(&shared),
                _ = cancel_rx => debug!(?pid, "watchdog timer cancelled"),
            }
        }));
        Ok(())
    }

    /// Stop the timer if it has not fired yet. No-op in any state other
    /// than `Armed`.
    pub fn disarm(&mut self) {
        let mut inner = lock(&self.inner);
        if let WatchdogState::Armed { .. } = inner.state {
            inner.state = WatchdogState::Disarmed;
            // Dropping the destroyer tells the handle no kill is coming.
            inner.target = None;
            if let Some(cancel) = inner.cancel.take() {
                let _ = cancel.send(());
            }
            debug!("watchdog disarmed");
        }
    }

    /// Wait for the timer task to finish. Call after `disarm`.
    pub async fn join(&mut self) {
        if let Some(timer) = self.timer.take() {
            if let Err(e) = timer.await {
                debug!(error = %e, "watchdog timer task ended abnormally");
            }
        }
    }

    pub fn has_expired(&self) -> bool {
        lock(&self.inner).state == WatchdogState::Expired
    }

    pub fn is_watching(&self) -> bool {
        matches!(lock(&self.inner).state, WatchdogState::Armed { .. })
    }

    pub fn state(&self) -> WatchdogState {
        lock(&self.inner).state
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn expire(shared: &Mutex<Inner>) {
    let mut inner = lock(shared);
    if !matches!(inner.state, WatchdogState::Armed { .. }) {
        return;
    }
    inner.state = WatchdogState::Expired;
    inner.cancel = None;

    if let Some(target) = inner.target.take() {
        let pid = target.pid();
        warn!(?pid, "watchdog deadline elapsed; destroying process");
        if !target.destroy() {
            debug!(?pid, "process was already reaped when watchdog fired");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fires_and_requests_destruction() {
        let (destroyer, request) = Destroyer::detached();
        let mut wd = Watchdog::new();
        wd.arm(destroyer, Timeout::After(Duration::from_millis(20))).unwrap();
        assert!(wd.is_watching());

        tokio::time::timeout(Duration::from_secs(2), request)
            .await
            .expect("watchdog should fire")
            .expect("destroy request should be sent");
        assert!(wd.has_expired());

        // Disarm after expiry must not undo it.
        wd.disarm();
        assert_eq!(wd.state(), WatchdogState::Expired);
        wd.join().await;
    }

    #[tokio::test]
    async fn disarm_before_deadline_cancels() {
        let (destroyer, request) = Destroyer::detached();
        let mut wd = Watchdog::new();
        wd.arm(destroyer, Timeout::After(Duration::from_secs(30))).unwrap();

        wd.disarm();
        wd.join().await;

        assert_eq!(wd.state(), WatchdogState::Disarmed);
        assert!(!wd.has_expired());
        // The destroyer was dropped, not used.
        assert!(request.await.is_err());
    }

    #[tokio::test]
    async fn infinite_timeout_never_fires() {
        let (destroyer, _request) = Destroyer::detached();
        let mut wd = Watchdog::new();
        wd.arm(destroyer, Timeout::Infinite).unwrap();
        assert_eq!(wd.state(), WatchdogState::Armed { deadline: None });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!wd.has_expired());
        wd.disarm();
        assert_eq!(wd.state(), WatchdogState::Disarmed);
    }

    #[tokio::test]
    async fn unrepresentable_deadline_never_fires() {
        let (destroyer, _request) = Destroyer::detached();
        let mut wd = Watchdog::new();
        wd.arm(destroyer, Timeout::After(Duration::MAX)).unwrap();
        assert_eq!(wd.state(), WatchdogState::Armed { deadline: None });

        wd.disarm();
        wd.join().await;
        assert_eq!(wd.state(), WatchdogState::Disarmed);
    }

    #[tokio::test]
    async fn zero_timeout_fires_immediately() {
        let (destroyer, request) = Destroyer::detached();
        let mut wd = Watchdog::new();
        wd.arm(destroyer, Timeout::After(Duration::ZERO)).unwrap();
        assert!(request.await.is_ok());
        assert!(wd.has_expired());
    }

    #[tokio::test]
    async fn cannot_be_armed_twice() {
        let (first, _r1) = Destroyer::detached();
        let (second, _r2) = Destroyer::detached();
        let mut wd = Watchdog::new();
        wd.arm(first, Timeout::Infinite).unwrap();

        let err = wd.arm(second, Timeout::Infinite).unwrap_err();
        assert!(matches!(err, ProcwardError::Watchdog(_)));

        wd.disarm();
        let (third, _r3) = Destroyer::detached();
        assert!(wd.arm(third, Timeout::Infinite).is_err());
    }

    #[test]
    fn disarm_when_idle_is_noop() {
        let mut wd = Watchdog::new();
        wd.disarm();
        assert_eq!(wd.state(), WatchdogState::Idle);
    }
}
