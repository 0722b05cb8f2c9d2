// src/exec/process.rs

//! Ownership of one OS process.
//!
//! The `Child` lives inside [`ProcessHandle`] and only the handle reaps it.
//! Other parties (the watchdog) ask for destruction through a single-use
//! [`Destroyer`]; the request is carried out by `wait()` while the child is
//! still unreaped, so its pid cannot have been recycled.

use std::io;
use std::process::ExitStatus;

use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info};

pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    kill_tree: bool,
    destroy_tx: Option<oneshot::Sender<()>>,
    destroy_rx: Option<oneshot::Receiver<()>>,
}

impl ProcessHandle {
    /// Spawn `cmd`. The caller has already wired its stdio.
    ///
    /// With `kill_tree` (unix only) the child leads a new process group, and
    /// destruction signals the whole group so helpers it spawned die too.
    pub fn spawn(mut cmd: Command, kill_tree: bool) -> io::Result<Self> {
        #[cfg(unix)]
        if kill_tree {
            cmd.process_group(0);
        }
        cmd.kill_on_drop(true);

        let child = cmd.spawn()?;
        let pid = child.id();
        let (destroy_tx, destroy_rx) = oneshot::channel();
        debug!(?pid, kill_tree, "process spawned");

        Ok(Self {
            child,
            pid,
            kill_tree: kill_tree && cfg!(unix),
            destroy_tx: Some(destroy_tx),
            destroy_rx: Some(destroy_rx),
        })
    }

    /// OS pid as observed at spawn time.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Hand out the destruction capability. Only the first call gets one.
    pub fn destroyer(&mut self) -> Option<Destroyer> {
        self.destroy_tx.take().map(|tx| Destroyer { tx, pid: self.pid })
    }

    /// Wait for the process to exit, honouring a destruction request that
    /// arrives in the meantime.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(mut destroy_rx) = self.destroy_rx.take() {
            tokio::select! {
                status = self.child.wait() => return status,
                request = &mut destroy_rx => {
                    // An error means the destroyer was dropped unused.
                    if request.is_ok() {
                        self.kill_now();
                    }
                }
            }
        }
        self.child.wait().await
    }

    /// Forcibly terminate the process (and its group, if enabled).
    ///
    /// Best effort: a process that already exited is not an error.
    pub fn kill_now(&mut self) {
        info!(pid = ?self.pid, kill_tree = self.kill_tree, "destroying process");

        #[cfg(unix)]
        if self.kill_tree {
            // `id()` is `None` once reaped, so the group id is still ours.
            if let Some(pid) = self.child.id() {
                kill_process_group(pid);
            }
        }

        if let Err(e) = self.child.start_kill() {
            debug!(pid = ?self.pid, error = %e, "kill failed; process already exited");
        }
    }
}

impl Drop for ProcessHandle {
    /// A handle dropped before reaping (the execution future was cancelled)
    /// takes the process group down with it; `kill_on_drop` only covers
    /// the direct child.
    fn drop(&mut self) {
        #[cfg(unix)]
        if self.kill_tree {
            if let Some(pid) = self.child.id() {
                debug!(pid, "handle dropped before exit; killing process group");
                kill_process_group(pid);
            }
        }
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("kill_tree", &self.kill_tree)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!(pgid, error = %e, "killpg failed"),
    }
}

/// Single-use request to destroy one process.
#[derive(Debug)]
pub struct Destroyer {
    tx: oneshot::Sender<()>,
    pid: Option<u32>,
}

impl Destroyer {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the owning handle to kill the process. Returns `false` when the
    /// process has already been reaped, which is not an error.
    pub fn destroy(self) -> bool {
        self.tx.send(()).is_ok()
    }

    #[cfg(test)]
    pub(crate) fn detached() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx, pid: None }, rx)
    }
}

/// Numeric exit code of a finished process.
///
/// A unix process killed by signal `N` reports `128 + N`, the shell
/// convention. `-1` when no code can be determined.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
