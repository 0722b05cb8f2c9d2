// src/exec/router.rs

//! Owns the pumps for one child process: decides how each stdio stream is
//! wired, starts one pump per piped stream, and joins them after the child
//! has exited.

use std::io;
use std::mem;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::exec::outcome::{StreamIoWarning, StreamKind};
use crate::exec::pump::{spawn_input_pump, spawn_output_pump, PumpReport};
use crate::exec::streams::{InputSource, OutputSink, StreamConfig};

/// Result of [`StreamRouter::stop_and_join`].
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Output pumps still running when the grace period ran out. They were
    /// aborted and their sinks may be missing data.
    pub not_drained: Vec<StreamKind>,
    pub failures: Vec<(StreamKind, io::Error)>,
}

impl DrainReport {
    /// True when every pump ran to end-of-stream without an error.
    pub fn is_clean(&self) -> bool {
        self.not_drained.is_empty() && self.failures.is_empty()
    }

    pub fn into_warning(self) -> Option<StreamIoWarning> {
        if self.is_clean() {
            return None;
        }
        Some(StreamIoWarning {
            not_drained: self.not_drained,
            failures: self
                .failures
                .into_iter()
                .map(|(kind, err)| (kind, err.to_string()))
                .collect(),
        })
    }
}

#[derive(Debug)]
pub struct StreamRouter {
    stdout: OutputSink,
    stderr: OutputSink,
    stdin: InputSource,
    output_pumps: Vec<(StreamKind, JoinHandle<PumpReport>)>,
    input_pump: Option<JoinHandle<PumpReport>>,
}

impl StreamRouter {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            stdout: config.stdout,
            stderr: config.stderr,
            stdin: config.stdin,
            output_pumps: Vec::new(),
            input_pump: None,
        }
    }

    /// Set up the child's stdio so that `start` finds pipes where pumps are
    /// needed.
    pub fn configure(&self, cmd: &mut tokio::process::Command) {
        cmd.stdout(output_stdio(&self.stdout))
            .stderr(output_stdio(&self.stderr))
            .stdin(match self.stdin {
                InputSource::Null => Stdio::null(),
                InputSource::Inherit => Stdio::inherit(),
                InputSource::Bytes(_) | InputSource::Reader(_) => Stdio::piped(),
            });
    }

    /// Take the child's pipes and launch one pump per piped stream.
    ///
    /// Calling `start` a second time finds no pipes left and does nothing.
    pub fn start(&mut self, child: &mut Child) {
        if let Some(stdout) = child.stdout.take() {
            let sink = mem::replace(&mut self.stdout, OutputSink::Null);
            self.output_pumps
                .push((StreamKind::Stdout, spawn_output_pump(StreamKind::Stdout, stdout, sink)));
        }
        if let Some(stderr) = child.stderr.take() {
            let sink = mem::replace(&mut self.stderr, OutputSink::Null);
            self.output_pumps
                .push((StreamKind::Stderr, spawn_output_pump(StreamKind::Stderr, stderr, sink)));
        }
        if let Some(stdin) = child.stdin.take() {
            let source = mem::replace(&mut self.stdin, InputSource::Null);
            self.input_pump = Some(spawn_input_pump(source, stdin));
        }
        debug!(
            output_pumps = self.output_pumps.len(),
            input_pump = self.input_pump.is_some(),
            "stream pumps started"
        );
    }

    pub fn is_running(&self) -> bool {
        self.output_pumps.iter().any(|(_, h)| !h.is_finished())
            || self.input_pump.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait up to `grace` for the output pumps to reach end-of-stream, then
    /// abort whatever is left.
    ///
    /// An unfinished stdin pump is aborted without being reported: the child
    /// has exited and nobody will read the rest of its input.
    ///
    /// A grace period too long to express as a deadline waits without bound.
    ///
    /// Idempotent: once the pumps have been joined, further calls return a
    /// clean report immediately.
    pub async fn stop_and_join(&mut self, grace: Duration) -> DrainReport {
        let deadline = Instant::now().checked_add(grace);
        let mut report = DrainReport::default();

        for (kind, mut handle) in self.output_pumps.drain(..) {
            let joined = match deadline {
                // `timeout_at` polls the pump once even after the deadline,
                // so finished pumps are always collected.
                Some(deadline) => timeout_at(deadline, &mut handle).await,
                None => Ok((&mut handle).await),
            };
            match joined {
                Ok(joined) => collect(kind, joined, &mut report),
                Err(_) => {
                    handle.abort();
                    warn!(
                        stream = %kind,
                        ?grace,
                        "stream pump did not drain within grace period; aborted"
                    );
                    report.not_drained.push(kind);
                }
            }
        }

        if let Some(handle) = self.input_pump.take() {
            if handle.is_finished() {
                collect(StreamKind::Stdin, handle.await, &mut report);
            } else {
                debug!("aborting stdin pump after process exit");
                handle.abort();
            }
        }

        report
    }
}

fn output_stdio(sink: &OutputSink) -> Stdio {
    if sink.is_null() {
        Stdio::null()
    } else {
        Stdio::piped()
    }
}

fn collect(
    kind: StreamKind,
    joined: Result<PumpReport, tokio::task::JoinError>,
    report: &mut DrainReport,
) {
    match joined {
        Ok(PumpReport { error: Some(e), stream, .. }) => report.failures.push((stream, e)),
        Ok(_) => {}
        Err(join_err) => report
            .failures
            .push((kind, io::Error::other(format!("stream pump panicked: {join_err}")))),
    }
}
