// src/exec/pump.rs

//! Stream pumps: one tokio task per redirected child stream, copying bytes
//! from a source to a sink until end-of-stream or an I/O error.
//!
//! A pump never retries. Whatever happened is reported once, through the
//! `PumpReport` returned by its `JoinHandle`.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::ChildStdin;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn, Level};

use crate::exec::outcome::StreamKind;
use crate::exec::streams::{InputSource, OutputSink};

const PUMP_BUFFER_SIZE: usize = 8 * 1024;

/// Final state of one pump.
#[derive(Debug)]
pub struct PumpReport {
    pub stream: StreamKind,
    pub bytes: u64,
    pub error: Option<io::Error>,
}

/// Spawn a pump copying a child output stream into `sink`.
pub fn spawn_output_pump<R>(stream: StreamKind, source: R, sink: OutputSink) -> JoinHandle<PumpReport>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let report = match sink {
            OutputSink::Inherit => match stream {
                StreamKind::Stderr => pump_to_writer(stream, source, tokio::io::stderr(), false).await,
                _ => pump_to_writer(stream, source, tokio::io::stdout(), false).await,
            },
            OutputSink::Null => pump_to_writer(stream, source, tokio::io::sink(), true).await,
            OutputSink::Buffer(buf) => pump_to_writer(stream, source, buf, false).await,
            OutputSink::Log(level) => pump_to_log(stream, source, level).await,
            OutputSink::Writer { writer, owned } => {
                pump_to_writer(stream, source, writer, owned).await
            }
        };
        log_finished(&report);
        report
    })
}

/// Spawn a pump feeding `source` into the child's stdin.
///
/// The pump owns the child's stdin and closes it when the source is
/// exhausted so the child sees end-of-input. A broken pipe means the child
/// stopped reading (usually because it exited) and is not reported.
pub fn spawn_input_pump(source: InputSource, stdin: ChildStdin) -> JoinHandle<PumpReport> {
    tokio::spawn(async move {
        let mut report = match source {
            InputSource::Bytes(bytes) => {
                pump_to_writer(StreamKind::Stdin, io::Cursor::new(bytes), stdin, true).await
            }
            InputSource::Reader(reader) => {
                pump_to_writer(StreamKind::Stdin, reader, stdin, true).await
            }
            // No pipe is created for these; dropping stdin closes it.
            InputSource::Null | InputSource::Inherit => PumpReport {
                stream: StreamKind::Stdin,
                bytes: 0,
                error: None,
            },
        };
        if matches!(&report.error, Some(e) if e.kind() == io::ErrorKind::BrokenPipe) {
            debug!(bytes = report.bytes, "child closed stdin before input was exhausted");
            report.error = None;
        }
        log_finished(&report);
        report
    })
}

async fn pump_to_writer<R, W>(stream: StreamKind, mut source: R, mut sink: W, owned: bool) -> PumpReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (bytes, mut error) = copy(&mut source, &mut sink).await;

    if error.is_none() {
        if let Err(e) = sink.flush().await {
            error = Some(e);
        }
    }
    if owned {
        if let Err(e) = sink.shutdown().await {
            error.get_or_insert(e);
        }
    }

    PumpReport { stream, bytes, error }
}

async fn copy<R, W>(source: &mut R, sink: &mut W) -> (u64, Option<io::Error>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; PUMP_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => return (total, None),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (total, Some(e)),
        };
        if let Err(e) = sink.write_all(&buf[..n]).await {
            return (total, Some(e));
        }
        total += n as u64;
    }
}

async fn pump_to_log<R>(stream: StreamKind, source: R, level: Level) -> PumpReport
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    let mut bytes = 0u64;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(n) => {
                bytes += n as u64;
                let text = String::from_utf8_lossy(&line);
                emit_line(stream, level, text.trim_end_matches(['\r', '\n']));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return PumpReport {
                    stream,
                    bytes,
                    error: Some(e),
                };
            }
        }
    }

    PumpReport {
        stream,
        bytes,
        error: None,
    }
}

fn emit_line(stream: StreamKind, level: Level, line: &str) {
    if level == Level::ERROR {
        error!(%stream, "{}", line);
    } else if level == Level::WARN {
        warn!(%stream, "{}", line);
    } else if level == Level::INFO {
        info!(%stream, "{}", line);
    } else if level == Level::DEBUG {
        debug!(%stream, "{}", line);
    } else {
        trace!(%stream, "{}", line);
    }
}

fn log_finished(report: &PumpReport) {
    match &report.error {
        None => debug!(stream = %report.stream, bytes = report.bytes, "stream pump finished"),
        Some(e) => warn!(
            stream = %report.stream,
            bytes = report.bytes,
            error = %e,
            "stream pump stopped on I/O error"
        ),
    }
}
