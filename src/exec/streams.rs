// src/exec/streams.rs

//! Where child output goes and where child input comes from.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite};

/// Destination for a child's stdout or stderr.
pub enum OutputSink {
    /// The parent's own stdout/stderr. Flushed, never closed.
    Inherit,
    /// Discard; the child gets a null device and no pump runs.
    Null,
    /// Collect into memory.
    Buffer(SharedBuffer),
    /// Emit every line as a `tracing` event at the given level.
    Log(tracing::Level),
    /// Any async writer. It is shut down after the copy only if `owned`.
    Writer {
        writer: Box<dyn AsyncWrite + Send + Unpin>,
        owned: bool,
    },
}

impl OutputSink {
    pub fn writer(writer: impl AsyncWrite + Send + Unpin + 'static, owned: bool) -> Self {
        OutputSink::Writer {
            writer: Box::new(writer),
            owned,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, OutputSink::Null)
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSink::Inherit => f.write_str("Inherit"),
            OutputSink::Null => f.write_str("Null"),
            OutputSink::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
            OutputSink::Log(level) => f.debug_tuple("Log").field(level).finish(),
            OutputSink::Writer { owned, .. } => {
                f.debug_struct("Writer").field("owned", owned).finish_non_exhaustive()
            }
        }
    }
}

/// Source for a child's stdin.
pub enum InputSource {
    /// Child stdin is the null device.
    Null,
    /// Child shares the parent's stdin directly; no pump runs.
    Inherit,
    Bytes(Vec<u8>),
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl InputSource {
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        InputSource::Reader(Box::new(reader))
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Null => f.write_str("Null"),
            InputSource::Inherit => f.write_str("Inherit"),
            InputSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            InputSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Stream wiring for one execution.
///
/// The default pumps stdout/stderr to the parent's console and gives the
/// child a null stdin.
#[derive(Debug)]
pub struct StreamConfig {
    pub stdout: OutputSink,
    pub stderr: OutputSink,
    pub stdin: InputSource,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stdout: OutputSink::Inherit,
            stderr: OutputSink::Inherit,
            stdin: InputSource::Null,
        }
    }
}

impl StreamConfig {
    /// No pipes at all.
    pub fn null() -> Self {
        Self {
            stdout: OutputSink::Null,
            stderr: OutputSink::Null,
            stdin: InputSource::Null,
        }
    }

    pub fn stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = sink;
        self
    }

    pub fn stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = sink;
        self
    }

    pub fn stdin(mut self, source: InputSource) -> Self {
        self.stdin = source;
        self
    }
}

/// Cloneable in-memory sink. Keep one clone and hand the other to the
/// executor; the bytes are readable once the execution returns.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // Writers only ever append, so a poisoned buffer is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer").field("len", &self.len()).finish()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
