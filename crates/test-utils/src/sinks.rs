use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::future::Future;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::time::Sleep;

/// A sink that accepts at most `chunk` bytes per write and then stalls for
/// `delay`, standing in for a slow consumer.
pub struct SlowSink {
    received: Arc<Mutex<Vec<u8>>>,
    chunk: usize,
    delay: Duration,
    pause: Option<Pin<Box<Sleep>>>,
}

impl SlowSink {
    pub fn new(chunk: usize, delay: Duration) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            received: Arc::clone(&received),
            chunk: chunk.max(1),
            delay,
            pause: None,
        };
        (sink, received)
    }
}

impl AsyncWrite for SlowSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let delay = self.delay;
        let pause = self
            .pause
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(delay)));
        if pause.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }
        self.pause = None;

        let n = buf.len().min(self.chunk);
        self.received.lock().unwrap().extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
