#![cfg(unix)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use procward::command::Command;
use procward::config::ExecConfig;
use procward::exec::{
    Executor, InputSource, OutputSink, ProcessHandle, SharedBuffer, StreamConfig, StreamKind,
    StreamRouter,
};
use procward_test_utils::sinks::SlowSink;
use procward_test_utils::{init_tracing, script, with_timeout};
use tokio::io::AsyncWrite;

const TEN_MB: usize = 10 * 1024 * 1024;

fn expected_big_output(len: usize) -> Vec<u8> {
    b"0123456789abcdef\n".iter().copied().cycle().take(len).collect()
}

fn executor(grace: Duration) -> Executor {
    Executor::new(
        ExecConfig::default()
            .with_timeout(Duration::from_secs(60))
            .with_drain_grace_period(grace),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn stdout_is_copied_byte_for_byte() {
    init_tracing();
    let stdout = SharedBuffer::new();
    let streams = StreamConfig::null().stdout(OutputSink::Buffer(stdout.clone()));

    let report = with_timeout(
        executor(Duration::from_secs(5)).execute(&script("big_output").arg(TEN_MB.to_string()), streams),
    )
    .await
    .unwrap();

    assert!(report.stream_warning.is_none());
    assert_eq!(stdout.len(), TEN_MB);
    assert!(stdout.contents() == expected_big_output(TEN_MB), "stdout differs from what was written");
}

#[tokio::test(flavor = "multi_thread")]
async fn stdout_and_stderr_go_to_their_own_sinks() {
    init_tracing();
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();
    let streams = StreamConfig::null()
        .stdout(OutputSink::Buffer(stdout.clone()))
        .stderr(OutputSink::Buffer(stderr.clone()));
    let cmd = Command::new("sh").arg("-c").arg("echo out; echo err >&2; echo more");

    executor(Duration::from_secs(2)).execute(&cmd, streams).await.unwrap();

    assert_eq!(stdout.contents_lossy(), "out\nmore\n");
    assert_eq!(stderr.contents_lossy(), "err\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn stdin_bytes_reach_the_child_and_are_closed() {
    init_tracing();
    let stdout = SharedBuffer::new();
    let streams = StreamConfig::null()
        .stdin(InputSource::Bytes(b"line one\nline two\n".to_vec()))
        .stdout(OutputSink::Buffer(stdout.clone()));

    // `cat` only exits once stdin is closed.
    let report = with_timeout(executor(Duration::from_secs(2)).execute(&Command::new("cat"), streams))
        .await
        .unwrap();

    assert_eq!(report.exit_code(), 0);
    assert_eq!(stdout.contents_lossy(), "line one\nline two\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn child_ignoring_stdin_is_not_a_stream_error() {
    init_tracing();
    let streams = StreamConfig::null().stdin(InputSource::Bytes(vec![b'x'; 1024 * 1024]));

    let report = with_timeout(executor(Duration::from_secs(2)).execute(&Command::new("true"), streams))
        .await
        .unwrap();

    assert!(report.stream_warning.is_none(), "got {:?}", report.stream_warning);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_consumer_receives_everything_within_grace() {
    init_tracing();
    let (sink, received) = SlowSink::new(256 * 1024, Duration::from_millis(1));
    let streams = StreamConfig::null().stdout(OutputSink::writer(sink, true));

    let report = with_timeout(
        executor(Duration::from_secs(10)).execute(&script("big_output").arg(TEN_MB.to_string()), streams),
    )
    .await
    .unwrap();

    assert!(report.stream_warning.is_none());
    assert!(*received.lock().unwrap() == expected_big_output(TEN_MB));
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_consumer_past_grace_period_is_a_warning_not_a_failure() {
    init_tracing();
    // 60 KB fits in the pipe buffer, so the child exits at once. At 4 KiB
    // per 50ms the sink needs ~750ms, past the 300ms grace period.
    let (sink, received) = SlowSink::new(4 * 1024, Duration::from_millis(50));
    let streams = StreamConfig::null().stdout(OutputSink::writer(sink, false));

    let started = Instant::now();
    let report = with_timeout(
        executor(Duration::from_millis(300)).execute(&script("big_output").arg("60000"), streams),
    )
    .await
    .unwrap();

    assert_eq!(report.exit_code(), 0);
    let warning = report.stream_warning.expect("expected a stream warning");
    assert_eq!(warning.not_drained, vec![StreamKind::Stdout]);
    assert!(received.lock().unwrap().len() < 60000);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test(flavor = "multi_thread")]
async fn background_job_holding_stdout_does_not_hang_the_caller() {
    init_tracing();
    let stdout = SharedBuffer::new();
    let streams = StreamConfig::null().stdout(OutputSink::Buffer(stdout.clone()));

    let started = Instant::now();
    let report = with_timeout(
        executor(Duration::from_millis(300)).execute(&script("detached_writer"), streams),
    )
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(report.exit_code(), 0);
    assert!(report.stream_warning.is_some());
    assert_eq!(stdout.contents_lossy(), "early\n");
}

/// Records whether `shutdown` was called.
struct ShutdownFlag(Arc<AtomicBool>);

impl AsyncWrite for ShutdownFlag {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.0.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn only_owned_sinks_are_closed() {
    init_tracing();
    let borrowed = Arc::new(AtomicBool::new(false));
    let owned = Arc::new(AtomicBool::new(false));
    let streams = StreamConfig::null()
        .stdout(OutputSink::writer(ShutdownFlag(Arc::clone(&borrowed)), false))
        .stderr(OutputSink::writer(ShutdownFlag(Arc::clone(&owned)), true));
    let cmd = Command::new("sh").arg("-c").arg("echo out; echo err >&2");

    executor(Duration::from_secs(2)).execute(&cmd, streams).await.unwrap();

    assert!(!borrowed.load(Ordering::SeqCst), "caller's sink was closed");
    assert!(owned.load(Ordering::SeqCst), "owned sink was not closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_and_join_is_idempotent() {
    init_tracing();
    let stdout = SharedBuffer::new();
    let mut router = StreamRouter::new(StreamConfig::null().stdout(OutputSink::Buffer(stdout.clone())));

    let mut cmd = Command::new("echo").arg("hi").to_tokio_command();
    router.configure(&mut cmd);
    let mut process = ProcessHandle::spawn(cmd, false).unwrap();
    router.start(process.child_mut());
    process.wait().await.unwrap();

    let first = router.stop_and_join(Duration::from_secs(2)).await;
    assert!(first.is_clean());

    let started = Instant::now();
    let second = router.stop_and_join(Duration::from_secs(2)).await;
    assert!(second.is_clean());
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(stdout.contents_lossy(), "hi\n");
}
