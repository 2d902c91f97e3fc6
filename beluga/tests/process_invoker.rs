//! Process invoker tests against real child processes.
//!
//! Each test writes a small shell script standing in for the worker and
//! drives it through [`ProcessWorkerInvoker`] with `/bin/sh` as the
//! interpreter.

use std::path::{Path, PathBuf};
use std::time::Duration;

use beluga::runtime::CancelToken;
use beluga::{
    BatchEventBus, BatchEventPayload, BatchId, JobDescriptor, JobOutcome, OutputStream,
    ProcessInvokerConfig, ProcessWorkerInvoker, WorkerInvoker, WorkerOptions,
};
use tempfile::TempDir;
use tokio::time::timeout;

fn write_script(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("worker.sh");
    std::fs::write(&path, body).expect("script write should succeed");
    path
}

fn invoker_for(script: &Path) -> ProcessWorkerInvoker {
    ProcessWorkerInvoker::new(ProcessInvokerConfig::new("/bin/sh", script))
}

fn descriptor() -> JobDescriptor {
    JobDescriptor::new(
        "/videos/talk.mp4",
        "/subs/talk.srt",
        WorkerOptions::default(),
    )
}

async fn run(
    invoker: &ProcessWorkerInvoker,
    descriptor: &JobDescriptor,
    bus: &BatchEventBus,
    cancel: &CancelToken,
) -> JobOutcome {
    let relay = bus.relay(BatchId::new());
    timeout(Duration::from_secs(10), invoker.invoke(descriptor, &relay, cancel))
        .await
        .expect("invocation should finish within timeout")
}

#[tokio::test]
async fn test_clean_exit_with_marker_reports_announced_path() {
    let dir = TempDir::new().expect("tempdir");
    let script = write_script(
        &dir,
        "echo 'loading model'\necho 'SRT_OUTPUT_PATH: /subs/announced.srt'\nexit 0\n",
    );

    let bus = BatchEventBus::new(64);
    let outcome = run(&invoker_for(&script), &descriptor(), &bus, &CancelToken::new()).await;
    assert_eq!(
        outcome,
        JobOutcome::Succeeded {
            output_path: PathBuf::from("/subs/announced.srt")
        }
    );
}

#[tokio::test]
async fn test_clean_exit_without_marker_falls_back_to_descriptor_path() {
    let dir = TempDir::new().expect("tempdir");
    let script = write_script(&dir, "echo 'done'\nexit 0\n");

    let bus = BatchEventBus::new(64);
    let d = descriptor();
    let outcome = run(&invoker_for(&script), &d, &bus, &CancelToken::new()).await;
    assert_eq!(
        outcome,
        JobOutcome::Succeeded {
            output_path: d.output_path.clone()
        }
    );
}

#[tokio::test]
async fn test_nonzero_exit_reports_failure_with_code() {
    let dir = TempDir::new().expect("tempdir");
    let script = write_script(&dir, "exit 3\n");

    let bus = BatchEventBus::new(64);
    let outcome = run(&invoker_for(&script), &descriptor(), &bus, &CancelToken::new()).await;
    match outcome {
        JobOutcome::Failed { reason } => assert!(reason.contains('3'), "reason: {reason}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_stderr_lines_are_forwarded_tagged() {
    let dir = TempDir::new().expect("tempdir");
    let script = write_script(&dir, "echo 'progress' \necho 'ffmpeg warning' >&2\nexit 0\n");

    let bus = BatchEventBus::new(64);
    let mut rx = bus.subscribe();
    let outcome = run(&invoker_for(&script), &descriptor(), &bus, &CancelToken::new()).await;
    assert!(outcome.is_success());

    let mut saw_stderr = false;
    while let Ok(event) = rx.try_recv() {
        if let BatchEventPayload::OutputLine { stream, line, .. } = event.payload {
            if stream == OutputStream::Stderr {
                assert_eq!(line, "ffmpeg warning");
                saw_stderr = true;
            }
        }
    }
    assert!(saw_stderr, "stderr line never reached the bus");
}

#[tokio::test]
async fn test_missing_interpreter_is_launch_failure() {
    let invoker = ProcessWorkerInvoker::new(ProcessInvokerConfig::new(
        "/nonexistent/interpreter",
        "worker.sh",
    ));

    let bus = BatchEventBus::new(64);
    let outcome = run(&invoker, &descriptor(), &bus, &CancelToken::new()).await;
    match outcome {
        JobOutcome::LaunchFailed { reason } => {
            assert!(reason.contains("/nonexistent/interpreter"), "reason: {reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_hung_worker_is_killed_on_timeout() {
    let dir = TempDir::new().expect("tempdir");
    let script = write_script(&dir, "sleep 30\nexit 0\n");

    let invoker = ProcessWorkerInvoker::new(
        ProcessInvokerConfig::new("/bin/sh", &script)
            .with_job_timeout(Duration::from_millis(200)),
    );

    let bus = BatchEventBus::new(64);
    let outcome = run(&invoker, &descriptor(), &bus, &CancelToken::new()).await;
    match outcome {
        JobOutcome::Failed { reason } => {
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_kills_running_worker() {
    let dir = TempDir::new().expect("tempdir");
    let script = write_script(&dir, "sleep 30\nexit 0\n");

    let bus = BatchEventBus::new(64);
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let outcome = run(&invoker_for(&script), &descriptor(), &bus, &cancel).await;
    assert_eq!(
        outcome,
        JobOutcome::Failed {
            reason: "cancelled".to_string()
        }
    );
}
