use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::events::{OutputRelay, OutputStream};
use crate::job::{JobDescriptor, JobId, JobOutcome};
use crate::runtime::CancelToken;

/// Marker prefix the worker prints to announce where it actually wrote the
/// subtitle file.
///
/// This is a free-text coupling inherited from the worker script; parsing
/// is confined to [`parse_output_marker`] so a structured terminal record
/// can replace it without touching the rest of the adapter.
pub const SRT_OUTPUT_MARKER: &str = "SRT_OUTPUT_PATH:";

/// Extract the announced subtitle path from one line of worker output.
///
/// Returns `None` when the line carries no marker or the marker has no
/// path after it.
pub fn parse_output_marker(line: &str) -> Option<PathBuf> {
    let start = line.find(SRT_OUTPUT_MARKER)? + SRT_OUTPUT_MARKER.len();
    let path = line[start..].trim();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Starts the external worker for one job and reports its terminal outcome.
///
/// The orchestrator treats the worker as a black box characterized only by
/// its invocation arguments, a line-oriented output stream, and an exit
/// classification. This seam is what lets tests drive the pool without
/// spawning real processes.
#[async_trait]
pub trait WorkerInvoker: Send + Sync {
    /// Run one job to its terminal outcome.
    ///
    /// Implementations forward worker output through `relay` as it arrives
    /// and return exactly one [`JobOutcome`]. Observing `cancel` is
    /// best-effort: an implementation that ignores it simply runs the job
    /// to completion.
    async fn invoke(
        &self,
        descriptor: &JobDescriptor,
        relay: &OutputRelay,
        cancel: &CancelToken,
    ) -> JobOutcome;
}

/// Configuration for [`ProcessWorkerInvoker`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessInvokerConfig {
    /// Interpreter to launch, e.g. `python3`.
    pub program: PathBuf,
    /// Worker script handed to the interpreter as its first argument.
    pub script: PathBuf,
    /// Kill the worker and fail the job if it runs longer than this.
    /// `None` lets a hung worker occupy its slot indefinitely.
    pub job_timeout: Option<Duration>,
}

impl ProcessInvokerConfig {
    pub fn new(program: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            job_timeout: None,
        }
    }

    /// Set the per-job timeout.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }
}

/// Worker adapter that spawns one external process per job.
///
/// stdout and stderr are read line-by-line on independent tasks and
/// forwarded through the relay; their relative interleaving is not
/// guaranteed. stdout lines are additionally scanned for the
/// [`SRT_OUTPUT_MARKER`] so the true output path can be reported even when
/// the worker picks its own file name.
///
/// Exit classification: status 0 maps to `Succeeded`, any nonzero exit to
/// `Failed`, and a spawn error to `LaunchFailed`. The adapter performs no
/// validation of the descriptor's paths; a missing input surfaces as a
/// worker-reported failure.
#[derive(Clone, Debug)]
pub struct ProcessWorkerInvoker {
    config: ProcessInvokerConfig,
}

impl ProcessWorkerInvoker {
    pub fn new(config: ProcessInvokerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessInvokerConfig {
        &self.config
    }

    /// Deterministic argv for one job, derived from the descriptor.
    fn build_args(&self, descriptor: &JobDescriptor) -> Vec<OsString> {
        let mut args = vec![
            self.config.script.clone().into_os_string(),
            descriptor.source_path.clone().into_os_string(),
            OsString::from("--output_srt_path"),
            descriptor.output_path.clone().into_os_string(),
            OsString::from("--model"),
            OsString::from(descriptor.options.model.clone()),
            OsString::from("--task"),
            OsString::from(descriptor.options.task.as_str()),
        ];

        if let Some(language) = descriptor.options.language.as_deref() {
            let language = language.trim();
            if !language.is_empty() {
                args.push(OsString::from("--language"));
                args.push(OsString::from(language));
            }
        }

        args
    }
}

#[async_trait]
impl WorkerInvoker for ProcessWorkerInvoker {
    async fn invoke(
        &self,
        descriptor: &JobDescriptor,
        relay: &OutputRelay,
        cancel: &CancelToken,
    ) -> JobOutcome {
        let job_id = descriptor.id;

        let mut command = Command::new(&self.config.program);
        command
            .args(self.build_args(descriptor))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return JobOutcome::LaunchFailed {
                    reason: format!(
                        "failed to start {}: {err}",
                        self.config.program.display()
                    ),
                };
            }
        };

        let stdout_task = child.stdout.take().map(|out| {
            let relay = relay.clone();
            tokio::spawn(forward_stdout(out, relay, job_id))
        });
        let stderr_task = child.stderr.take().map(|err| {
            let relay = relay.clone();
            tokio::spawn(forward_stderr(err, relay, job_id))
        });

        let timeout = self.config.job_timeout;
        let wait_result = tokio::select! {
            status = child.wait() => status,
            () = cancel.cancelled() => {
                tracing::info!(%job_id, "cancellation requested, killing worker");
                let _ = child.kill().await;
                drain_readers(stdout_task, stderr_task).await;
                return JobOutcome::Failed {
                    reason: "cancelled".to_string(),
                };
            }
            () = sleep_or_never(timeout) => {
                tracing::warn!(%job_id, ?timeout, "worker exceeded timeout, killing");
                let _ = child.kill().await;
                drain_readers(stdout_task, stderr_task).await;
                return JobOutcome::Failed {
                    reason: format!(
                        "worker timed out after {:?}",
                        timeout.unwrap_or_default()
                    ),
                };
            }
        };

        let status = match wait_result {
            Ok(status) => status,
            Err(err) => {
                drain_readers(stdout_task, stderr_task).await;
                return JobOutcome::Failed {
                    reason: format!("failed to wait on worker: {err}"),
                };
            }
        };

        // Flush both streams before classifying, so subscribers see every
        // line ahead of the completion event.
        let marker = drain_readers(stdout_task, stderr_task).await;

        if status.success() {
            JobOutcome::Succeeded {
                output_path: marker.unwrap_or_else(|| descriptor.output_path.clone()),
            }
        } else {
            let reason = match status.code() {
                Some(code) => format!("worker exited with code {code}"),
                None => "worker terminated by signal".to_string(),
            };
            JobOutcome::Failed { reason }
        }
    }
}

/// Sleep for the configured timeout, or forever when none is set.
async fn sleep_or_never(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Wait for both reader tasks, returning the marker path seen on stdout.
async fn drain_readers(
    stdout_task: Option<JoinHandle<Option<PathBuf>>>,
    stderr_task: Option<JoinHandle<()>>,
) -> Option<PathBuf> {
    let marker = match stdout_task {
        Some(handle) => handle.await.unwrap_or(None),
        None => None,
    };
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    marker
}

async fn forward_stdout(out: ChildStdout, relay: OutputRelay, job_id: JobId) -> Option<PathBuf> {
    let mut lines = BufReader::new(out).lines();
    let mut marker = None;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(path) = parse_output_marker(&line) {
                    marker = Some(path);
                }
                relay.publish(job_id, OutputStream::Stdout, line);
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(%job_id, "worker stdout read error: {err}");
                break;
            }
        }
    }
    marker
}

async fn forward_stderr(err_stream: ChildStderr, relay: OutputRelay, job_id: JobId) {
    let mut lines = BufReader::new(err_stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => relay.publish(job_id, OutputStream::Stderr, line),
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(%job_id, "worker stderr read error: {err}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{TaskKind, WorkerOptions};

    fn invoker() -> ProcessWorkerInvoker {
        ProcessWorkerInvoker::new(ProcessInvokerConfig::new(
            "python3",
            "transcribe_video.py",
        ))
    }

    #[test]
    fn test_marker_parsed_anywhere_in_line() {
        assert_eq!(
            parse_output_marker("SRT_OUTPUT_PATH:/subs/movie.srt"),
            Some(PathBuf::from("/subs/movie.srt"))
        );
        assert_eq!(
            parse_output_marker("done. SRT_OUTPUT_PATH: /subs/movie.srt "),
            Some(PathBuf::from("/subs/movie.srt"))
        );
        assert_eq!(parse_output_marker("no marker here"), None);
        assert_eq!(parse_output_marker("SRT_OUTPUT_PATH:   "), None);
    }

    #[test]
    fn test_args_include_all_option_flags() {
        let descriptor = JobDescriptor::new(
            "/videos/talk.mp4",
            "/subs/talk.srt",
            WorkerOptions::new("small")
                .with_task(TaskKind::Translate)
                .with_language("ja"),
        );

        let args = invoker().build_args(&descriptor);
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "transcribe_video.py",
                "/videos/talk.mp4",
                "--output_srt_path",
                "/subs/talk.srt",
                "--model",
                "small",
                "--task",
                "translate",
                "--language",
                "ja",
            ]
        );
    }

    #[test]
    fn test_blank_language_not_forwarded() {
        for language in [None, Some(""), Some("   ")] {
            let mut options = WorkerOptions::new("base");
            options.language = language.map(str::to_string);
            let descriptor = JobDescriptor::new("/v/a.mp4", "/s/a.srt", options);

            let args = invoker().build_args(&descriptor);
            assert!(
                !args.iter().any(|a| a == "--language"),
                "language flag leaked for {language:?}"
            );
        }
    }
}
