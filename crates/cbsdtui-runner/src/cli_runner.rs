//! Process-backed command runner
//!
//! Attached runs merge stdout and stderr into one pipe so lines reach the
//! sink in the order the child wrote them. Tailed runs detach the child from
//! any pipe and follow the log file its wrapper script writes.

use crate::tail::{prepare_log, LogTail, TailConfig};
use crate::{CommandRunner, Invocation, OutputSink, Result, RunnerError};
use async_trait::async_trait;
use nix::fcntl::OFlag;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::pipe;
use tokio::process::Child;

/// Runs invocations as local child processes
#[derive(Debug, Clone, Default)]
pub struct CliRunner {
    tail: TailConfig,
}

impl CliRunner {
    pub fn new(tail: TailConfig) -> Self {
        Self { tail }
    }

    fn label(invocation: &Invocation) -> String {
        invocation
            .subcommand()
            .unwrap_or_else(|| invocation.program())
            .to_string()
    }

    /// Spawn with stdout and stderr sharing the write end of one pipe
    fn spawn_merged(invocation: &Invocation) -> Result<(pipe::Receiver, Child)> {
        let (read, write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)?;
        let write_err = write.try_clone()?;

        let child = {
            let mut cmd = invocation.to_command();
            cmd.stdin(Stdio::null())
                .stdout(Stdio::from(write))
                .stderr(Stdio::from(write_err));
            cmd.spawn().map_err(|source| RunnerError::Spawn {
                program: invocation.program().to_string(),
                source,
            })?
            // Our copies of the write end close here so EOF follows child exit
        };

        let reader = pipe::Receiver::from_owned_fd(read)?;
        Ok((reader, child))
    }

    async fn wait_logged(label: &str, child: &mut Child) {
        match child.wait().await {
            Ok(status) if status.success() => {
                tracing::debug!("{} completed", label);
            }
            Ok(status) => {
                tracing::warn!("{} exited with {}", label, status);
            }
            Err(e) => {
                tracing::warn!("Waiting for {} failed: {}", label, e);
            }
        }
    }
}

#[async_trait]
impl CommandRunner for CliRunner {
    async fn output(&self, invocation: &Invocation) -> Result<String> {
        tracing::debug!("Running: {}", invocation);
        let mut cmd = invocation.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|source| RunnerError::Spawn {
            program: invocation.program().to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(RunnerError::Exit {
                program: Self::label(invocation),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn run_attached(&self, invocation: &Invocation, sink: &OutputSink) {
        let label = Self::label(invocation);
        tracing::debug!("Running attached: {}", invocation);

        let (reader, mut child) = match Self::spawn_merged(invocation) {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::warn!("Cannot run {}: {}", label, e);
                return;
            }
        };

        let scan_sink = sink.clone();
        let scan = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => scan_sink.append(line),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Reading command output failed: {}", e);
                        break;
                    }
                }
            }
        });

        if let Err(e) = scan.await {
            tracing::warn!("Output scan for {} failed: {}", label, e);
        }
        Self::wait_logged(&label, &mut child).await;
    }

    async fn run_tailing(&self, invocation: &Invocation, log: &Path, sink: &OutputSink) {
        let label = Self::label(invocation);
        tracing::debug!("Running detached: {} (log {:?})", invocation, log);

        if let Err(e) = prepare_log(log).await {
            tracing::warn!("Cannot reset log {:?}: {}", log, e);
        }
        let tail = LogTail::spawn(log.to_path_buf(), sink.clone(), self.tail);

        let mut cmd = invocation.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match cmd.spawn() {
            Ok(mut child) => Self::wait_logged(&label, &mut child).await,
            Err(e) => tracing::warn!("Cannot run {}: {}", label, e),
        }

        let report = tail.stop().await;
        tracing::debug!(
            "{}: tailed {} bytes (truncated: {})",
            label,
            report.bytes_read,
            report.truncated
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputBuffer;
    use std::time::Duration;

    fn sh(script: &str) -> Invocation {
        Invocation::new("/bin/sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_output_captures_stdout() {
        let runner = CliRunner::default();
        let out = runner.output(&sh("echo 42")).await.unwrap();
        assert_eq!(out.trim(), "42");
    }

    #[tokio::test]
    async fn test_output_sets_nocolor() {
        let runner = CliRunner::default();
        let out = runner.output(&sh("echo $NOCOLOR")).await.unwrap();
        assert_eq!(out.trim(), "1");
    }

    #[tokio::test]
    async fn test_output_nonzero_exit_is_error() {
        let runner = CliRunner::default();
        let err = runner
            .output(&sh("echo broken >&2; exit 3"))
            .await
            .unwrap_err();
        match err {
            RunnerError::Exit { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_output_missing_program_is_spawn_error() {
        let runner = CliRunner::default();
        let err = runner
            .output(&Invocation::new("/nonexistent/cbsd"))
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_attached_merges_stderr_in_order() {
        let runner = CliRunner::default();
        let (sink, mut rx) = OutputSink::channel();

        runner
            .run_attached(&sh("echo one; echo two >&2; echo three"), &sink)
            .await;

        let mut buf = OutputBuffer::new();
        buf.drain(&mut rx);
        assert_eq!(buf.text(), "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_attached_failure_is_not_raised() {
        let runner = CliRunner::default();
        let (sink, mut rx) = OutputSink::channel();

        runner.run_attached(&sh("echo partial; exit 1"), &sink).await;
        runner
            .run_attached(&Invocation::new("/nonexistent/cbsd"), &sink)
            .await;

        let mut buf = OutputBuffer::new();
        buf.drain(&mut rx);
        assert_eq!(buf.text(), "partial\n");
    }

    #[tokio::test]
    async fn test_tailing_follows_log_written_by_child() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("jstart.log");
        std::fs::write(&log, "previous run\n").unwrap();

        let runner = CliRunner::new(TailConfig {
            interval: Duration::from_millis(10),
            ..TailConfig::default()
        });
        let (sink, mut rx) = OutputSink::channel();
        let script = format!(
            "echo booting > {log}; sleep 0.1; echo ready >> {log}",
            log = log.display()
        );

        runner.run_tailing(&sh(&script), &log, &sink).await;

        let mut buf = OutputBuffer::new();
        buf.drain(&mut rx);
        assert_eq!(buf.text(), "booting\nready\n");
    }
}
