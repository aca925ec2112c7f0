//! Log-file tailing for detached commands
//!
//! A detached command writes into a log file; [`LogTail`] polls the file's
//! size and forwards complete lines of new content to an [`OutputSink`].

use crate::sink::OutputSink;
use cbsdtui_config::UiConfig;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_MAX_TAIL_BYTES: u64 = 1_000_000;
pub const TRUNCATION_WARNING: &str = "produced output is too long, it will be truncated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailConfig {
    pub interval: Duration,
    pub max_bytes: u64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(300),
            max_bytes: DEFAULT_MAX_TAIL_BYTES,
        }
    }
}

impl From<&UiConfig> for TailConfig {
    fn from(ui: &UiConfig) -> Self {
        Self {
            interval: ui.tail_interval(),
            max_bytes: ui.max_tail_bytes,
        }
    }
}

/// What a tailing session observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailReport {
    pub bytes_read: u64,
    pub truncated: bool,
}

/// Create the log file, or empty it if it exists
pub async fn prepare_log(path: &Path) -> io::Result<()> {
    File::create(path).await.map(|_| ())
}

/// A running tail session
pub struct LogTail {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<TailReport>,
}

impl LogTail {
    pub fn spawn(path: PathBuf, sink: OutputSink, config: TailConfig) -> Self {
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(tail_loop(path, sink, config, stop_rx));
        Self { stop, handle }
    }

    /// Signal completion, wait for the final read and return the report
    pub async fn stop(self) -> TailReport {
        // The loop may already have ended on its own after truncation
        let _ = self.stop.send(());
        match self.handle.await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Log tail task failed: {}", e);
                TailReport::default()
            }
        }
    }
}

async fn tail_loop(
    path: PathBuf,
    sink: OutputSink,
    config: TailConfig,
    mut stop: oneshot::Receiver<()>,
) -> TailReport {
    let mut file = match File::open(&path).await {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Cannot open {:?} for tailing: {}", path, e);
            return TailReport::default();
        }
    };

    let mut state = TailState::default();
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut stop => {
                if let Err(e) = state.poll(&mut file, &sink, config.max_bytes).await {
                    tracing::warn!("Final read of {:?} failed: {}", path, e);
                }
                break;
            }
            _ = ticker.tick() => {
                match state.poll(&mut file, &sink, config.max_bytes).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        tracing::warn!("Reading {:?} failed: {}", path, e);
                        break;
                    }
                }
            }
        }
    }

    state.flush(&sink);
    state.report
}

#[derive(Default)]
struct TailState {
    offset: u64,
    /// Bytes after the last newline seen so far
    pending: Vec<u8>,
    report: TailReport,
}

impl TailState {
    /// Read new content up to the cap. Returns false once the cap is exceeded.
    async fn poll(&mut self, file: &mut File, sink: &OutputSink, max_bytes: u64) -> io::Result<bool> {
        if self.report.truncated {
            return Ok(false);
        }

        let size = file.metadata().await?.len();
        let limit = size.min(max_bytes);

        if limit > self.offset {
            file.seek(SeekFrom::Start(self.offset)).await?;
            let mut chunk = Vec::with_capacity((limit - self.offset) as usize);
            (&mut *file).take(limit - self.offset).read_to_end(&mut chunk).await?;
            self.offset += chunk.len() as u64;
            self.report.bytes_read = self.offset;
            self.pending.extend_from_slice(&chunk);
            self.emit_complete_lines(sink);
        }

        if size > max_bytes {
            tracing::warn!("{}", TRUNCATION_WARNING);
            self.report.truncated = true;
            return Ok(false);
        }

        Ok(true)
    }

    fn emit_complete_lines(&mut self, sink: &OutputSink) {
        if let Some(pos) = self.pending.iter().rposition(|&b| b == b'\n') {
            let complete: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&complete[..complete.len() - 1]);
            sink.append(text.into_owned());
        }
    }

    fn flush(&mut self, sink: &OutputSink) {
        if !self.pending.is_empty() {
            sink.append(String::from_utf8_lossy(&self.pending).into_owned());
            self.pending.clear();
        }
    }
}
