//! Test support utilities for cbsdtui-core
//!
//! Provides a scripted command runner, an in-memory store and a recording
//! console so lifecycle logic can be tested without cbsd or its databases.

use crate::{Console, ContainerKind, ContainerRow, ContainerStore, CoreError, Host, Result};
use async_trait::async_trait;
use cbsdtui_config::ToolsConfig;
use cbsdtui_runner::{CbsdCli, CommandRunner, Invocation, OutputSink, RunnerError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Records which runner methods were called, with their argv
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Output(Vec<String>),
    Attached(Vec<String>),
    Tailing {
        argv: Vec<String>,
        log: PathBuf,
        /// Content of the script passed as first argument, if readable
        script: Option<String>,
    },
}

/// Command runner with scripted results keyed by tool subcommand
#[derive(Default)]
pub struct MockRunner {
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    outputs: Mutex<HashMap<String, std::result::Result<String, String>>>,
    attached_lines: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// `output()` for `subcommand` returns `stdout`
    pub fn with_output(self, subcommand: &str, stdout: &str) -> Self {
        self.set_output(subcommand, stdout);
        self
    }

    /// `output()` for `subcommand` fails with `stderr`
    pub fn with_failure(self, subcommand: &str, stderr: &str) -> Self {
        lock(&self.outputs).insert(subcommand.to_string(), Err(stderr.to_string()));
        self
    }

    /// Lines every attached run writes to its sink
    pub fn with_attached_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *lock(&self.attached_lines) = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_output(&self, subcommand: &str, stdout: &str) {
        lock(&self.outputs).insert(subcommand.to_string(), Ok(stdout.to_string()));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn was_called(&self, call: &MockCall) -> bool {
        lock(&self.calls).contains(call)
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn output(&self, invocation: &Invocation) -> cbsdtui_runner::Result<String> {
        self.record(MockCall::Output(invocation.argv()));
        let key = invocation.subcommand().unwrap_or(invocation.program());
        match lock(&self.outputs).get(key) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(stderr)) => Err(RunnerError::Exit {
                program: invocation.program().to_string(),
                code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Err(RunnerError::Exit {
                program: invocation.program().to_string(),
                code: Some(1),
                stderr: format!("no scripted output for {}", key),
            }),
        }
    }

    async fn run_attached(&self, invocation: &Invocation, sink: &OutputSink) {
        self.record(MockCall::Attached(invocation.argv()));
        let lines = lock(&self.attached_lines).clone();
        for line in lines {
            sink.append(line);
        }
    }

    async fn run_tailing(&self, invocation: &Invocation, log: &Path, _sink: &OutputSink) {
        let script = invocation
            .args()
            .first()
            .and_then(|path| std::fs::read_to_string(path).ok());
        self.record(MockCall::Tailing {
            argv: invocation.argv(),
            log: log.to_path_buf(),
            script,
        });
    }
}

/// In-memory rows; `put` replaces a row and counts the write
#[derive(Default)]
pub struct MockStore {
    rows: Mutex<Vec<ContainerRow>>,
    params: Mutex<HashMap<String, Vec<(String, String)>>>,
    writes: Mutex<usize>,
}

impl MockStore {
    pub fn new(rows: Vec<ContainerRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn with_params(self, name: &str, params: &[(&str, &str)]) -> Self {
        lock(&self.params).insert(
            name.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn write_count(&self) -> usize {
        *lock(&self.writes)
    }

    pub fn row(&self, kind: ContainerKind, name: &str) -> Option<ContainerRow> {
        lock(&self.rows)
            .iter()
            .find(|r| r.kind == kind && r.name == name)
            .cloned()
    }

    /// Replace or add a row without counting a write
    pub fn set_row(&self, row: ContainerRow) {
        let mut rows = lock(&self.rows);
        match rows.iter_mut().find(|r| r.kind == row.kind && r.name == row.name) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    pub fn remove(&self, kind: ContainerKind, name: &str) {
        lock(&self.rows).retain(|r| !(r.kind == kind && r.name == name));
    }
}

impl ContainerStore for MockStore {
    fn list(&self, kind: ContainerKind) -> Result<Vec<ContainerRow>> {
        Ok(lock(&self.rows)
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    fn get(&self, kind: ContainerKind, name: &str) -> Result<Option<ContainerRow>> {
        Ok(self.row(kind, name))
    }

    fn full_row(&self, _kind: ContainerKind, name: &str) -> Result<Vec<(String, String)>> {
        Ok(lock(&self.params).get(name).cloned().unwrap_or_default())
    }

    fn put(&self, row: &ContainerRow) -> Result<()> {
        let mut rows = lock(&self.rows);
        let existing = rows
            .iter_mut()
            .find(|r| r.kind == row.kind && r.name == row.name)
            .ok_or_else(|| CoreError::NoRowsUpdated {
                table: "jails",
                name: row.name.clone(),
            })?;
        *existing = row.clone();
        *lock(&self.writes) += 1;
        Ok(())
    }
}

/// Console that records what was typed into it
#[derive(Default)]
pub struct RecordingConsole {
    active: Mutex<Option<String>>,
    sent: Mutex<Vec<String>>,
}

impl RecordingConsole {
    pub fn with_active(name: &str) -> Self {
        Self {
            active: Mutex::new(Some(name.to_string())),
            ..Default::default()
        }
    }

    /// Lines sent so far; Ctrl-C shows as `^C`
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }
}

impl Console for RecordingConsole {
    fn active(&self) -> Option<String> {
        lock(&self.active).clone()
    }

    fn set_active(&self, name: Option<String>) {
        *lock(&self.active) = name;
    }

    fn send(&self, line: &str) {
        lock(&self.sent).push(line.to_string());
    }

    fn interrupt(&self) {
        lock(&self.sent).push("^C".to_string());
    }
}

/// Tools as seen in recorded argv: plain `cbsd`, default shell and stdbuf
pub fn mock_tools() -> ToolsConfig {
    ToolsConfig {
        cbsd: "cbsd".to_string(),
        ..Default::default()
    }
}

/// A host backed by `runner` and a [`MockStore`] holding `rows`
pub fn mock_host(runner: MockRunner, rows: Vec<ContainerRow>) -> (Host, Arc<MockStore>) {
    mock_host_shared(Arc::new(runner), rows)
}

/// Like [`mock_host`] but the caller keeps a handle on the runner
pub fn mock_host_shared(
    runner: Arc<MockRunner>,
    rows: Vec<ContainerRow>,
) -> (Host, Arc<MockStore>) {
    mock_host_with_store(runner, Arc::new(MockStore::new(rows)))
}

pub fn mock_host_with_store(
    runner: Arc<MockRunner>,
    store: Arc<MockStore>,
) -> (Host, Arc<MockStore>) {
    let tools = mock_tools();
    let cli = CbsdCli::with_privilege(&tools, true);
    let host = Host::new(runner, store.clone(), cli, tools, "/tmp/jstart.log");
    (host, store)
}

/// Owned argv from string literals
pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
