//! External command runner for cbsd-tui
//!
//! This crate owns the process boundary: building `cbsd` argument vectors,
//! running them attached or detached, and streaming their output into a
//! sink that the UI drains on its own task.

mod cli_runner;
mod error;
mod invocation;
mod sink;
mod tail;

pub use cli_runner::CliRunner;
pub use error::*;
pub use invocation::*;
pub use sink::*;
pub use tail::*;

use async_trait::async_trait;
use std::path::Path;

/// Executes external commands on behalf of containers
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a short query and capture its stdout
    async fn output(&self, invocation: &Invocation) -> Result<String>;

    /// Run with stdout and stderr merged and streamed into `sink` line by
    /// line. Returns once output is drained and the process has exited.
    /// Failures are logged, never returned.
    async fn run_attached(&self, invocation: &Invocation, sink: &OutputSink);

    /// Run detached while tailing `log`, which the command writes to.
    /// Failures are logged, never returned.
    async fn run_tailing(&self, invocation: &Invocation, log: &Path, sink: &OutputSink);
}
