//! Terminal UI for cbsd-tui
//!
//! Built with Ratatui. Lists jails, bhyve VMs and QEMU VMs, runs their
//! lifecycle actions with live output and hosts the login console.

pub mod app;
mod console;
mod error;
mod event;
pub mod ui;
pub mod widgets;

pub use app::{App, ConfirmAction, Dialog, DialogFocus, View};
pub use console::{ConsoleExit, ConsoleSession};
pub use error::*;
pub use event::{Event, EventHandler};

use cbsdtui_config::GlobalConfig;
use cbsdtui_core::Host;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use tracing::dispatcher::DefaultGuard;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;

/// Run the TUI application
pub async fn run(host: Host, config: &GlobalConfig) -> AppResult<()> {
    // Logs must not reach the terminal while the TUI draws on it
    let _guard = install_logging(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = match App::new(host, config).await {
        Ok(mut app) => app.run(&mut terminal).await,
        Err(e) => Err(e),
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

/// Route logs to the configured file, or nowhere.
///
/// Background tasks log from other threads, so this becomes the global
/// subscriber when none is set yet. Otherwise it only covers this thread.
fn install_logging(config: &GlobalConfig) -> AppResult<Option<DefaultGuard>> {
    let dispatch = match config.ui.log_path()? {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            Dispatch::new(
                tracing_subscriber::registry()
                    .with(LevelFilter::DEBUG)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_target(false)
                            .with_writer(Mutex::new(file)),
                    ),
            )
        }
        None => Dispatch::new(
            tracing_subscriber::registry().with(tracing_subscriber::layer::Identity::new()),
        ),
    };

    if tracing::dispatcher::set_global_default(dispatch.clone()).is_ok() {
        return Ok(None);
    }
    Ok(Some(tracing::dispatcher::set_default(&dispatch)))
}

/// Give the terminal back to plain line-oriented output
pub(crate) fn suspend_terminal() -> io::Result<()> {
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    disable_raw_mode()
}

/// Take the terminal again after [`suspend_terminal`]
pub(crate) fn resume_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)
}
