//! The persistent login console as seen by containers

/// A shell session containers log into
///
/// At most one container is logged in at a time; its name is the active
/// console.
pub trait Console: Send + Sync {
    /// Name of the container currently logged in
    fn active(&self) -> Option<String>;

    fn set_active(&self, name: Option<String>);

    /// Type `line` followed by Enter
    fn send(&self, line: &str);

    /// Send Ctrl-C
    fn interrupt(&self);
}

/// Result of pressing Enter on a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Logged in; the terminal should be handed to the console
    Attached,
    /// The container was the active console and has been logged out
    LoggedOut,
    /// Only running containers can be logged into
    NotRunning,
}

/// Console used where no terminal is available
#[derive(Debug, Default)]
pub struct NoConsole;

impl Console for NoConsole {
    fn active(&self) -> Option<String> {
        None
    }

    fn set_active(&self, _name: Option<String>) {}

    fn send(&self, line: &str) {
        tracing::debug!("No console attached, dropping {:?}", line);
    }

    fn interrupt(&self) {}
}
