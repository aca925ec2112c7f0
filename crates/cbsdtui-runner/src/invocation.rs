//! Argument vectors for the external orchestration tool
//!
//! Every call has the shape `[elevation] <tool> <subcommand> [key=value ...]`
//! and runs with `NOCOLOR=1` added to the inherited environment.

use cbsdtui_config::ToolsConfig;
use std::fmt;
use tokio::process::Command;

/// Environment variable the tool checks before emitting ANSI colors
pub const NOCOLOR_ENV: (&str, &str) = ("NOCOLOR", "1");

/// A fully built external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    subcommand: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            subcommand: None,
        }
    }

    /// Append a bare token
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a `key=value` token
    pub fn kv(self, key: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("{}={}", key, value))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The tool subcommand (`jstart`, `bget`, ...) if this targets the tool
    pub fn subcommand(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Shell-quoted command line, suitable for scripts and the login console
    pub fn command_line(&self) -> String {
        shell_words::join(self.argv())
    }

    /// Build a process command with the tool environment applied
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.env(NOCOLOR_ENV.0, NOCOLOR_ENV.1);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Builds invocations of the cbsd tool, with elevation when needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CbsdCli {
    cbsd: String,
    /// Privilege wrapper prepended when the current user is not root
    elevation: Option<String>,
}

impl CbsdCli {
    pub fn new(cbsd: impl Into<String>, elevation: Option<String>) -> Self {
        Self {
            cbsd: cbsd.into(),
            elevation,
        }
    }

    /// Decide elevation from the effective uid of this process
    pub fn detect(tools: &ToolsConfig) -> Self {
        let privileged = nix::unistd::Uid::effective().is_root();
        tracing::debug!("Running as root: {}", privileged);
        Self::with_privilege(tools, privileged)
    }

    pub fn with_privilege(tools: &ToolsConfig, privileged: bool) -> Self {
        let elevation = if privileged {
            None
        } else {
            Some(tools.doas.clone())
        };
        Self::new(tools.cbsd.clone(), elevation)
    }

    pub fn is_elevated(&self) -> bool {
        self.elevation.is_some()
    }

    /// Start an invocation of `subcommand`
    pub fn subcommand(&self, subcommand: &str) -> Invocation {
        let base = match &self.elevation {
            Some(wrapper) => Invocation::new(wrapper.clone()).arg(self.cbsd.clone()),
            None => Invocation::new(self.cbsd.clone()),
        };
        let mut inv = base.arg(subcommand);
        inv.subcommand = Some(subcommand.to_string());
        inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> ToolsConfig {
        ToolsConfig::default()
    }

    #[test]
    fn test_root_invokes_tool_directly() {
        let cli = CbsdCli::with_privilege(&tools(), true);
        let inv = cli.subcommand("jstop").kv("inter", 1).kv("jname", "web");

        assert!(!cli.is_elevated());
        assert_eq!(inv.program(), "/usr/local/bin/cbsd");
        assert_eq!(inv.args(), ["jstop", "inter=1", "jname=web"]);
        assert_eq!(inv.subcommand(), Some("jstop"));
    }

    #[test]
    fn test_unprivileged_prepends_wrapper() {
        let cli = CbsdCli::with_privilege(&tools(), false);
        let inv = cli.subcommand("jlogin").kv("jname", "web");

        assert!(cli.is_elevated());
        assert_eq!(inv.program(), "/usr/local/bin/doas");
        assert_eq!(
            inv.argv(),
            ["/usr/local/bin/doas", "/usr/local/bin/cbsd", "jlogin", "jname=web"]
        );
        assert_eq!(inv.subcommand(), Some("jlogin"));
    }

    #[test]
    fn test_bare_tokens_keep_order() {
        let cli = CbsdCli::with_privilege(&tools(), true);
        let inv = cli
            .subcommand("bget")
            .kv("mode", "quiet")
            .arg("ip4_addr")
            .kv("jname", "vm1");
        assert_eq!(inv.args(), ["bget", "mode=quiet", "ip4_addr", "jname=vm1"]);
    }

    #[test]
    fn test_command_line_quotes_spaces() {
        let inv = Invocation::new("/bin/sh").arg("/tmp/my script");
        assert_eq!(inv.command_line(), "/bin/sh '/tmp/my script'");
        assert_eq!(inv.to_string(), inv.command_line());
        assert_eq!(inv.subcommand(), None);
    }
}
