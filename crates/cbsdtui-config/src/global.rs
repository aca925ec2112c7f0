//! Global cbsd-tui configuration
//!
//! Located at `~/.config/cbsd-tui/config.toml`

use crate::{ConfigError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global cbsd-tui configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub tools: ToolsConfig,
    pub cbsd: CbsdConfig,
    pub ui: UiConfig,
}

/// Paths of the external programs the console shells out to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// The cbsd orchestration binary
    pub cbsd: String,
    /// Privilege wrapper used when not running as root
    pub doas: String,
    /// Shell used for start scripts and the login console
    pub shell: String,
    /// Line-buffering wrapper for start scripts
    pub stdbuf: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            cbsd: "/usr/local/bin/cbsd".to_string(),
            doas: "/usr/local/bin/doas".to_string(),
            shell: "/bin/sh".to_string(),
            stdbuf: "/usr/bin/stdbuf".to_string(),
        }
    }
}

/// Where cbsd keeps its state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CbsdConfig {
    /// System user owning the cbsd working directory
    pub user: String,
    /// Explicit working directory; the home of `user` when unset
    pub workdir: Option<String>,
    /// Main database, relative to the working directory
    pub database: String,
    /// Per-container state directory, relative to the working directory
    pub jails_system: String,
    /// Log file the detached start script writes to
    pub start_log: String,
    /// File holding the node name, relative to the working directory
    pub nodename_file: String,
}

impl Default for CbsdConfig {
    fn default() -> Self {
        Self {
            user: "cbsd".to_string(),
            workdir: None,
            database: "var/db/local.sqlite".to_string(),
            jails_system: "jails-system".to_string(),
            start_log: "/var/log/jstart.log".to_string(),
            nodename_file: "nodename".to_string(),
        }
    }
}

impl CbsdConfig {
    /// The configured working directory with `~` and env vars expanded
    pub fn workdir_override(&self) -> Result<Option<PathBuf>> {
        self.workdir.as_deref().map(expand_path).transpose()
    }
}

/// Terminal UI settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Kind shown first: "jail", "bhyve" or "qemu"
    pub default_kind: String,
    /// Event loop tick in milliseconds
    pub tick_rate_ms: u64,
    /// How often the start log is polled for growth
    pub tail_interval_ms: u64,
    /// Cap on bytes copied from the start log into the output view
    pub max_tail_bytes: u64,
    /// Where logs go while the TUI owns the terminal
    pub log_file: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_kind: "jail".to_string(),
            tick_rate_ms: 250,
            tail_interval_ms: 300,
            max_tail_bytes: 1_000_000,
            log_file: None,
        }
    }
}

impl UiConfig {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn tail_interval(&self) -> Duration {
        Duration::from_millis(self.tail_interval_ms)
    }

    pub fn log_path(&self) -> Result<Option<PathBuf>> {
        self.log_file.as_deref().map(expand_path).transpose()
    }
}

/// Expand `~` and `$VAR` references in a configured path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    shellexpand::full(raw)
        .map(|s| PathBuf::from(s.into_owned()))
        .map_err(|e| ConfigError::Invalid(format!("cannot expand '{}': {}", raw, e)))
}

impl GlobalConfig {
    /// Load global configuration from the default path
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load global configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(
            "Loaded config from {:?}: cbsd={} user={}",
            path,
            config.tools.cbsd,
            config.cbsd.user
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.clone(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.clone(),
            source: e,
        })
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "cbsd-tui").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert_eq!(config.tools.cbsd, "/usr/local/bin/cbsd");
        assert_eq!(config.tools.doas, "/usr/local/bin/doas");
        assert_eq!(config.cbsd.user, "cbsd");
        assert_eq!(config.cbsd.start_log, "/var/log/jstart.log");
        assert_eq!(config.ui.max_tail_bytes, 1_000_000);
        assert_eq!(config.ui.tail_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[tools]
cbsd = "/opt/cbsd/bin/cbsd"

[cbsd]
workdir = "/usr/jails"

[ui]
default_kind = "bhyve"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tools.cbsd, "/opt/cbsd/bin/cbsd");
        // Unset keys fall back to defaults
        assert_eq!(config.tools.shell, "/bin/sh");
        assert_eq!(config.cbsd.workdir.as_deref(), Some("/usr/jails"));
        assert_eq!(config.cbsd.database, "var/db/local.sqlite");
        assert_eq!(config.ui.default_kind, "bhyve");
        assert_eq!(config.ui.tick_rate_ms, 250);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        let config = GlobalConfig::load_from(&path).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut config = GlobalConfig::default();
        config.cbsd.user = "jailer".to_string();
        config.ui.log_file = Some("/tmp/cbsd-tui.log".to_string());
        config.save_to(&path).unwrap();

        let loaded = GlobalConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[tools\ncbsd = ").unwrap();

        let err = GlobalConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }

    #[test]
    fn test_expand_path_plain() {
        let path = expand_path("/var/log/jstart.log").unwrap();
        assert_eq!(path, PathBuf::from("/var/log/jstart.log"));
    }

    #[test]
    fn test_workdir_override_unset() {
        let config = CbsdConfig::default();
        assert_eq!(config.workdir_override().unwrap(), None);
    }
}
