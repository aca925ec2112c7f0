//! The cbsd installation being managed

use crate::{Container, ContainerKind, ContainerStore, CoreError, Result, SqliteStore};
use cbsdtui_config::{GlobalConfig, ToolsConfig};
use cbsdtui_runner::{CbsdCli, CliRunner, CommandRunner, TailConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything containers need to reach the tool and the database
#[derive(Clone)]
pub struct Host {
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn ContainerStore>,
    cli: CbsdCli,
    tools: ToolsConfig,
    start_log: PathBuf,
    nodename: Option<PathBuf>,
}

impl Host {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn ContainerStore>,
        cli: CbsdCli,
        tools: ToolsConfig,
        start_log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            store,
            cli,
            tools,
            start_log: start_log.into(),
            nodename: None,
        }
    }

    /// Discover the local installation from configuration
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        let workdir = resolve_workdir(config)?;
        tracing::debug!("cbsd working directory: {:?}", workdir);

        let store = SqliteStore::new(
            workdir.join(&config.cbsd.database),
            workdir.join(&config.cbsd.jails_system),
        );
        let runner = CliRunner::new(TailConfig::from(&config.ui));
        let start_log = cbsdtui_config::expand_path(&config.cbsd.start_log)?;

        let mut host = Self::new(
            Arc::new(runner),
            Arc::new(store),
            CbsdCli::detect(&config.tools),
            config.tools.clone(),
            start_log,
        );
        host.nodename = Some(workdir.join(&config.cbsd.nodename_file));
        Ok(host)
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn store(&self) -> &dyn ContainerStore {
        self.store.as_ref()
    }

    pub fn cli(&self) -> &CbsdCli {
        &self.cli
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    pub fn start_log(&self) -> &Path {
        &self.start_log
    }

    /// Node name from the working directory, if readable
    pub fn node_name(&self) -> Option<String> {
        let path = self.nodename.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(name) => Some(name.trim().to_string()).filter(|n| !n.is_empty()),
            Err(e) => {
                tracing::debug!("Cannot read node name from {:?}: {}", path, e);
                None
            }
        }
    }

    /// All containers of `kind`, reconciled with the live status
    pub async fn load_containers(&self, kind: ContainerKind) -> Result<Vec<Container>> {
        let rows = self.store.list(kind)?;
        tracing::debug!("Loaded {} {} rows", rows.len(), kind);

        let mut containers = Vec::with_capacity(rows.len());
        for row in rows {
            let mut container = Container::from_row(row);
            container.refresh_live(self).await;
            containers.push(container);
        }
        Ok(containers)
    }

    /// One container by name
    pub async fn find(&self, kind: ContainerKind, name: &str) -> Result<Option<Container>> {
        let Some(row) = self.store.get(kind, name)? else {
            return Ok(None);
        };
        let mut container = Container::from_row(row);
        container.refresh_live(self).await;
        Ok(Some(container))
    }

    /// Like [`Host::find`] but a missing container is an error
    pub async fn require(&self, kind: ContainerKind, name: &str) -> Result<Container> {
        self.find(kind, name).await?.ok_or_else(|| CoreError::NotFound {
            kind: kind.noun(),
            name: name.to_string(),
        })
    }
}

fn resolve_workdir(config: &GlobalConfig) -> Result<PathBuf> {
    if let Some(dir) = config.cbsd.workdir_override()? {
        return Ok(dir);
    }
    let user = &config.cbsd.user;
    match nix::unistd::User::from_name(user) {
        Ok(Some(entry)) => Ok(entry.dir),
        Ok(None) => Err(CoreError::UnknownUser(user.clone())),
        Err(e) => {
            tracing::warn!("Looking up user {} failed: {}", user, e);
            Err(CoreError::UnknownUser(user.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_uses_workdir_override() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("nodename"), "node1.example.org\n").unwrap();

        let mut config = GlobalConfig::default();
        config.cbsd.workdir = Some(dir.path().to_string_lossy().into_owned());

        let host = Host::from_config(&config).unwrap();
        assert_eq!(host.node_name().as_deref(), Some("node1.example.org"));
        assert_eq!(host.start_log(), Path::new("/var/log/jstart.log"));
    }

    #[test]
    fn test_unknown_cbsd_user() {
        let mut config = GlobalConfig::default();
        config.cbsd.user = "no-such-user-cbsdtui".into();

        assert!(matches!(
            Host::from_config(&config),
            Err(CoreError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_missing_nodename_file() {
        let dir = TempDir::new().unwrap();
        let mut config = GlobalConfig::default();
        config.cbsd.workdir = Some(dir.path().to_string_lossy().into_owned());

        let host = Host::from_config(&config).unwrap();
        assert_eq!(host.node_name(), None);
    }
}
