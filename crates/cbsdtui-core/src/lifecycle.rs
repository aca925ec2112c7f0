//! Status polling and lifecycle transitions
//!
//! ```text
//! Off --start script--> On
//! On  --stop command--> Off
//! Off|On --destroy--> removed (list refresh)
//! Slave|Unknown: not actionable
//! ```
//!
//! Commands stream into an [`OutputSink`]. Their failures are logged and
//! visible in the output only; the status re-read that follows every
//! start/stop shows whether the transition happened.

use crate::kind::{ARG_IP4, ARG_NAME, ARG_SNAPSHOT};
use crate::{
    parse_snapshots, Console, Container, Host, KindFields, LoginOutcome, RefreshReason, Result,
    Snapshot, Status, VncConsole,
};
use cbsdtui_runner::{Invocation, OutputSink};
use std::io::Write;

/// Snapshot name cbsd replaces with the current time
pub const DEFAULT_SNAPSHOT_NAME: &str = "gettimeofday";
/// Address cbsd assigns automatically
pub const DHCP: &str = "DHCP";

/// Values entered in the edit dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    pub autostart: bool,
    /// Version of a jail or VNC console of a VM; empty keeps the current one
    pub detail: String,
    /// Empty keeps the current address
    pub ip4_addr: String,
}

/// Values entered in the clone dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub new_name: String,
    pub hostname: String,
    pub ip4_addr: String,
}

impl CloneRequest {
    /// Dialog defaults for cloning `source`
    pub fn defaults_for(source: &Container) -> Self {
        Self {
            new_name: format!("{}clone", source.name()),
            hostname: source.name().to_string(),
            ip4_addr: DHCP.to_string(),
        }
    }
}

impl Container {
    fn tool(&self, host: &Host, subcommand: &str) -> Invocation {
        host.cli().subcommand(subcommand)
    }

    /// `<start> inter=1 jname=N`
    pub fn start_command(&self, host: &Host) -> Invocation {
        self.tool(host, self.commands().start)
            .kv("inter", 1)
            .kv(ARG_NAME, self.name())
    }

    /// `<login> jname=N`
    pub fn login_command(&self, host: &Host) -> Invocation {
        self.tool(host, self.commands().login).kv(ARG_NAME, self.name())
    }

    /// Ask the tool whether this container is running.
    ///
    /// `None` when the poll fails or its output is not a number; the cached
    /// status is left alone either way.
    pub async fn current_status(&self, host: &Host) -> Option<Status> {
        let inv = self
            .tool(host, self.commands().status)
            .kv("invert", "true")
            .kv(ARG_NAME, self.name());
        match host.runner().output(&inv).await {
            Ok(out) => Status::from_poll_output(&out),
            Err(e) => {
                tracing::debug!("Status poll for {} failed: {}", self.name(), e);
                None
            }
        }
    }

    /// Overwrite the cached status with a live poll, but only when the
    /// cached value is Off or On. Returns true if the status was replaced.
    pub async fn reconcile_status(&mut self, host: &Host) -> bool {
        if !self.status().is_trusted() {
            return false;
        }
        match self.current_status(host).await {
            Some(status) => {
                if status != self.status() {
                    tracing::debug!("{}: cached {} but live {}", self.name(), self.status(), status);
                }
                self.set_status(status);
                true
            }
            None => false,
        }
    }

    /// Address kept by the tool's own parameter store, for VMs
    pub async fn fetch_ip4(&self, host: &Host) -> Option<String> {
        let get = self.commands().get_param?;
        let inv = self
            .tool(host, get)
            .kv("mode", "quiet")
            .arg(ARG_IP4)
            .kv(ARG_NAME, self.name());
        match host.runner().output(&inv).await {
            Ok(out) => Some(out.trim().to_string()),
            Err(e) => {
                tracing::warn!("Cannot get address of {}: {}", self.name(), e);
                None
            }
        }
    }

    /// Fill in what the database does not hold: VM addresses and the live status
    pub(crate) async fn refresh_live(&mut self, host: &Host) {
        if self.kind().is_vm() {
            if let Some(ip) = self.fetch_ip4(host).await {
                self.set_ip4_addr(ip);
            }
        }
        self.reconcile_status(host).await;
    }

    /// Re-read this container from the database. Returns false when it is gone.
    pub async fn reload(&mut self, host: &Host) -> Result<bool> {
        let Some(row) = host.store().get(self.kind(), self.name())? else {
            return Ok(false);
        };
        self.apply_row(row);
        self.refresh_live(host).await;
        Ok(true)
    }

    /// Load the full database row for the view
    pub fn load_params(&mut self, host: &Host) -> Result<()> {
        let params = host.store().full_row(self.kind(), self.name())?;
        self.set_params(params);
        Ok(())
    }

    /// Snapshots of this container, empty when listing fails
    pub async fn snapshots(&self, host: &Host) -> Vec<Snapshot> {
        let inv = self
            .tool(host, self.commands().snapshot)
            .kv("mode", "list")
            .kv("header", 0)
            .kv("display", "snapname,creation")
            .kv(ARG_NAME, self.name());
        match host.runner().output(&inv).await {
            Ok(out) => parse_snapshots(&out),
            Err(e) => {
                tracing::warn!("Cannot list snapshots of {}: {}", self.name(), e);
                Vec::new()
            }
        }
    }

    pub async fn create_snapshot(&self, host: &Host, name: &str, sink: &OutputSink) {
        let name = match name.trim() {
            "" => DEFAULT_SNAPSHOT_NAME,
            n => n,
        };
        sink.append("Creating snapshot...");
        let inv = self
            .tool(host, self.commands().snapshot)
            .kv("mode", "create")
            .kv(ARG_SNAPSHOT, name)
            .kv(ARG_NAME, self.name());
        host.runner().run_attached(&inv, sink).await;
    }

    pub async fn destroy_snapshot(&self, host: &Host, snapshot: &str, sink: &OutputSink) {
        sink.append("Destroying snapshot...");
        let inv = self
            .tool(host, self.commands().snapshot)
            .kv("mode", "destroy")
            .kv(ARG_NAME, self.name())
            .kv(ARG_SNAPSHOT, snapshot);
        host.runner().run_attached(&inv, sink).await;
    }

    /// Clone into a new container and ask for a list refresh
    pub async fn clone_to(&self, host: &Host, request: &CloneRequest, sink: &OutputSink) {
        sink.append(format!("Cloning {}...", self.kind().noun()));
        let inv = self
            .tool(host, self.commands().clone)
            .kv("old", self.name())
            .kv("new", &request.new_name)
            .kv("host_hostname", &request.hostname)
            .kv(ARG_IP4, &request.ip4_addr)
            .kv("checkstate", 0);
        host.runner().run_attached(&inv, sink).await;
        self.signals().refresh.emit(&RefreshReason::Cloned {
            from: self.name().to_string(),
            to: request.new_name.clone(),
        });
    }

    pub async fn export(&self, host: &Host, sink: &OutputSink) {
        sink.append(format!("Exporting {}...", self.kind().noun()));
        let inv = self
            .tool(host, self.commands().export)
            .kv(ARG_NAME, self.name());
        host.runner().run_attached(&inv, sink).await;
    }

    /// Destroy the container and ask for a list refresh
    pub async fn destroy(&self, host: &Host, sink: &OutputSink) {
        sink.append(format!("Destroying {} {}...", self.kind().noun(), self.name()));
        let inv = self
            .tool(host, self.commands().destroy)
            .kv(ARG_NAME, self.name());
        host.runner().run_attached(&inv, sink).await;
        self.signals()
            .refresh
            .emit(&RefreshReason::Destroyed(self.name().to_string()));
    }

    /// Apply the changed fields of `request` with a single database write.
    ///
    /// Returns false when nothing differed; no write happens and no event
    /// fires. A changed address of a VM is also pushed to the tool's own
    /// parameter store after the write.
    pub async fn edit(&mut self, host: &Host, request: EditRequest) -> Result<bool> {
        let detail = request.detail.trim();
        let ip = request.ip4_addr.trim();

        let vnc = match self.fields() {
            KindFields::Vm { vnc, .. } if !detail.is_empty() && detail != vnc.as_str() => {
                Some(VncConsole::parse(detail)?)
            }
            _ => None,
        };

        let mut changed = false;
        if request.autostart != self.autostart() {
            self.set_autostart(request.autostart);
            changed = true;
        }
        if let Some(console) = &vnc {
            changed |= self.set_vnc(console);
        }
        if !detail.is_empty() && self.version().is_some_and(|v| v != detail) {
            changed |= self.set_version(detail);
        }
        let ip_changed = !ip.is_empty() && ip != self.ip4_addr();
        if ip_changed {
            self.set_ip4_addr(ip);
            changed = true;
        }

        if !changed {
            tracing::debug!("Edit of {} changed nothing", self.name());
            return Ok(false);
        }

        host.store().put(&self.to_row())?;

        let pushed = match (ip_changed, self.commands().set_param) {
            (true, Some(set)) => {
                let inv = self
                    .tool(host, set)
                    .kv(ARG_IP4, self.ip4_addr())
                    .kv(ARG_NAME, self.name());
                host.runner().output(&inv).await.map(|_| ())
            }
            _ => Ok(()),
        };

        tracing::info!("Updated {} {}", self.kind().noun(), self.name());
        self.signals().updated.emit(self.name());
        pushed?;
        Ok(true)
    }

    /// Stop a running container or start a stopped one, then re-read it.
    ///
    /// Containers in any other state are only re-read.
    pub async fn start_stop(&mut self, host: &Host, console: &dyn Console, sink: &OutputSink) {
        let noun = self.kind().noun();
        if self.is_running() {
            if console.active().as_deref() == Some(self.name()) {
                console.send("exit");
                console.set_active(None);
            }
            sink.append(format!("Stopping {}...", noun));
            let inv = self
                .tool(host, self.commands().stop)
                .kv("inter", 1)
                .kv(ARG_NAME, self.name());
            host.runner().run_attached(&inv, sink).await;
        } else if self.is_runnable() {
            sink.append(format!("Starting {}...", noun));
            if let Err(e) = self.run_start_script(host, sink).await {
                tracing::warn!("Cannot create start script for {}: {}", self.name(), e);
                sink.append(format!("Cannot create start script: {}", e));
                return;
            }
        } else {
            tracing::debug!("{} is {}, not starting or stopping", self.name(), self.status());
        }

        match self.reload(host).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("{} vanished from the database", self.name()),
            Err(e) => tracing::warn!("Cannot reload {}: {}", self.name(), e),
        }
        self.signals().updated.emit(self.name());
    }

    /// The start command survives the terminal, so it runs from a script
    /// redirected to the start log while the log is tailed.
    async fn run_start_script(&self, host: &Host, sink: &OutputSink) -> std::io::Result<()> {
        let tools = host.tools();
        let mut script = tempfile::Builder::new().prefix("jail_start_").tempfile()?;
        writeln!(script, "#!{}", tools.shell)?;
        writeln!(
            script,
            "{} -o L {} > {} 2>&1",
            tools.stdbuf,
            self.start_command(host).command_line(),
            host.start_log().display()
        )?;
        script.flush()?;

        let inv = Invocation::new(tools.shell.clone()).arg(script.path().to_string_lossy());
        host.runner().run_tailing(&inv, host.start_log(), sink).await;
        // Dropping the handle removes the script
        script.close()
    }

    /// Log into this container on `console`, or out if it is already there
    pub fn login(&self, host: &Host, console: &dyn Console) -> LoginOutcome {
        if console.active().as_deref() == Some(self.name()) {
            console.interrupt();
            console.send("exit");
            console.set_active(None);
            return LoginOutcome::LoggedOut;
        }
        if !self.is_running() {
            return LoginOutcome::NotRunning;
        }
        if let Some(other) = console.active() {
            tracing::debug!("Leaving console of {}", other);
            console.send("exit");
        }
        console.send(&self.login_command(host).command_line());
        console.set_active(Some(self.name().to_string()));
        LoginOutcome::Attached
    }
}
