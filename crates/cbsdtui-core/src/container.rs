//! The container abstraction shared by jails and virtual machines

use crate::{
    autostart_label, CommandTable, ContainerKind, ContainerRow, KindFields, MenuEntry, Signals,
    Status, VncConsole,
};
use serde::Serialize;
use std::fmt::Write;

/// A jail or VM as displayed in the list
///
/// Common fields live here; the few kind-specific ones sit in
/// [`KindFields`] and behavior that differs per kind comes from the tables
/// on [`ContainerKind`]. Clones share their [`Signals`].
#[derive(Debug, Clone)]
pub struct Container {
    kind: ContainerKind,
    name: String,
    ip4_addr: String,
    status: Status,
    autostart: bool,
    fields: KindFields,
    /// Full database row, loaded on demand for the view
    params: Vec<(String, String)>,
    signals: Signals,
}

/// Color class of a table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTone {
    Running,
    StoppedAutostart,
    Stopped,
    Other,
}

impl Container {
    /// An empty container of `kind`
    pub fn new(kind: ContainerKind, name: impl Into<String>) -> Self {
        let fields = match kind {
            ContainerKind::Jail => KindFields::Jail {
                version: String::new(),
            },
            ContainerKind::Bhyve | ContainerKind::Qemu => KindFields::Vm {
                os_type: String::new(),
                vnc: String::new(),
            },
        };
        Self {
            kind,
            name: name.into(),
            ip4_addr: String::new(),
            status: Status::Off,
            autostart: false,
            fields,
            params: Vec::new(),
            signals: Signals::default(),
        }
    }

    pub fn from_row(row: ContainerRow) -> Self {
        Self {
            kind: row.kind,
            name: row.name,
            ip4_addr: row.ip4_addr,
            status: row.status,
            autostart: row.autostart,
            fields: row.fields,
            params: Vec::new(),
            signals: Signals::default(),
        }
    }

    pub fn to_row(&self) -> ContainerRow {
        ContainerRow {
            kind: self.kind,
            name: self.name.clone(),
            ip4_addr: self.ip4_addr.clone(),
            status: self.status,
            autostart: self.autostart,
            fields: self.fields.clone(),
        }
    }

    /// Take status, autostart and kind fields from a fresh row.
    ///
    /// A VM row carries no address, so the current one is kept.
    pub fn apply_row(&mut self, row: ContainerRow) {
        if !row.ip4_addr.is_empty() || !self.kind.is_vm() {
            self.ip4_addr = row.ip4_addr;
        }
        self.status = row.status;
        self.autostart = row.autostart;
        self.fields = row.fields;
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn commands(&self) -> &'static CommandTable {
        self.kind.commands()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ip4_addr(&self) -> &str {
        &self.ip4_addr
    }

    pub fn set_ip4_addr(&mut self, addr: impl Into<String>) {
        self.ip4_addr = addr.into();
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn is_runnable(&self) -> bool {
        self.status.is_runnable()
    }

    pub fn autostart(&self) -> bool {
        self.autostart
    }

    pub fn set_autostart(&mut self, autostart: bool) {
        self.autostart = autostart;
    }

    pub fn fields(&self) -> &KindFields {
        &self.fields
    }

    /// Release of a jail
    pub fn version(&self) -> Option<&str> {
        match &self.fields {
            KindFields::Jail { version } => Some(version),
            KindFields::Vm { .. } => None,
        }
    }

    pub fn os_type(&self) -> Option<&str> {
        match &self.fields {
            KindFields::Vm { os_type, .. } => Some(os_type),
            KindFields::Jail { .. } => None,
        }
    }

    /// VNC console as stored, `host:port`
    pub fn vnc(&self) -> Option<&str> {
        match &self.fields {
            KindFields::Vm { vnc, .. } => Some(vnc),
            KindFields::Jail { .. } => None,
        }
    }

    /// The kind-specific detail field: version for jails, VNC console for VMs
    pub fn detail(&self) -> &str {
        match &self.fields {
            KindFields::Jail { version } => version,
            KindFields::Vm { vnc, .. } => vnc,
        }
    }

    /// Returns false when this kind has no version
    pub fn set_version(&mut self, value: impl Into<String>) -> bool {
        match &mut self.fields {
            KindFields::Jail { version } => {
                *version = value.into();
                true
            }
            KindFields::Vm { .. } => false,
        }
    }

    /// Returns false when this kind has no VNC console
    pub fn set_vnc(&mut self, console: &VncConsole) -> bool {
        match &mut self.fields {
            KindFields::Vm { vnc, .. } => {
                *vnc = console.to_string();
                true
            }
            KindFields::Jail { .. } => false,
        }
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_params(&mut self, params: Vec<(String, String)>) {
        self.params = params;
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    /// Replace this container's channels with `signals`.
    ///
    /// Each container starts with channels of its own. Clones of a
    /// [`Signals`] share one subscriber list, so a list owner may hand the
    /// same clone to every container it holds and subscribe once; the
    /// updated container's name travels in the payload. The TUI does this
    /// for its whole table.
    pub fn set_signals(&mut self, signals: Signals) {
        self.signals = signals;
    }

    pub fn headers(&self) -> &'static [&'static str] {
        self.kind.headers()
    }

    pub fn actions_menu(&self) -> Vec<MenuEntry> {
        self.kind.actions_menu(self.status)
    }

    /// Table cells in header order
    pub fn row_cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.name.clone(),
            self.ip4_addr.clone(),
            self.status.label(),
            autostart_label(self.autostart).to_string(),
        ];
        match &self.fields {
            KindFields::Jail { version } => cells.push(version.clone()),
            KindFields::Vm { os_type, vnc } => {
                cells.push(os_type.clone());
                cells.push(vnc.clone());
            }
        }
        cells
    }

    pub fn row_tone(&self) -> RowTone {
        match self.status {
            Status::On => RowTone::Running,
            Status::Off if self.autostart => RowTone::StoppedAutostart,
            Status::Off => RowTone::Stopped,
            _ => RowTone::Other,
        }
    }

    /// Human-readable details followed by every loaded parameter
    pub fn view_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Name: {}", self.name);
        let _ = writeln!(out, "IP address: {}", self.ip4_addr);
        let _ = writeln!(out, "Status: {}", self.status);
        let _ = writeln!(out, "Auto Start: {}", autostart_label(self.autostart));
        match &self.fields {
            KindFields::Jail { version } => {
                let _ = writeln!(out, "Version: {}", version);
            }
            KindFields::Vm { os_type, vnc } => {
                let _ = writeln!(out, "OS Type: {}", os_type);
                let _ = writeln!(out, "VNC Console: {}", vnc);
            }
        }
        out.push('\n');
        for (key, value) in &self.params {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        out
    }

    pub fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            kind: self.kind.to_string(),
            name: self.name.clone(),
            ip4_addr: self.ip4_addr.clone(),
            status: self.status.label(),
            autostart: self.autostart,
            version: self.version().map(str::to_string),
            os_type: self.os_type().map(str::to_string),
            vnc_console: self.vnc().map(str::to_string),
        }
    }
}

/// Serializable view of a container for `list --json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub kind: String,
    pub name: String,
    pub ip4_addr: String,
    pub status: String,
    pub autostart: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vnc_console: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jail() -> Container {
        Container::from_row(ContainerRow {
            kind: ContainerKind::Jail,
            name: "web".into(),
            ip4_addr: "10.0.0.5".into(),
            status: Status::On,
            autostart: true,
            fields: KindFields::Jail {
                version: "14.1".into(),
            },
        })
    }

    fn vm() -> Container {
        Container::from_row(ContainerRow {
            kind: ContainerKind::Bhyve,
            name: "vm1".into(),
            ip4_addr: "10.0.1.2".into(),
            status: Status::Off,
            autostart: false,
            fields: KindFields::Vm {
                os_type: "freebsd".into(),
                vnc: "127.0.0.1:5900".into(),
            },
        })
    }

    #[test]
    fn test_row_cells_follow_headers() {
        let j = jail();
        assert_eq!(j.row_cells(), ["web", "10.0.0.5", "On", "On", "14.1"]);
        assert_eq!(j.row_cells().len(), j.headers().len());

        let v = vm();
        assert_eq!(
            v.row_cells(),
            ["vm1", "10.0.1.2", "Off", "Off", "freebsd", "127.0.0.1:5900"]
        );
        assert_eq!(v.row_cells().len(), v.headers().len());
    }

    #[test]
    fn test_row_tone() {
        let mut c = jail();
        assert_eq!(c.row_tone(), RowTone::Running);
        c.set_status(Status::Off);
        assert_eq!(c.row_tone(), RowTone::StoppedAutostart);
        c.set_autostart(false);
        assert_eq!(c.row_tone(), RowTone::Stopped);
        c.set_status(Status::Slave);
        assert_eq!(c.row_tone(), RowTone::Other);
    }

    #[test]
    fn test_view_text() {
        let mut c = jail();
        c.set_params(vec![
            ("jname".into(), "web".into()),
            ("path".into(), "/usr/jails/web".into()),
        ]);

        assert_eq!(
            c.view_text(),
            "Name: web\nIP address: 10.0.0.5\nStatus: On\nAuto Start: On\nVersion: 14.1\n\n\
             jname: web\npath: /usr/jails/web\n"
        );
        assert_eq!(c.param("path"), Some("/usr/jails/web"));
    }

    #[test]
    fn test_vm_view_text_lists_console() {
        let text = vm().view_text();
        assert!(text.contains("OS Type: freebsd\n"));
        assert!(text.contains("VNC Console: 127.0.0.1:5900\n"));
        assert!(!text.contains("Version"));
    }

    #[test]
    fn test_kind_specific_setters() {
        let mut j = jail();
        assert!(j.set_version("15.0"));
        assert!(!j.set_vnc(&VncConsole::new("h", 1)));
        assert_eq!(j.detail(), "15.0");

        let mut v = vm();
        assert!(!v.set_version("x"));
        assert!(v.set_vnc(&VncConsole::new("0.0.0.0", 5901)));
        assert_eq!(v.vnc(), Some("0.0.0.0:5901"));
    }

    #[test]
    fn test_apply_row_keeps_vm_address() {
        let mut v = vm();
        let mut row = v.to_row();
        row.ip4_addr.clear();
        row.status = Status::On;

        v.apply_row(row);

        assert_eq!(v.ip4_addr(), "10.0.1.2");
        assert!(v.is_running());
    }

    #[test]
    fn test_signals_own_unless_shared() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut web = jail();
        let mut vm1 = vm();
        let sink = Arc::clone(&seen);
        web.signals()
            .updated
            .connect(move |name: &str| sink.lock().unwrap().push(name.to_string()));

        vm1.signals().updated.emit(vm1.name());
        assert!(seen.lock().unwrap().is_empty());

        let shared = web.signals().clone();
        vm1.set_signals(shared.clone());
        web.set_signals(shared);
        vm1.signals().updated.emit(vm1.name());
        web.signals().updated.emit(web.name());
        assert_eq!(*seen.lock().unwrap(), ["vm1", "web"]);
    }

    #[test]
    fn test_summary_json() {
        let json = serde_json::to_value(jail().summary()).unwrap();
        assert_eq!(json["kind"], "jail");
        assert_eq!(json["status"], "On");
        assert_eq!(json["version"], "14.1");
        assert!(json.get("vnc_console").is_none());
    }
}
