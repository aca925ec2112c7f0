//! Per-kind tables: tool subcommands, column headers and labels

use crate::CoreError;
use std::fmt;
use std::str::FromStr;

/// Which family of workload a container belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Jail,
    Bhyve,
    Qemu,
}

/// cbsd subcommands used for one kind
#[derive(Debug)]
pub struct CommandTable {
    pub login: &'static str,
    pub start: &'static str,
    pub stop: &'static str,
    pub snapshot: &'static str,
    pub clone: &'static str,
    pub export: &'static str,
    pub destroy: &'static str,
    pub status: &'static str,
    /// Parameter query; jails keep their address in the main database
    pub get_param: Option<&'static str>,
    pub set_param: Option<&'static str>,
}

static JAIL_COMMANDS: CommandTable = CommandTable {
    login: "jlogin",
    start: "jstart",
    stop: "jstop",
    snapshot: "jsnapshot",
    clone: "jclone",
    export: "jexport",
    destroy: "jdestroy",
    status: "jstatus",
    get_param: None,
    set_param: None,
};

static BHYVE_COMMANDS: CommandTable = CommandTable {
    login: "blogin",
    start: "bstart",
    stop: "bstop",
    snapshot: "jsnapshot",
    clone: "bclone",
    export: "bexport",
    destroy: "bdestroy",
    status: "jstatus",
    get_param: Some("bget"),
    set_param: Some("bset"),
};

static QEMU_COMMANDS: CommandTable = CommandTable {
    login: "qlogin",
    start: "qstart",
    stop: "qstop",
    snapshot: "jsnapshot",
    clone: "qclone",
    export: "qexport",
    destroy: "qdestroy",
    status: "jstatus",
    get_param: Some("qget"),
    set_param: Some("qset"),
};

const JAIL_HEADERS: &[&str] = &["NAME", "IP4_ADDRESS", "STATUS", "AUTOSTART", "VERSION"];
const VM_HEADERS: &[&str] = &[
    "NAME",
    "IP4_ADDRESS",
    "STATUS",
    "AUTOSTART",
    "OS_TYPE",
    "VNC_CONSOLE",
];

// Argument names understood by the tool
pub const ARG_NAME: &str = "jname";
pub const ARG_SNAPSHOT: &str = "snapname";
pub const ARG_IP4: &str = "ip4_addr";

impl ContainerKind {
    pub const ALL: [ContainerKind; 3] =
        [ContainerKind::Jail, ContainerKind::Bhyve, ContainerKind::Qemu];

    pub fn commands(self) -> &'static CommandTable {
        match self {
            ContainerKind::Jail => &JAIL_COMMANDS,
            ContainerKind::Bhyve => &BHYVE_COMMANDS,
            ContainerKind::Qemu => &QEMU_COMMANDS,
        }
    }

    /// Value of the `emulator` column for this kind
    pub fn emulator(self) -> &'static str {
        match self {
            ContainerKind::Jail => "jail",
            ContainerKind::Bhyve => "bhyve",
            ContainerKind::Qemu => "qemu",
        }
    }

    /// Word used in progress headers and dialog titles
    pub fn noun(self) -> &'static str {
        match self {
            ContainerKind::Jail => "jail",
            ContainerKind::Bhyve | ContainerKind::Qemu => "VM",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ContainerKind::Jail => "Jails",
            ContainerKind::Bhyve => "Bhyve VMs",
            ContainerKind::Qemu => "QEMU VMs",
        }
    }

    pub fn headers(self) -> &'static [&'static str] {
        match self {
            ContainerKind::Jail => JAIL_HEADERS,
            ContainerKind::Bhyve | ContainerKind::Qemu => VM_HEADERS,
        }
    }

    pub fn destroy_label(self) -> &'static str {
        match self {
            ContainerKind::Jail => "Destroy Jail",
            ContainerKind::Bhyve => "Destroy",
            ContainerKind::Qemu => "Destroy VM",
        }
    }

    pub fn is_vm(self) -> bool {
        self != ContainerKind::Jail
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.emulator())
    }
}

impl FromStr for ContainerKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jail" | "jails" => Ok(ContainerKind::Jail),
            "bhyve" => Ok(ContainerKind::Bhyve),
            "qemu" => Ok(ContainerKind::Qemu),
            other => Err(CoreError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tables_differ_per_kind() {
        assert_eq!(ContainerKind::Jail.commands().start, "jstart");
        assert_eq!(ContainerKind::Bhyve.commands().stop, "bstop");
        assert_eq!(ContainerKind::Qemu.commands().login, "qlogin");
        for kind in ContainerKind::ALL {
            assert_eq!(kind.commands().snapshot, "jsnapshot");
            assert_eq!(kind.commands().status, "jstatus");
        }
        assert!(ContainerKind::Jail.commands().set_param.is_none());
        assert_eq!(ContainerKind::Qemu.commands().set_param, Some("qset"));
    }

    #[test]
    fn test_headers() {
        assert_eq!(ContainerKind::Jail.headers().last(), Some(&"VERSION"));
        assert_eq!(ContainerKind::Bhyve.headers().len(), 6);
        assert_eq!(ContainerKind::Qemu.headers()[5], "VNC_CONSOLE");
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("jail".parse::<ContainerKind>().unwrap(), ContainerKind::Jail);
        assert_eq!("QEMU".parse::<ContainerKind>().unwrap(), ContainerKind::Qemu);
        assert!("xen".parse::<ContainerKind>().is_err());
        assert_eq!(ContainerKind::Bhyve.to_string(), "bhyve");
    }
}
