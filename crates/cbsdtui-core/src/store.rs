//! Cached container rows in the cbsd sqlite databases
//!
//! Jails and bhyve VMs live in the main database. QEMU VMs are listed there
//! but keep their settings in a per-VM database under `jails-system/<name>/`.
//! Reads open the file read-only and writes read-write; neither creates it.

use crate::{ContainerKind, CoreError, Result, Status};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};

/// Kind-specific columns of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindFields {
    Jail { version: String },
    Vm { os_type: String, vnc: String },
}

/// One container as cached by cbsd
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRow {
    pub kind: ContainerKind,
    pub name: String,
    /// Empty for VMs until filled in from the tool
    pub ip4_addr: String,
    pub status: Status,
    pub autostart: bool,
    pub fields: KindFields,
}

/// Read/write access to cached rows
pub trait ContainerStore: Send + Sync {
    /// Every row of `kind`
    fn list(&self, kind: ContainerKind) -> Result<Vec<ContainerRow>>;

    /// One row, `None` when no such container exists
    fn get(&self, kind: ContainerKind, name: &str) -> Result<Option<ContainerRow>>;

    /// All non-NULL columns of the row, in column order
    fn full_row(&self, kind: ContainerKind, name: &str) -> Result<Vec<(String, String)>>;

    /// Persist the editable fields of `row`
    fn put(&self, row: &ContainerRow) -> Result<()>;
}

const JAIL_LIST: &str = "SELECT jname,ip4_addr,status,astart,ver FROM jails WHERE emulator='jail'";
const JAIL_GET: &str = "SELECT jname,ip4_addr,status,astart,ver FROM jails WHERE jname = ?1";
const JAIL_PUT: &str = "UPDATE jails SET ip4_addr=?1, status=?2, astart=?3, ver=?4 WHERE jname=?5";
const JAIL_FULL: &str = "SELECT * FROM jails WHERE jname = ?1";

const BHYVE_LIST: &str = "SELECT jails.jname,jails.status,jails.astart,bhyve.vm_os_type,\
    bhyve.vm_vnc_port,bhyve.bhyve_vnc_tcp_bind FROM jails LEFT JOIN bhyve \
    ON jails.jname=bhyve.jname WHERE jails.emulator='bhyve'";
const BHYVE_GET: &str = "SELECT jails.jname,jails.status,jails.astart,bhyve.vm_os_type,\
    bhyve.vm_vnc_port,bhyve.bhyve_vnc_tcp_bind FROM jails LEFT JOIN bhyve \
    ON jails.jname=bhyve.jname WHERE jails.emulator='bhyve' AND jails.jname = ?1";
const BHYVE_PUT_ASTART: &str = "UPDATE jails SET astart=?1 WHERE jname=?2";
const BHYVE_PUT_VNC: &str = "UPDATE bhyve SET bhyve_vnc_tcp_bind=?1,vm_vnc_port=?2 WHERE jname=?3";
const BHYVE_FULL: &str = "SELECT * FROM jails LEFT JOIN bhyve ON jails.jname=bhyve.jname \
    WHERE jails.emulator='bhyve' AND jails.jname = ?1";

const QEMU_LIST: &str = "SELECT jname,status FROM jails WHERE emulator='qemu'";
const QEMU_GET: &str = "SELECT jname,status FROM jails WHERE emulator='qemu' AND jname = ?1";
const QEMU_SETTINGS: &str = "SELECT astart, vm_os_type, vm_vnc_port, qemu_vnc_tcp_bind FROM settings";
const QEMU_PUT: &str = "UPDATE settings SET astart=?1, vm_os_type=?2";
const QEMU_PUT_VNC: &str =
    "UPDATE settings SET astart=?1, vm_os_type=?2, vm_vnc_port=?3, qemu_vnc_tcp_bind=?4";
const QEMU_FULL: &str = "SELECT * FROM settings";

/// The sqlite databases of one cbsd installation
#[derive(Debug, Clone)]
pub struct SqliteStore {
    database: PathBuf,
    jails_system: PathBuf,
}

impl SqliteStore {
    pub fn new(database: impl Into<PathBuf>, jails_system: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            jails_system: jails_system.into(),
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    /// Per-VM settings database
    pub fn vm_database(&self, name: &str) -> PathBuf {
        self.jails_system.join(name).join("local.sqlite")
    }

    fn open(path: &Path, writable: bool) -> Result<Connection> {
        let flags = if writable {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        } else {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        };
        tracing::debug!("Opening {:?} (writable: {})", path, writable);
        Ok(Connection::open_with_flags(path, flags)?)
    }

    fn qemu_row(&self, name: String, status: Status) -> Result<Option<ContainerRow>> {
        let conn = Self::open(&self.vm_database(&name), false)?;
        let settings = conn
            .query_row(QEMU_SETTINGS, [], |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    text(row, 1)?,
                    row.get::<_, Option<i64>>(2)?,
                    text(row, 3)?,
                ))
            })
            .optional()?;

        Ok(settings.map(|(astart, os_type, port, bind)| ContainerRow {
            kind: ContainerKind::Qemu,
            name,
            ip4_addr: String::new(),
            status,
            autostart: astart.unwrap_or(0) != 0,
            fields: KindFields::Vm {
                os_type,
                vnc: format_vnc(&bind, port),
            },
        }))
    }
}

impl ContainerStore for SqliteStore {
    fn list(&self, kind: ContainerKind) -> Result<Vec<ContainerRow>> {
        let conn = Self::open(&self.database, false)?;
        match kind {
            ContainerKind::Jail => collect(&conn, JAIL_LIST, [], jail_row),
            ContainerKind::Bhyve => collect(&conn, BHYVE_LIST, [], bhyve_row),
            ContainerKind::Qemu => {
                let names = collect(&conn, QEMU_LIST, [], name_status)?;
                drop(conn);

                let mut rows = Vec::with_capacity(names.len());
                for (name, status) in names {
                    if name.is_empty() {
                        continue;
                    }
                    // A VM whose settings cannot be read is left out of the list
                    match self.qemu_row(name.clone(), status) {
                        Ok(Some(row)) => rows.push(row),
                        Ok(None) => tracing::warn!("No settings row for QEMU VM {}", name),
                        Err(e) => tracing::warn!("Cannot read settings of QEMU VM {}: {}", name, e),
                    }
                }
                Ok(rows)
            }
        }
    }

    fn get(&self, kind: ContainerKind, name: &str) -> Result<Option<ContainerRow>> {
        let conn = Self::open(&self.database, false)?;
        match kind {
            ContainerKind::Jail => Ok(conn.query_row(JAIL_GET, [name], jail_row).optional()?),
            ContainerKind::Bhyve => Ok(conn.query_row(BHYVE_GET, [name], bhyve_row).optional()?),
            ContainerKind::Qemu => {
                let found = conn.query_row(QEMU_GET, [name], name_status).optional()?;
                drop(conn);
                match found {
                    Some((name, status)) => self.qemu_row(name, status),
                    None => Ok(None),
                }
            }
        }
    }

    fn full_row(&self, kind: ContainerKind, name: &str) -> Result<Vec<(String, String)>> {
        match kind {
            ContainerKind::Jail => {
                let conn = Self::open(&self.database, false)?;
                column_pairs(&conn, JAIL_FULL, [name])
            }
            ContainerKind::Bhyve => {
                let conn = Self::open(&self.database, false)?;
                column_pairs(&conn, BHYVE_FULL, [name])
            }
            ContainerKind::Qemu => {
                let conn = Self::open(&self.vm_database(name), false)?;
                column_pairs(&conn, QEMU_FULL, [])
            }
        }
    }

    fn put(&self, row: &ContainerRow) -> Result<()> {
        let astart = i64::from(row.autostart);
        match (&row.kind, &row.fields) {
            (ContainerKind::Jail, KindFields::Jail { version }) => {
                let conn = Self::open(&self.database, true)?;
                let changed = conn.execute(
                    JAIL_PUT,
                    params![row.ip4_addr, row.status.code(), astart, version, row.name],
                )?;
                expect_rows(changed, "jails", &row.name)
            }
            (ContainerKind::Bhyve, KindFields::Vm { vnc, .. }) => {
                let console = vnc_to_write(vnc)?;
                let conn = Self::open(&self.database, true)?;
                let changed = conn.execute(BHYVE_PUT_ASTART, params![astart, row.name])?;
                expect_rows(changed, "jails", &row.name)?;

                match console {
                    Some(console) => {
                        let changed = conn.execute(
                            BHYVE_PUT_VNC,
                            params![console.host, console.port, row.name],
                        )?;
                        expect_rows(changed, "bhyve", &row.name)
                    }
                    None => Ok(()),
                }
            }
            (ContainerKind::Qemu, KindFields::Vm { os_type, vnc }) => {
                let console = vnc_to_write(vnc)?;
                let conn = Self::open(&self.vm_database(&row.name), true)?;
                let changed = match console {
                    Some(console) => conn.execute(
                        QEMU_PUT_VNC,
                        params![astart, os_type, console.port, console.host],
                    )?,
                    None => conn.execute(QEMU_PUT, params![astart, os_type])?,
                };
                expect_rows(changed, "settings", &row.name)
            }
            (kind, _) => Err(CoreError::KindMismatch {
                kind: *kind,
                name: row.name.clone(),
            }),
        }
    }
}

/// VNC endpoint to store; `None` when the VM has none configured
fn vnc_to_write(vnc: &str) -> Result<Option<crate::VncConsole>> {
    if vnc.trim().is_empty() {
        return Ok(None);
    }
    crate::VncConsole::parse(vnc).map(Some)
}

fn expect_rows(changed: usize, table: &'static str, name: &str) -> Result<()> {
    if changed == 0 {
        return Err(CoreError::NoRowsUpdated {
            table,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Non-NULL text column, empty when NULL
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn status_code(row: &Row<'_>, idx: usize) -> rusqlite::Result<Status> {
    Ok(Status::from_code(row.get::<_, Option<i64>>(idx)?.unwrap_or(0)))
}

fn jail_row(row: &Row<'_>) -> rusqlite::Result<ContainerRow> {
    Ok(ContainerRow {
        kind: ContainerKind::Jail,
        name: text(row, 0)?,
        ip4_addr: text(row, 1)?,
        status: status_code(row, 2)?,
        autostart: row.get::<_, Option<i64>>(3)?.unwrap_or(0) != 0,
        fields: KindFields::Jail {
            version: text(row, 4)?,
        },
    })
}

fn bhyve_row(row: &Row<'_>) -> rusqlite::Result<ContainerRow> {
    Ok(ContainerRow {
        kind: ContainerKind::Bhyve,
        name: text(row, 0)?,
        ip4_addr: String::new(),
        status: status_code(row, 1)?,
        autostart: row.get::<_, Option<i64>>(2)?.unwrap_or(0) != 0,
        fields: KindFields::Vm {
            os_type: text(row, 3)?,
            vnc: format_vnc(&text(row, 5)?, row.get::<_, Option<i64>>(4)?),
        },
    })
}

fn name_status(row: &Row<'_>) -> rusqlite::Result<(String, Status)> {
    Ok((text(row, 0)?, status_code(row, 1)?))
}

/// `bind:port` as shown to the user; empty when neither is set
fn format_vnc(bind: &str, port: Option<i64>) -> String {
    match (bind.is_empty(), port) {
        (true, None) => String::new(),
        (_, port) => format!("{}:{}", bind, port.unwrap_or(0)),
    }
}

fn collect<T, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn column_pairs<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params)?;

    let Some(row) = rows.next()? else {
        return Ok(Vec::new());
    };

    let mut pairs: Vec<(String, String)> = Vec::with_capacity(names.len());
    for (idx, name) in names.into_iter().enumerate() {
        // Joined tables repeat the key column
        if pairs.iter().any(|(existing, _)| *existing == name) {
            continue;
        }
        if let Some(value) = value_text(row.get_ref(idx)?) {
            pairs.push((name, value));
        }
    }
    Ok(pairs)
}

fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(format!("<{} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("local.sqlite");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE jails (jname TEXT, ip4_addr TEXT, status INTEGER, astart INTEGER,
                                 ver TEXT, emulator TEXT, path TEXT);
             CREATE TABLE bhyve (jname TEXT, vm_os_type TEXT, vm_vnc_port INTEGER,
                                 bhyve_vnc_tcp_bind TEXT);
             INSERT INTO jails VALUES ('web', '10.0.0.5', 1, 1, '14.1', 'jail', '/usr/jails/web');
             INSERT INTO jails VALUES ('db', '10.0.0.6', 0, 0, '13.2', 'jail', NULL);
             INSERT INTO jails VALUES ('vm1', NULL, 0, 1, NULL, 'bhyve', NULL);
             INSERT INTO jails VALUES ('q1', NULL, 1, 0, NULL, 'qemu', NULL);
             INSERT INTO bhyve VALUES ('vm1', 'freebsd', 5900, '127.0.0.1');",
        )
        .unwrap();

        let vm_dir = dir.path().join("jails-system").join("q1");
        std::fs::create_dir_all(&vm_dir).unwrap();
        let vm = Connection::open(vm_dir.join("local.sqlite")).unwrap();
        vm.execute_batch(
            "CREATE TABLE settings (astart INTEGER, vm_os_type TEXT, vm_vnc_port INTEGER,
                                    qemu_vnc_tcp_bind TEXT);
             INSERT INTO settings VALUES (1, 'linux', 5901, '0.0.0.0');",
        )
        .unwrap();

        let store = SqliteStore::new(db, dir.path().join("jails-system"));
        (dir, store)
    }

    #[test]
    fn test_list_jails() {
        let (_dir, store) = fixture();
        let rows = store.list(ContainerKind::Jail).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "web");
        assert_eq!(rows[0].ip4_addr, "10.0.0.5");
        assert_eq!(rows[0].status, Status::On);
        assert!(rows[0].autostart);
        assert_eq!(
            rows[0].fields,
            KindFields::Jail {
                version: "14.1".into()
            }
        );
    }

    #[test]
    fn test_list_bhyve_joins_vnc() {
        let (_dir, store) = fixture();
        let rows = store.list(ContainerKind::Bhyve).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].fields,
            KindFields::Vm {
                os_type: "freebsd".into(),
                vnc: "127.0.0.1:5900".into()
            }
        );
        assert!(rows[0].ip4_addr.is_empty());
    }

    #[test]
    fn test_list_qemu_reads_vm_database() {
        let (_dir, store) = fixture();
        let rows = store.list(ContainerKind::Qemu).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "q1");
        assert_eq!(rows[0].status, Status::On);
        assert!(rows[0].autostart);
        assert_eq!(
            rows[0].fields,
            KindFields::Vm {
                os_type: "linux".into(),
                vnc: "0.0.0.0:5901".into()
            }
        );
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_dir, store) = fixture();
        assert!(store.get(ContainerKind::Jail, "nope").unwrap().is_none());
        assert!(store.get(ContainerKind::Qemu, "nope").unwrap().is_none());
        // Wrong kind for an existing name
        assert!(store.get(ContainerKind::Bhyve, "web").unwrap().is_none());
    }

    #[test]
    fn test_full_row_skips_nulls() {
        let (_dir, store) = fixture();
        let pairs = store.full_row(ContainerKind::Jail, "db").unwrap();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(keys, ["jname", "ip4_addr", "status", "astart", "ver", "emulator"]);
        assert_eq!(pairs[4], ("ver".to_string(), "13.2".to_string()));
    }

    #[test]
    fn test_full_row_of_join_has_unique_keys() {
        let (_dir, store) = fixture();
        let pairs = store.full_row(ContainerKind::Bhyve, "vm1").unwrap();
        let jnames = pairs.iter().filter(|(k, _)| k == "jname").count();
        assert_eq!(jnames, 1);
        assert!(pairs.contains(&("vm_vnc_port".to_string(), "5900".to_string())));
    }

    #[test]
    fn test_put_jail_round_trip() {
        let (_dir, store) = fixture();
        let mut row = store.get(ContainerKind::Jail, "db").unwrap().unwrap();
        row.autostart = true;
        row.ip4_addr = "10.0.0.9".into();

        store.put(&row).unwrap();

        assert_eq!(store.get(ContainerKind::Jail, "db").unwrap(), Some(row));
    }

    #[test]
    fn test_put_bhyve_writes_vnc() {
        let (_dir, store) = fixture();
        let mut row = store.get(ContainerKind::Bhyve, "vm1").unwrap().unwrap();
        row.fields = KindFields::Vm {
            os_type: "freebsd".into(),
            vnc: "10.1.1.1:5905".into(),
        };
        row.autostart = false;

        store.put(&row).unwrap();

        let reread = store.get(ContainerKind::Bhyve, "vm1").unwrap().unwrap();
        assert!(!reread.autostart);
        assert_eq!(reread.fields, row.fields);
    }

    #[test]
    fn test_put_qemu_writes_settings() {
        let (_dir, store) = fixture();
        let mut row = store.get(ContainerKind::Qemu, "q1").unwrap().unwrap();
        row.autostart = false;

        store.put(&row).unwrap();

        assert!(!store.get(ContainerKind::Qemu, "q1").unwrap().unwrap().autostart);
    }

    #[test]
    fn test_put_vm_rejects_bad_vnc_before_writing() {
        let (_dir, store) = fixture();
        for kind in [ContainerKind::Bhyve, ContainerKind::Qemu] {
            let name = if kind == ContainerKind::Bhyve { "vm1" } else { "q1" };
            let before = store.get(kind, name).unwrap().unwrap();
            let mut row = before.clone();
            row.autostart = !row.autostart;
            row.fields = KindFields::Vm {
                os_type: "freebsd".into(),
                vnc: "no-port-here".into(),
            };

            let err = store.put(&row).unwrap_err();
            assert!(matches!(err, CoreError::InvalidVnc(ref raw) if raw == "no-port-here"));
            assert_eq!(store.get(kind, name).unwrap(), Some(before));
        }
    }

    #[test]
    fn test_put_vm_without_vnc_keeps_columns() {
        let (_dir, store) = fixture();
        let mut row = store.get(ContainerKind::Qemu, "q1").unwrap().unwrap();
        row.autostart = false;
        row.fields = KindFields::Vm {
            os_type: "linux".into(),
            vnc: String::new(),
        };

        store.put(&row).unwrap();

        let reread = store.get(ContainerKind::Qemu, "q1").unwrap().unwrap();
        assert!(!reread.autostart);
        assert_eq!(
            reread.fields,
            KindFields::Vm {
                os_type: "linux".into(),
                vnc: "0.0.0.0:5901".into()
            }
        );
    }

    #[test]
    fn test_put_unknown_row_changes_nothing() {
        let (_dir, store) = fixture();
        let row = ContainerRow {
            kind: ContainerKind::Jail,
            name: "ghost".into(),
            ip4_addr: String::new(),
            status: Status::Off,
            autostart: false,
            fields: KindFields::Jail {
                version: String::new(),
            },
        };

        let err = store.put(&row).unwrap_err();
        assert!(matches!(err, CoreError::NoRowsUpdated { table: "jails", .. }));
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("absent.sqlite"), dir.path());
        assert!(matches!(
            store.list(ContainerKind::Jail),
            Err(CoreError::Database(_))
        ));
    }
}
