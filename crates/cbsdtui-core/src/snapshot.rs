//! Snapshot listing

use serde::Serialize;

/// A snapshot reported by the tool; only lives as long as a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub created: String,
}

impl Snapshot {
    pub fn new(name: impl Into<String>, created: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: created.into(),
        }
    }
}

/// Parse `jsnapshot mode=list header=0 display=snapname,creation` output.
///
/// Lines with fewer than two whitespace-separated fields are skipped and
/// fields past the second are ignored.
pub fn parse_snapshots(output: &str) -> Vec<Snapshot> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(name), Some(created)) => Some(Snapshot::new(name, created)),
                _ => {
                    if !line.trim().is_empty() {
                        tracing::debug!("Skipping snapshot line {:?}", line);
                    }
                    None
                }
            }
        })
        .collect()
}
