//! Core logic for cbsd-tui
//!
//! This crate provides:
//! - One container abstraction over jails, bhyve VMs and QEMU VMs, with the
//!   per-kind differences held in tables
//! - Status reconciliation against the live tool and the start/stop state machine
//! - Snapshot, clone, export, destroy and edit operations
//! - The sqlite row cache
//! - Label and function-key dispatch tables
//! - Per-container update/refresh signals

mod action;
mod console;
mod container;
mod error;
mod host;
pub mod kind;
mod lifecycle;
mod signal;
mod snapshot;
mod status;
mod store;
mod vnc;

pub use action::*;
pub use console::*;
pub use container::*;
pub use error::*;
pub use host::*;
pub use kind::{CommandTable, ContainerKind};
pub use lifecycle::*;
pub use signal::*;
pub use snapshot::*;
pub use status::*;
pub use store::*;
pub use vnc::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
