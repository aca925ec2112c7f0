//! Configuration for cbsd-tui
//!
//! Global configuration lives at `~/.config/cbsd-tui/config.toml` and
//! describes where the cbsd tooling and its databases are found.

mod error;
mod global;

pub use error::*;
pub use global::*;
