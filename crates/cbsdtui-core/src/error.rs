//! Error types for cbsdtui-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] cbsdtui_config::ConfigError),

    #[error("Command error: {0}")]
    Runner(#[from] cbsdtui_runner::RunnerError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Update of {table} for {name} changed no rows")]
    NoRowsUpdated { table: &'static str, name: String },

    #[error("Invalid VNC console address '{0}': expected host:port")]
    InvalidVnc(String),

    #[error("Fields of {name} do not match kind {kind}")]
    KindMismatch {
        kind: crate::ContainerKind,
        name: String,
    },

    #[error("Unknown container kind: {0}")]
    UnknownKind(String),

    #[error("Cannot resolve home directory of user '{0}'")]
    UnknownUser(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
