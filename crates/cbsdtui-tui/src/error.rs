//! Error types for the TUI

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] cbsdtui_core::CoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] cbsdtui_config::ConfigError),
}

pub type AppResult<T> = Result<T, AppError>;
