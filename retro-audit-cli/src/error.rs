use thiserror::Error;

use retro_audit_dat::DatError;
use retro_audit_lib::{AuditError, ConfigError, StoreError};

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be read
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// DAT file error
    #[error("DAT error: {0}")]
    Dat(#[from] DatError),

    /// Audit failed or was cancelled
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    /// Saved ROM records could not be loaded
    #[error("ROM set error: {0}")]
    Store(#[from] StoreError),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub(crate) fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
