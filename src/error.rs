//! Unified error handling for the retrocast crate
//!
//! Domain-specific errors (scheduler, ledger) stay in their modules; this
//! module wraps them into a single [`Error`] enum usable across module
//! boundaries, with a coarse [`ErrorCategory`] classification for callers
//! that only care about the handling strategy.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::ledger::LedgerError;
pub use crate::scheduler::error::SchedulerError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Slot building and filling errors
    Scheduling,
    /// Catalog and ledger storage errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the retrocast crate
#[derive(Error, Debug)]
pub enum Error {
    /// Slot building and filling errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Rotation ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Scheduler(_) => ErrorCategory::Scheduling,
            Self::Ledger(_) | Self::Database(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether the operation can be retried or locally recovered
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Scheduler(e) => e.is_recoverable(),
            // a ledger conflict is a logic bug, storage errors may be transient
            Self::Ledger(LedgerError::WriteConflict { .. }) => false,
            Self::Ledger(LedgerError::Storage(_)) => true,
            Self::Database(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
        }
    }
}

// Conversion from rusqlite::Error
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
