//! Error types for the history store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database initialization failed: {0}")]
    InitFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Block store error: {0}")]
    BlockStoreError(String),

    #[error("Download failed: {0}")]
    DeliveryFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of a [`HistoryError`], for callers that want to
/// surface failures without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The embedded engine could not be brought up.
    Initialization,
    /// A SQL statement failed against the in-memory database.
    Database,
    /// The durable block store rejected a read or write.
    Persistence,
    /// The host could not receive a downloaded file.
    Delivery,
}

impl HistoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InitFailed(_) => ErrorKind::Initialization,
            Self::DatabaseError(_) => ErrorKind::Database,
            Self::BlockStoreError(_) | Self::IoError(_) => ErrorKind::Persistence,
            Self::DeliveryFailed(_) => ErrorKind::Delivery,
        }
    }
}
