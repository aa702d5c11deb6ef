//! Backward-compatible history surface used by tool screens.
//!
//! Nothing here returns an error. Failures are logged and mapped to the
//! legacy return shape (an empty list, zeroed stats). Mutating calls also
//! return a [`WriteStatus`] that callers are free to ignore.

use crate::block_store::BlockStore;
use crate::db::Durability;
use crate::download::{DownloadOutcome, DownloadSink};
use crate::error::ErrorKind;
use crate::repository::{HistoryFilter, Repository};
use crate::Result;
use pdfground_types::{HistoryItem, Operation, OperationCount, StorageStats};
use std::sync::Arc;
use tracing::error;

/// MIME type assumed when a caller does not pass one.
pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// How far a history write got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Applied and saved to the durable store.
    Persisted,
    /// Applied, but will not survive a restart.
    MemoryOnly,
    /// Not applied.
    Failed(ErrorKind),
}

impl WriteStatus {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

impl From<Durability> for WriteStatus {
    fn from(durability: Durability) -> Self {
        match durability {
            Durability::Persisted => Self::Persisted,
            Durability::MemoryOnly => Self::MemoryOnly,
        }
    }
}

/// History storage as the UI sees it.
pub struct HistoryStorage<S> {
    repository: Repository<S>,
    sink: Arc<dyn DownloadSink>,
}

impl<S: BlockStore> HistoryStorage<S> {
    pub fn new(repository: Repository<S>, sink: Arc<dyn DownloadSink>) -> Self {
        Self { repository, sink }
    }

    /// The repository underneath, for callers that want real errors.
    pub fn repository(&self) -> &Repository<S> {
        &self.repository
    }

    /// All entries, newest first. Empty on failure.
    pub async fn get_history(&self) -> Vec<HistoryItem> {
        log_failure("reading history", self.repository.query_all().await).unwrap_or_default()
    }

    /// The newest entries matching `filter`. Empty on failure.
    pub async fn recent_history(&self, filter: &HistoryFilter) -> Vec<HistoryItem> {
        log_failure(
            "reading recent history",
            self.repository.recent(filter).await,
        )
        .unwrap_or_default()
    }

    /// Record an operation that produced no retained file.
    pub async fn add_to_history(
        &self,
        operation: &Operation,
        file_name: &str,
        details: Option<&str>,
    ) -> WriteStatus {
        let result = self
            .repository
            .insert(operation, file_name, details.unwrap_or_default(), None, None)
            .await;
        write_status("adding to history", result.map(|inserted| inserted.durability))
    }

    /// Record an operation together with the file it produced.
    ///
    /// `mime_type` defaults to [`DEFAULT_MIME_TYPE`].
    pub async fn add_to_history_with_file(
        &self,
        operation: &Operation,
        file_name: &str,
        details: &str,
        file_data: &[u8],
        mime_type: Option<&str>,
    ) -> WriteStatus {
        let mime_type = mime_type.unwrap_or(DEFAULT_MIME_TYPE);
        let result = self
            .repository
            .insert(operation, file_name, details, Some(file_data), Some(mime_type))
            .await;
        write_status(
            "adding to history with file",
            result.map(|inserted| inserted.durability),
        )
    }

    /// Send the file behind a history entry to the download sink.
    pub async fn download_from_history(&self, history_id: &str) -> DownloadOutcome {
        let result = self
            .repository
            .download_by_history_id(history_id, self.sink.as_ref())
            .await;
        log_failure("downloading from history", result).unwrap_or(DownloadOutcome::Failed)
    }

    pub async fn delete_history_item(&self, history_id: &str) -> WriteStatus {
        write_status(
            "deleting history item",
            self.repository.delete_entry(history_id).await,
        )
    }

    pub async fn clear_history(&self) -> WriteStatus {
        write_status("clearing history", self.repository.clear_all().await)
    }

    /// Storage statistics. Zeroed on failure.
    pub async fn get_stats(&self) -> StorageStats {
        log_failure("getting storage stats", self.repository.stats().await).unwrap_or_default()
    }

    /// Entry counts per operation. Empty on failure.
    pub async fn operation_counts(&self) -> Vec<OperationCount> {
        log_failure(
            "counting operations",
            self.repository.operation_counts().await,
        )
        .unwrap_or_default()
    }
}

fn log_failure<T>(context: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(target: "pdfground::history", "Error {}: {}", context, e);
            None
        }
    }
}

fn write_status(context: &str, result: Result<Durability>) -> WriteStatus {
    match result {
        Ok(durability) => durability.into(),
        Err(e) => {
            error!(target: "pdfground::history", "Error {}: {}", context, e);
            WriteStatus::Failed(e.kind())
        }
    }
}
