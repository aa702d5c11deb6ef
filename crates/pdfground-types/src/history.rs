//! History entries, retained files and storage statistics.

use crate::Operation;
use serde::{Deserialize, Serialize};

/// A logged record of one completed operation, as the UI consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Unique id, `"{timestamp}_{suffix}"`.
    pub id: String,
    pub operation: Operation,
    /// Display name of the produced file (not a path).
    pub file_name: String,
    /// Milliseconds since the Unix epoch, set once at insert.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Weak reference to the retained file, if one was stored.
    #[serde(default)]
    pub file_id: Option<String>,
    /// Size of the retained file. `None` when there is no file or it was evicted.
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl HistoryItem {
    /// Whether the entry's file is still retained and can be downloaded.
    pub fn has_file(&self) -> bool {
        self.file_id.is_some() && self.file_size.is_some()
    }

    /// Whether the entry pointed at a file that has since been evicted.
    pub fn file_evicted(&self) -> bool {
        self.file_id.is_some() && self.file_size.is_none()
    }
}

/// A retained binary artifact produced by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBlob {
    /// `"file_" + owning history id`.
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    /// Byte length of `data`.
    pub size: u64,
    pub data: Vec<u8>,
    pub created_at: i64,
}

/// Aggregates over both tables, computed fresh on each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_files: u64,
    pub total_size: u64,
    pub history_count: u64,
}

/// Number of history entries recorded for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCount {
    pub operation: Operation,
    pub count: u64,
}
