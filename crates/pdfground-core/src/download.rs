//! Handing retained files back to the host.

use crate::{HistoryError, Result};
use pdfground_types::FileBlob;
use std::sync::Mutex;

/// The host's "save bytes as file" facility.
pub trait DownloadSink: Send + Sync {
    /// Deliver a retained file to the user.
    fn deliver(&self, file: &FileBlob) -> Result<()>;
}

/// Result of resolving a history entry to its retained file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobLookup {
    Found(FileBlob),
    /// The entry was recorded without a file.
    NoFile,
    /// The entry pointed at a file that retention has since deleted.
    Evicted { file_id: String },
    /// No entry has this id.
    UnknownEntry,
}

/// What happened to a download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was handed to the sink.
    Delivered { file_name: String, size: u64 },
    NoFile,
    Evicted,
    UnknownEntry,
    /// The lookup or the sink failed; details were logged.
    Failed,
}

impl DownloadOutcome {
    /// Whether the user received a file.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// A [`DownloadSink`] that keeps delivered files in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    delivered: Mutex<Vec<FileBlob>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files delivered so far, oldest first.
    pub fn delivered(&self) -> Vec<FileBlob> {
        self.delivered
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }
}

impl DownloadSink for CollectingSink {
    fn deliver(&self, file: &FileBlob) -> Result<()> {
        let mut files = self
            .delivered
            .lock()
            .map_err(|_| HistoryError::DeliveryFailed(format!("{}: sink poisoned", file.file_name)))?;
        files.push(file.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn blob(name: &str) -> FileBlob {
        FileBlob {
            id: format!("file_{}", name),
            file_name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            size: 4,
            data: b"%PDF".to_vec(),
            created_at: 1,
        }
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.deliver(&blob("a.pdf")).unwrap();
        sink.deliver(&blob("b.pdf")).unwrap();
        let names: Vec<String> = sink.delivered().into_iter().map(|f| f.file_name).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_poisoned_sink_reports_failure() {
        let sink = Arc::new(CollectingSink::new());
        let holder = sink.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.delivered.lock().unwrap();
            panic!("sink holder crashed");
        })
        .join();

        let err = sink.deliver(&blob("lost.pdf")).unwrap_err();
        assert!(matches!(err, HistoryError::DeliveryFailed(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Delivery);
    }

    #[test]
    fn test_outcome_is_delivered() {
        assert!(DownloadOutcome::Delivered {
            file_name: "a.pdf".to_string(),
            size: 1
        }
        .is_delivered());
        assert!(!DownloadOutcome::Evicted.is_delivered());
    }
}
