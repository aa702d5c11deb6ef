//! History and file repository.
//!
//! Every mutation runs inside one SQL transaction and is followed by a
//! full-image save while the connection lock is still held.

use crate::block_store::BlockStore;
use crate::clock::{Clock, SystemClock};
use crate::db::{Database, Durability, StoreConfig};
use crate::download::{BlobLookup, DownloadOutcome, DownloadSink};
use crate::{retention, Result};
use pdfground_types::{FileBlob, HistoryItem, Operation, OperationCount, StorageStats};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SELECT_HISTORY: &str = r#"
    SELECT
        h.id AS id,
        h.operation AS operation,
        h.fileName AS fileName,
        h.timestamp AS timestamp,
        h.details AS details,
        h.fileId AS fileId,
        f.size AS fileSize
    FROM history h
    LEFT JOIN files f ON h.fileId = f.id
"#;

/// Which entries [`Repository::recent`] returns.
///
/// Filters combine with AND. `details_contains` is a case-sensitive substring
/// match and never matches entries without details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub operation: Option<Operation>,
    pub details_contains: Option<String>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn details_contains(mut self, needle: impl Into<String>) -> Self {
        self.details_contains = Some(needle.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn sql_limit(&self) -> i64 {
        self.limit
            .map_or(i64::MAX, |limit| i64::try_from(limit).unwrap_or(i64::MAX))
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inserted {
    pub history_id: String,
    pub file_id: Option<String>,
    /// Files evicted by retention as part of this insert.
    pub evicted: usize,
    pub durability: Durability,
}

/// CRUD surface over the `history` and `files` tables.
pub struct Repository<S> {
    db: Arc<Database<S>>,
    clock: Arc<dyn Clock>,
    max_files: usize,
}

impl<S: BlockStore> Repository<S> {
    pub fn new(db: Arc<Database<S>>, config: &StoreConfig) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            max_files: config.max_files,
        }
    }

    /// Replace the time source used for new entries.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &Arc<Database<S>> {
        &self.db
    }

    /// Record a completed operation.
    ///
    /// When both `file_data` and `mime_type` are given the file is retained
    /// under `file_<historyId>` and retention runs afterwards. A failed image
    /// save does not fail the insert; it shows up as
    /// [`Durability::MemoryOnly`].
    pub async fn insert(
        &self,
        operation: &Operation,
        file_name: &str,
        details: &str,
        file_data: Option<&[u8]>,
        mime_type: Option<&str>,
    ) -> Result<Inserted> {
        let mut conn = self.db.lock().await?;

        let (history_id, file_id, evicted) = {
            let tx = conn.transaction()?;
            let timestamp = next_timestamp(&tx, self.clock.now_millis())?;
            let history_id = new_history_id(timestamp);

            let file_id = match (file_data, mime_type) {
                (Some(data), Some(mime_type)) => {
                    let file_id = file_id_for(&history_id);
                    tx.execute(
                        "INSERT INTO files (id, fileName, fileData, mimeType, size, createdAt) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![file_id, file_name, data, mime_type, data.len() as i64, timestamp],
                    )?;
                    Some(file_id)
                }
                _ => None,
            };

            let details = (!details.is_empty()).then_some(details);
            tx.execute(
                "INSERT INTO history (id, operation, fileName, timestamp, details, fileId) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![history_id, operation.as_str(), file_name, timestamp, details, file_id],
            )?;

            let evicted = if file_id.is_some() {
                retention::enforce(&tx, self.max_files)?
            } else {
                0
            };

            tx.commit()?;
            (history_id, file_id, evicted)
        };

        let durability = self.db.persist(&mut conn).await;
        debug!(
            target: "pdfground::history",
            "Recorded {} entry {} (file: {})",
            operation,
            history_id,
            file_id.as_deref().unwrap_or("none")
        );

        Ok(Inserted {
            history_id,
            file_id,
            evicted,
            durability,
        })
    }

    /// Every entry, newest first, with the retained file size joined in.
    pub async fn query_all(&self) -> Result<Vec<HistoryItem>> {
        let conn = self.db.lock().await?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY h.timestamp DESC, h.rowid DESC",
            SELECT_HISTORY
        ))?;
        let items = stmt
            .query_map([], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// The newest entries matching `filter`.
    pub async fn recent(&self, filter: &HistoryFilter) -> Result<Vec<HistoryItem>> {
        let conn = self.db.lock().await?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR h.operation = ?1) AND (?2 IS NULL OR instr(h.details, ?2) > 0) ORDER BY h.timestamp DESC, h.rowid DESC LIMIT ?3",
            SELECT_HISTORY
        ))?;
        let items = stmt
            .query_map(
                params![
                    filter.operation.as_ref().map(Operation::as_str),
                    filter.details_contains.as_deref(),
                    filter.sql_limit()
                ],
                row_to_item,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Point lookup of a retained file.
    pub async fn fetch_blob(&self, file_id: &str) -> Result<Option<FileBlob>> {
        let conn = self.db.lock().await?;
        load_blob(&conn, file_id)
    }

    /// Resolve a history entry to its retained file, telling apart entries
    /// without a file from entries whose file was evicted.
    pub async fn resolve_download(&self, history_id: &str) -> Result<BlobLookup> {
        let conn = self.db.lock().await?;

        let file_id: Option<Option<String>> = conn
            .query_row(
                "SELECT fileId FROM history WHERE id = ?1",
                params![history_id],
                |row| row.get(0),
            )
            .optional()?;

        let lookup = match file_id {
            None => BlobLookup::UnknownEntry,
            Some(None) => BlobLookup::NoFile,
            Some(Some(file_id)) => match load_blob(&conn, &file_id)? {
                Some(blob) => BlobLookup::Found(blob),
                None => BlobLookup::Evicted { file_id },
            },
        };
        Ok(lookup)
    }

    /// Hand the file behind a history entry to the host.
    ///
    /// Misses are logged and returned as outcomes; only lookup and sink
    /// failures are errors.
    pub async fn download_by_history_id(
        &self,
        history_id: &str,
        sink: &dyn DownloadSink,
    ) -> Result<DownloadOutcome> {
        let outcome = match self.resolve_download(history_id).await? {
            BlobLookup::Found(blob) => {
                sink.deliver(&blob)?;
                info!(
                    target: "pdfground::history",
                    "Delivered {} ({} bytes)",
                    blob.file_name,
                    blob.size
                );
                DownloadOutcome::Delivered {
                    file_name: blob.file_name,
                    size: blob.size,
                }
            }
            BlobLookup::NoFile => {
                warn!(
                    target: "pdfground::history",
                    "No file associated with history entry {}",
                    history_id
                );
                DownloadOutcome::NoFile
            }
            BlobLookup::Evicted { file_id } => {
                warn!(
                    target: "pdfground::history",
                    "File {} for history entry {} is no longer available",
                    file_id,
                    history_id
                );
                DownloadOutcome::Evicted
            }
            BlobLookup::UnknownEntry => {
                warn!(target: "pdfground::history", "Unknown history entry {}", history_id);
                DownloadOutcome::UnknownEntry
            }
        };
        Ok(outcome)
    }

    /// Delete an entry and its file. Unknown ids are a no-op.
    pub async fn delete_entry(&self, history_id: &str) -> Result<Durability> {
        let mut conn = self.db.lock().await?;

        {
            let tx = conn.transaction()?;
            let file_id: Option<String> = tx
                .query_row(
                    "SELECT fileId FROM history WHERE id = ?1",
                    params![history_id],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();

            if let Some(file_id) = &file_id {
                tx.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
            }
            let removed = tx.execute("DELETE FROM history WHERE id = ?1", params![history_id])?;
            tx.commit()?;

            if removed == 0 {
                debug!(target: "pdfground::history", "Delete of unknown entry {} ignored", history_id);
            }
        }

        Ok(self.db.persist(&mut conn).await)
    }

    /// Delete every entry and every file.
    pub async fn clear_all(&self) -> Result<Durability> {
        let mut conn = self.db.lock().await?;

        {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM files", [])?;
            tx.execute("DELETE FROM history", [])?;
            tx.commit()?;
        }

        info!(target: "pdfground::history", "Cleared history");
        Ok(self.db.persist(&mut conn).await)
    }

    /// File count, total retained bytes and entry count.
    pub async fn stats(&self) -> Result<StorageStats> {
        let conn = self.db.lock().await?;

        let (total_files, total_size): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM files",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let history_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;

        Ok(StorageStats {
            total_files: total_files as u64,
            total_size: total_size as u64,
            history_count: history_count as u64,
        })
    }

    /// Number of entries per operation, most frequent first.
    pub async fn operation_counts(&self) -> Result<Vec<OperationCount>> {
        let conn = self.db.lock().await?;
        let mut stmt = conn.prepare(
            "SELECT operation, COUNT(*) AS n FROM history GROUP BY operation ORDER BY n DESC, operation ASC",
        )?;
        let counts = stmt
            .query_map([], |row| {
                let operation: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok(OperationCount {
                    operation: Operation::from(operation),
                    count: count as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}

/// The timestamp for a new entry: the clock reading, but never earlier than
/// the newest entry already stored.
fn next_timestamp(conn: &Connection, now: i64) -> Result<i64> {
    let latest: i64 = conn.query_row(
        "SELECT COALESCE(MAX(timestamp), 0) FROM history",
        [],
        |row| row.get(0),
    )?;
    Ok(now.max(latest))
}

fn new_history_id(timestamp: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", timestamp, &suffix[..9])
}

/// Id of the file owned by a history entry.
pub fn file_id_for(history_id: &str) -> String {
    format!("file_{}", history_id)
}

fn load_blob(conn: &Connection, file_id: &str) -> Result<Option<FileBlob>> {
    let blob = conn
        .query_row(
            "SELECT id, fileName, fileData, mimeType, size, createdAt FROM files WHERE id = ?1",
            params![file_id],
            |row| {
                let size: i64 = row.get("size")?;
                Ok(FileBlob {
                    id: row.get("id")?,
                    file_name: row.get("fileName")?,
                    data: row.get("fileData")?,
                    mime_type: row.get("mimeType")?,
                    size: size as u64,
                    created_at: row.get("createdAt")?,
                })
            },
        )
        .optional()?;
    Ok(blob)
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<HistoryItem> {
    let operation: String = row.get("operation")?;
    let file_size: Option<i64> = row.get("fileSize")?;

    Ok(HistoryItem {
        id: row.get("id")?,
        operation: Operation::from(operation),
        file_name: row.get("fileName")?,
        timestamp: row.get("timestamp")?,
        details: row.get("details")?,
        file_id: row.get("fileId")?,
        file_size: file_size.map(|size| size as u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlockStore;

    fn repository() -> Repository<MemoryBlockStore> {
        let config = StoreConfig::default();
        let db = Arc::new(Database::new(MemoryBlockStore::new(), &config));
        Repository::new(db, &config)
    }

    #[test]
    fn test_history_id_shape() {
        let id = new_history_id(1_700_000_000_123);
        let (ts, suffix) = id.split_once('_').unwrap();
        assert_eq!(ts, "1700000000123");
        assert_eq!(suffix.len(), 9);
        assert_ne!(new_history_id(1), new_history_id(1));
    }

    #[test]
    fn test_file_id_derivation() {
        assert_eq!(file_id_for("17_abc"), "file_17_abc");
    }

    #[tokio::test]
    async fn test_empty_details_stored_as_null() {
        let repo = repository();
        repo.insert(&Operation::Split, "a.pdf", "", None, None)
            .await
            .unwrap();
        let items = repo.query_all().await.unwrap();
        assert_eq!(items[0].details, None);
    }

    #[tokio::test]
    async fn test_bytes_without_mime_are_not_retained() {
        let repo = repository();
        let inserted = repo
            .insert(&Operation::Ocr, "scan.txt", "text", Some(b"hello".as_slice()), None)
            .await
            .unwrap();
        assert!(inserted.file_id.is_none());
        assert_eq!(repo.stats().await.unwrap().total_files, 0);
    }

    #[tokio::test]
    async fn test_timestamps_never_go_backwards() {
        struct Backwards(std::sync::atomic::AtomicI64);
        impl Clock for Backwards {
            fn now_millis(&self) -> i64 {
                self.0.fetch_sub(10, std::sync::atomic::Ordering::SeqCst)
            }
        }

        let repo = repository().with_clock(Arc::new(Backwards(1_000.into())));
        for _ in 0..3 {
            repo.insert(&Operation::Merge, "m.pdf", "", None, None)
                .await
                .unwrap();
        }
        let timestamps: Vec<i64> = repo
            .query_all()
            .await
            .unwrap()
            .iter()
            .map(|item| item.timestamp)
            .collect();
        assert_eq!(timestamps, vec![1_000, 1_000, 1_000]);
    }

    #[tokio::test]
    async fn test_recent_filters_and_limits() {
        let repo = repository();
        for i in 0..4 {
            repo.insert(&Operation::Merge, &format!("m{}.pdf", i), "", None, None)
                .await
                .unwrap();
            repo.insert(&Operation::Split, &format!("s{}.pdf", i), "", None, None)
                .await
                .unwrap();
        }

        let merges = repo
            .recent(&HistoryFilter::new().operation(Operation::Merge).limit(3))
            .await
            .unwrap();
        let names: Vec<&str> = merges.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["m3.pdf", "m2.pdf", "m1.pdf"]);

        let all = repo.recent(&HistoryFilter::new().limit(2)).await.unwrap();
        let names: Vec<&str> = all.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["s3.pdf", "m3.pdf"]);
    }

    #[tokio::test]
    async fn test_recent_without_limit_returns_everything() {
        let repo = repository();
        for i in 0..3 {
            repo.insert(&Operation::Convert, &format!("c{}.docx", i), "", None, None)
                .await
                .unwrap();
        }

        assert_eq!(repo.recent(&HistoryFilter::new()).await.unwrap().len(), 3);
        assert_eq!(
            repo.recent(&HistoryFilter::new().limit(usize::MAX)).await.unwrap().len(),
            3
        );
        assert!(repo.recent(&HistoryFilter::new().limit(0)).await.unwrap().is_empty());
        assert_eq!(HistoryFilter::new().limit(usize::MAX).sql_limit(), i64::MAX);
        assert_eq!(HistoryFilter::new().sql_limit(), i64::MAX);
    }

    #[tokio::test]
    async fn test_recent_filters_on_details() {
        let repo = repository();
        repo.insert(&Operation::Split, "p1.pdf", "Extracted pages 1-3", None, None)
            .await
            .unwrap();
        repo.insert(&Operation::Split, "p2.pdf", "Split into 2 files", None, None)
            .await
            .unwrap();
        repo.insert(&Operation::Split, "p3.pdf", "", None, None)
            .await
            .unwrap();
        repo.insert(&Operation::Convert, "e.png", "Extracted images", None, None)
            .await
            .unwrap();

        let extracted = repo
            .recent(
                &HistoryFilter::new()
                    .operation(Operation::Split)
                    .details_contains("Extracted"),
            )
            .await
            .unwrap();
        let names: Vec<&str> = extracted.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["p1.pdf"]);

        let any = repo
            .recent(&HistoryFilter::new().details_contains("Extracted"))
            .await
            .unwrap();
        assert_eq!(any.len(), 2);

        assert!(repo
            .recent(&HistoryFilter::new().details_contains("extracted"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_operation_counts() {
        let repo = repository();
        for op in [Operation::Merge, Operation::Merge, Operation::Compress] {
            repo.insert(&op, "f.pdf", "", None, None).await.unwrap();
        }
        repo.insert(&Operation::Other("stamp".to_string()), "f.pdf", "", None, None)
            .await
            .unwrap();

        let counts = repo.operation_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                OperationCount { operation: Operation::Merge, count: 2 },
                OperationCount { operation: Operation::Compress, count: 1 },
                OperationCount { operation: Operation::Other("stamp".to_string()), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_download_variants() {
        let config = StoreConfig {
            max_files: 1,
            ..StoreConfig::default()
        };
        let db = Arc::new(Database::new(MemoryBlockStore::new(), &config));
        let repo = Repository::new(db, &config);

        let plain = repo
            .insert(&Operation::Ocr, "text.txt", "", None, None)
            .await
            .unwrap();
        let first = repo
            .insert(&Operation::Merge, "a.pdf", "", Some(b"%PDF-a".as_slice()), Some("application/pdf"))
            .await
            .unwrap();
        let second = repo
            .insert(&Operation::Merge, "b.pdf", "", Some(b"%PDF-b".as_slice()), Some("application/pdf"))
            .await
            .unwrap();
        assert_eq!(second.evicted, 1);

        assert_eq!(
            repo.resolve_download(&plain.history_id).await.unwrap(),
            BlobLookup::NoFile
        );
        assert_eq!(
            repo.resolve_download(&first.history_id).await.unwrap(),
            BlobLookup::Evicted {
                file_id: first.file_id.clone().unwrap()
            }
        );
        assert!(matches!(
            repo.resolve_download(&second.history_id).await.unwrap(),
            BlobLookup::Found(blob) if blob.data == b"%PDF-b"
        ));
        assert_eq!(
            repo.resolve_download("missing").await.unwrap(),
            BlobLookup::UnknownEntry
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_noop() {
        let repo = repository();
        repo.insert(&Operation::Merge, "m.pdf", "", None, None)
            .await
            .unwrap();
        assert_eq!(
            repo.delete_entry("nope").await.unwrap(),
            Durability::Persisted
        );
        assert_eq!(repo.stats().await.unwrap().history_count, 1);
    }
}
