//! The in-memory SQLite database and its durable image.
//!
//! The database lives entirely in memory. Durability comes from exporting the
//! whole image after each mutation and writing it into a single block store
//! slot; on first use the last saved image is imported back.

use crate::block_store::BlockStore;
use crate::image::{ImageStore, DEFAULT_CONTAINER, DEFAULT_IMAGE_KEY};
use crate::retention::MAX_FILES;
use crate::{schema, HistoryError, Result};
use rusqlite::serialize::OwnedData;
use rusqlite::{ffi, Connection, DatabaseName};
use std::ptr::NonNull;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{info, warn};

/// Settings the store needs from its host.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Block store container holding the image.
    pub container: String,
    /// Key of the image slot inside the container.
    pub image_key: String,
    /// Retention ceiling for stored files.
    pub max_files: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            image_key: DEFAULT_IMAGE_KEY.to_string(),
            max_files: MAX_FILES,
        }
    }
}

/// Whether a mutation reached the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// The full image was written to the block store.
    Persisted,
    /// The mutation is applied in memory but the image could not be saved;
    /// it will be lost on restart unless a later save succeeds.
    MemoryOnly,
}

/// Lazily-initialized handle to the history database.
///
/// Nothing is opened until the first call that needs the connection. Every
/// caller goes through one async mutex, so mutations and their image saves
/// are applied in call order.
pub struct Database<S> {
    images: ImageStore<S>,
    conn: OnceCell<Mutex<Connection>>,
}

impl<S: BlockStore> Database<S> {
    /// Create a handle over `store`. Does not touch the store yet.
    pub fn new(store: S, config: &StoreConfig) -> Self {
        Self {
            images: ImageStore::new(store, config.container.clone(), config.image_key.clone()),
            conn: OnceCell::new(),
        }
    }

    /// Bring up the engine, restoring the saved image if there is one.
    ///
    /// Idempotent. If initialization fails, the handle stays uninitialized and
    /// the next call tries again.
    pub async fn init(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.initialized()
    }

    /// The underlying block store.
    pub fn block_store(&self) -> &S {
        self.images.store()
    }

    /// Lock the connection, initializing on first use.
    pub async fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        Ok(self.connection().await?.lock().await)
    }

    /// Export the current image and write it to the block store.
    ///
    /// Takes the guard so the save happens while the caller still holds the
    /// lock. A failed save is logged and reported, not raised.
    pub async fn persist(&self, conn: &mut MutexGuard<'_, Connection>) -> Durability {
        let image = match export_image(conn) {
            Ok(image) => image,
            Err(e) => {
                warn!(target: "pdfground::db", "Failed to export database image: {}", e);
                return Durability::MemoryOnly;
            }
        };

        match self.images.save(image).await {
            Ok(()) => Durability::Persisted,
            Err(e) => {
                warn!(
                    target: "pdfground::db",
                    "Failed to save database image, change kept in memory only: {}",
                    e
                );
                Durability::MemoryOnly
            }
        }
    }

    async fn connection(&self) -> Result<&Mutex<Connection>> {
        self.conn
            .get_or_try_init(|| async { self.open().await.map(Mutex::new) })
            .await
    }

    async fn open(&self) -> Result<Connection> {
        if let Some(image) = self.images.load().await {
            match restore(&image) {
                Ok(conn) => {
                    info!(target: "pdfground::db", "Restored database image ({} bytes)", image.len());
                    return Ok(conn);
                }
                Err(e) => {
                    warn!(
                        target: "pdfground::db",
                        "Saved database image is unreadable, starting fresh: {}",
                        e
                    );
                }
            }
        }

        let conn = Connection::open_in_memory()
            .map_err(|e| HistoryError::InitFailed(e.to_string()))?;
        schema::ensure_schema(&conn).map_err(|e| HistoryError::InitFailed(e.to_string()))?;
        info!(target: "pdfground::db", "Created new history database");
        Ok(conn)
    }
}

/// Serialize the main database into a standalone byte image.
pub fn export_image(conn: &Connection) -> Result<Vec<u8>> {
    let data = conn.serialize(DatabaseName::Main)?;
    Ok(data.to_vec())
}

/// Open a new in-memory connection from a previously exported image.
pub fn restore(image: &[u8]) -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    conn.deserialize(DatabaseName::Main, sqlite_owned(image)?, false)?;
    // Also rejects images that are not SQLite databases.
    schema::ensure_schema(&conn)?;
    Ok(conn)
}

fn sqlite_owned(image: &[u8]) -> Result<OwnedData> {
    if image.is_empty() {
        return Err(HistoryError::InitFailed("empty database image".to_string()));
    }

    // SAFETY: the buffer is allocated by SQLite's allocator with exactly
    // `image.len()` bytes and fully initialized before ownership is handed to
    // `OwnedData`, which SQLite later releases with sqlite3_free.
    unsafe {
        let ptr = ffi::sqlite3_malloc64(image.len() as u64) as *mut u8;
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            HistoryError::InitFailed("cannot allocate database image".to_string())
        })?;
        std::ptr::copy_nonoverlapping(image.as_ptr(), ptr.as_ptr(), image.len());
        Ok(OwnedData::from_raw_nonnull(ptr, image.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlockStore;

    #[test]
    fn test_export_restore_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        schema::ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO history (id, operation, fileName, timestamp) VALUES ('a', 'split', 'part.pdf', 5)",
            [],
        )
        .unwrap();

        let image = export_image(&conn).unwrap();
        let restored = restore(&image).unwrap();

        let name: String = restored
            .query_row("SELECT fileName FROM history WHERE id = 'a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "part.pdf");
    }

    #[test]
    fn test_restored_connection_allows_dangling_file_ids() {
        let conn = Connection::open_in_memory().unwrap();
        schema::ensure_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO files (id, fileName, fileData, mimeType, size, createdAt) VALUES ('file_a', 'a.pdf', x'00', 'application/pdf', 1, 1);
             INSERT INTO history (id, operation, fileName, timestamp, fileId) VALUES ('a', 'merge', 'a.pdf', 1, 'file_a');",
        )
        .unwrap();

        let restored = restore(&export_image(&conn).unwrap()).unwrap();
        restored.execute("DELETE FROM files", []).unwrap();
        let remaining: i64 = restored
            .query_row("SELECT COUNT(*) FROM history WHERE fileId = 'file_a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[test]
    fn test_restore_rejects_garbage() {
        assert!(restore(b"definitely not a database image, just some bytes").is_err());
        assert!(restore(&[]).is_err());
    }

    #[tokio::test]
    async fn test_lazy_init() {
        let db = Database::new(MemoryBlockStore::new(), &StoreConfig::default());
        assert!(!db.is_initialized());
        db.init().await.unwrap();
        assert!(db.is_initialized());
        db.init().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_image_starts_fresh() {
        let store = MemoryBlockStore::new();
        store.insert_raw(DEFAULT_CONTAINER, DEFAULT_IMAGE_KEY, b"garbage".repeat(100));

        let db = Database::new(store, &StoreConfig::default());
        let conn = db.lock().await.unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_persist_writes_image() {
        let store = MemoryBlockStore::new();
        let db = Database::new(store.clone(), &StoreConfig::default());

        let mut conn = db.lock().await.unwrap();
        assert_eq!(db.persist(&mut conn).await, Durability::Persisted);
        drop(conn);

        let image = store.snapshot(DEFAULT_CONTAINER, DEFAULT_IMAGE_KEY).unwrap();
        assert!(image.starts_with(b"SQLite format 3\0"));
    }

    #[tokio::test]
    async fn test_persist_failure_is_memory_only() {
        let store = MemoryBlockStore::new();
        store.set_fail_writes(true);
        let db = Database::new(store, &StoreConfig::default());

        let mut conn = db.lock().await.unwrap();
        assert_eq!(db.persist(&mut conn).await, Durability::MemoryOnly);
    }
}
