//! Tables and indexes backing the history store.

use crate::Result;
use rusqlite::Connection;
use tracing::{debug, warn};

/// Version stamped into `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS history (
    id TEXT PRIMARY KEY,
    operation TEXT NOT NULL,
    fileName TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    details TEXT,
    fileId TEXT,
    FOREIGN KEY (fileId) REFERENCES files(id)
);

CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    fileName TEXT NOT NULL,
    fileData BLOB NOT NULL,
    mimeType TEXT NOT NULL,
    size INTEGER NOT NULL,
    createdAt INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_files_created ON files(createdAt DESC);
"#;

/// Create the tables and indexes if they do not exist yet.
///
/// Safe to call on a fresh database and on a restored image alike. Foreign
/// key enforcement is switched off on the connection: the bundled SQLite
/// turns it on by default, and retention deletes `files` rows that
/// `history.fileId` still points at.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", false)?;
    conn.execute_batch(SCHEMA_SQL)?;
    stamp_version(conn)?;
    Ok(())
}

fn stamp_version(conn: &Connection) -> Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version == 0 {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        debug!(target: "pdfground::db", "Stamped schema version {}", SCHEMA_VERSION);
    } else if version > SCHEMA_VERSION {
        warn!(
            target: "pdfground::db",
            "Database image has schema version {} (this build knows {}), using as-is",
            version,
            SCHEMA_VERSION
        );
    }

    Ok(())
}
