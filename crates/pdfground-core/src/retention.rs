//! Count-based eviction of retained files.

use crate::Result;
use rusqlite::{params, Connection};
use tracing::debug;

/// Number of files kept unless configured otherwise.
pub const MAX_FILES: usize = 50;

/// Delete the oldest `files` rows beyond `max_files`.
///
/// Age is creation time, with insertion order breaking ties. History rows are
/// never touched, so an evicted file leaves its entry with a dangling
/// `fileId`. Returns the number of evicted rows.
pub fn enforce(conn: &Connection, max_files: usize) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
    let excess = count - max_files as i64;
    if excess <= 0 {
        return Ok(0);
    }

    let evicted = conn.execute(
        r#"
        DELETE FROM files
        WHERE id IN (
            SELECT id FROM files
            ORDER BY createdAt ASC, rowid ASC
            LIMIT ?1
        )
        "#,
        params![excess],
    )?;

    debug!(
        target: "pdfground::retention",
        "Evicted {} file(s), {} retained",
        evicted,
        max_files
    );
    Ok(evicted)
}
