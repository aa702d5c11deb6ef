//! Downloads directory acting as the host's "save as" target.

use pdfground_core::{DownloadSink, HistoryError};
use pdfground_types::FileBlob;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes delivered files into a directory, never overwriting existing ones.
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free path for `file_name`: `name.ext`, then `name (1).ext`, ...
    pub fn target_path(&self, file_name: &str) -> PathBuf {
        let file_name = sanitize(file_name);
        let candidate = self.dir.join(&file_name);
        if !candidate.exists() {
            return candidate;
        }

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
            _ => (file_name.clone(), String::new()),
        };

        (1..)
            .map(|n| self.dir.join(format!("{} ({}){}", stem, n, ext)))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

impl DownloadSink for DownloadDir {
    fn deliver(&self, file: &FileBlob) -> pdfground_core::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.target_path(&file.file_name);
        std::fs::write(&path, &file.data).map_err(|e| {
            HistoryError::DeliveryFailed(format!("{}: {}", path.display(), e))
        })?;
        info!(target: "pdfground::host", "Saved {} to {}", file.file_name, path.display());
        Ok(())
    }
}

/// Strip path separators so a display name can't escape the directory.
fn sanitize(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "download".to_string(),
        name => name.to_string(),
    }
}
