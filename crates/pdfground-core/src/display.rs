//! Display helpers for history entries.
//!
//! All functions here are total: operations outside the known set fall back
//! to a generic icon and label.

use pdfground_types::Operation;

const FALLBACK_ICON: &str = "📄";
const FALLBACK_LABEL: &str = "PDF Operation";
const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Emoji shown next to an entry.
pub fn get_operation_icon(operation: &Operation) -> &'static str {
    match operation {
        Operation::Merge => "📑",
        Operation::Split => "✂️",
        Operation::Compress => "📉",
        Operation::Convert => "🔄",
        Operation::Ocr => "🔍",
        Operation::Reorder => "🔀",
        Operation::Delete => "🗑️",
        Operation::Other(_) => FALLBACK_ICON,
    }
}

/// Human-readable name of an operation.
pub fn get_operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Merge => "Merge PDFs",
        Operation::Split => "Split PDF",
        Operation::Compress => "Compress PDF",
        Operation::Convert => "Convert File",
        Operation::Ocr => "OCR Extraction",
        Operation::Reorder => "Reorder/Rotate Pages",
        Operation::Delete => "Delete Pages",
        Operation::Other(_) => FALLBACK_LABEL,
    }
}

/// Format a byte count with base-1024 units, e.g. `1536 -> "1.5 KB"`.
///
/// At most two decimals are kept and trailing zeros dropped. Sizes past the
/// gigabyte range stay in GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    while unit + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }

    let scaled = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}
