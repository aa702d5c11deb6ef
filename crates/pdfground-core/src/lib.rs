//! Local persistent history and file store for PDFGround.
//!
//! An in-memory SQLite database records every completed tool operation and
//! the file it produced. After each mutation the whole database image is
//! written to a host-provided [`BlockStore`], which is what survives restarts.

mod block_store;
mod clock;
mod db;
mod display;
mod download;
mod error;
mod facade;
mod image;
mod repository;
pub mod retention;
pub mod schema;

pub use block_store::{BlockStore, MemoryBlockStore};
pub use clock::{Clock, SystemClock};
pub use db::{export_image, restore, Database, Durability, StoreConfig};
pub use display::{format_file_size, get_operation_icon, get_operation_label};
pub use download::{BlobLookup, CollectingSink, DownloadOutcome, DownloadSink};
pub use error::{ErrorKind, HistoryError};
pub use facade::{HistoryStorage, WriteStatus, DEFAULT_MIME_TYPE};
pub use image::{ImageStore, DEFAULT_CONTAINER, DEFAULT_IMAGE_KEY};
pub use repository::{file_id_for, HistoryFilter, Inserted, Repository};

/// Result type for history store operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
