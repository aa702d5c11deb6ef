//! Native host integration for the PDFGround history store.
//!
//! Provides the pieces a desktop or test host supplies around the core store:
//! configuration, logging, a filesystem block store and a downloads directory.

pub mod config;
pub mod downloads;
pub mod fs_store;
pub mod logging;
pub mod state;

pub use config::Config;
pub use downloads::DownloadDir;
pub use fs_store::FsBlockStore;
pub use state::HostState;
