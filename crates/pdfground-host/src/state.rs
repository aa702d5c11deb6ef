//! Host state wiring the store together.

use crate::config::Config;
use crate::downloads::DownloadDir;
use crate::fs_store::FsBlockStore;
use pdfground_core::{Database, HistoryStorage, Repository};
use std::sync::Arc;
use tracing::info;

/// Everything a host application needs to record and browse history.
pub struct HostState {
    pub history: HistoryStorage<FsBlockStore>,
    pub database: Arc<Database<FsBlockStore>>,
    pub config: Config,
}

impl HostState {
    /// Assemble the store. Nothing is read from disk until first use.
    pub fn new(config: Config) -> Self {
        let store_config = config.store_config();
        let database = Arc::new(Database::new(
            FsBlockStore::new(&config.data_dir),
            &store_config,
        ));
        let repository = Repository::new(database.clone(), &store_config);
        let sink = Arc::new(DownloadDir::new(&config.downloads_dir));

        Self {
            history: HistoryStorage::new(repository, sink),
            database,
            config,
        }
    }

    /// Create the state and bring the database up eagerly.
    pub async fn open(config: Config) -> pdfground_core::Result<Self> {
        let state = Self::new(config);
        state.database.init().await?;
        info!(
            target: "pdfground::host",
            "History store ready at {}",
            state.config.data_dir.display()
        );
        Ok(state)
    }
}
