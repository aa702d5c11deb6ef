//! Bridge between the in-memory database image and the durable block store.

use crate::block_store::BlockStore;
use crate::Result;
use tracing::{debug, warn};

/// Container the image is stored in unless configured otherwise.
pub const DEFAULT_CONTAINER: &str = "database";

/// Key of the single slot holding the image unless configured otherwise.
pub const DEFAULT_IMAGE_KEY: &str = "pdfground.db";

/// Reads and writes the serialized database image in one named slot.
pub struct ImageStore<S> {
    store: S,
    container: String,
    key: String,
}

impl<S: BlockStore> ImageStore<S> {
    pub fn new(store: S, container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            key: key.into(),
        }
    }

    /// The underlying block store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the last saved image.
    ///
    /// Returns `None` on first run, for an empty slot, and on any access
    /// failure; none of these are fatal.
    pub async fn load(&self) -> Option<Vec<u8>> {
        match self.store.get(&self.container, &self.key).await {
            Ok(Some(image)) if !image.is_empty() => {
                debug!(
                    target: "pdfground::store",
                    "Loaded database image ({} bytes) from {}/{}",
                    image.len(),
                    self.container,
                    self.key
                );
                Some(image)
            }
            Ok(_) => {
                debug!(target: "pdfground::store", "No saved database image, starting fresh");
                None
            }
            Err(e) => {
                warn!(
                    target: "pdfground::store",
                    "Failed to read database image, starting fresh: {}",
                    e
                );
                None
            }
        }
    }

    /// Overwrite the slot with a full image.
    pub async fn save(&self, image: Vec<u8>) -> Result<()> {
        let len = image.len();
        self.store.put(&self.container, &self.key, image).await?;
        debug!(target: "pdfground::store", "Saved database image ({} bytes)", len);
        Ok(())
    }
}
