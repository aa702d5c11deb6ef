//! Host configuration.

use anyhow::Result;
use pdfground_core::{StoreConfig, DEFAULT_CONTAINER, DEFAULT_IMAGE_KEY};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the durable block store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_image_key")]
    pub image_key: String,
    /// Where downloaded history files are written.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdfground")
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_image_key() -> String {
    DEFAULT_IMAGE_KEY.to_string()
}

fn default_downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_max_files() -> usize {
    pdfground_core::retention::MAX_FILES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            container: default_container(),
            image_key: default_image_key(),
            downloads_dir: default_downloads_dir(),
            max_files: default_max_files(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default location (config/default.toml) or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        Ok(Config::default())
    }

    /// The part of the configuration the store itself needs.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            container: self.container.clone(),
            image_key: self.image_key.clone(),
            max_files: self.max_files,
        }
    }
}
