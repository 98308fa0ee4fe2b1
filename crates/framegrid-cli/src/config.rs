//! Resolved runtime settings.
//!
//! Values come from command-line flags with environment fallbacks
//! (`FRAMEGRID_STORE_DIR`, `FRAMEGRID_API_URL`, `FRAMEGRID_CELL_SIZE`); this
//! module validates them once and builds the store, image source and service
//! client every command needs.

use std::path::PathBuf;

use framegrid_core::{DirectoryMedium, FileSource, PersistedStore, StoreError};
use reqwest::Url;
use thiserror::Error;

use crate::service::HighlightService;
use crate::source::{HttpSource, RoutingSource};

pub const DEFAULT_STORE_DIR: &str = ".framegrid";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid service URL {url:?}: {message}")]
    InvalidApiUrl { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The store directory and service location shared by all commands.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_dir: PathBuf,
    /// Base URL of the highlight service; always ends in `/`.
    pub api_url: Url,
}

impl Settings {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidApiUrl` unless `api_url` is an absolute
    /// `http` or `https` URL.
    pub fn new(store_dir: impl Into<PathBuf>, api_url: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidApiUrl {
            url: api_url.to_string(),
            message,
        };

        let mut url = Url::parse(api_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        // Relative joins keep the path only when it ends in a slash
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            store_dir: store_dir.into(),
            api_url: url,
        })
    }

    /// Open the crop and rotation store under `store_dir`.
    pub fn open_store(&self) -> Result<PersistedStore<DirectoryMedium>, StoreError> {
        PersistedStore::open(DirectoryMedium::new(&self.store_dir))
    }

    /// Image source for frame references given on the command line or
    /// returned by the service.
    pub fn image_source(&self) -> Result<RoutingSource, ConfigError> {
        Ok(RoutingSource::new(
            HttpSource::new(self.api_url.clone())?,
            FileSource::new(),
        ))
    }

    pub fn service(&self) -> Result<HighlightService, ConfigError> {
        HighlightService::new(self.api_url.clone()).map_err(ConfigError::from)
    }
}
