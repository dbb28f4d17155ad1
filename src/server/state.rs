//! Application state shared across handlers.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::library::Library;
use std::sync::Arc;

/// Shared application state.
///
/// Carries only configuration and paths; book lists and covers are read from
/// the cache directory on every request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Catalog over the book root and cache directory.
    pub library: Arc<Library>,
}

impl AppState {
    /// Create application state.
    pub fn new(config: Config, library: Library) -> Self {
        Self {
            config: Arc::new(config),
            library: Arc::new(library),
        }
    }

    /// Create application state, opening the library described by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let library = Library::from_config(&config)?;
        Ok(Self::new(config, library))
    }

    /// Get the base URL for generating links.
    pub fn base_url(&self) -> &str {
        self.config.server.base_url.trim_end_matches('/')
    }

    /// Run blocking library work off the async executor.
    pub async fn with_library<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Library) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let library = Arc::clone(&self.library);
        tokio::task::spawn_blocking(move || f(&library))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
