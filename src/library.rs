//! Book catalog backed by the shared cache directory.

pub mod book;
pub mod guard;
pub mod scanner;

pub use book::BookRecord;
pub use guard::PathGuard;
pub use scanner::Scanner;

use crate::cache::{CoverCache, CoverStatus, ScanCache, ScanCacheEntry};
use crate::config::{BookFormat, Config};
use crate::error::{AppError, Result};
use crate::formats::{self, Cover};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Entry point for listing, cover and download lookups.
///
/// Holds no book state in memory: every call goes through the cache
/// directory, so independent processes built on the same directory agree.
#[derive(Debug, Clone)]
pub struct Library {
    scanner: Scanner,
    scan_cache: ScanCache,
    cover_cache: CoverCache,
    ttl: Duration,
}

impl Library {
    /// Open the book root and cache directory.
    ///
    /// Fails with [`AppError::Scan`] if the root cannot be canonicalized.
    pub fn open(
        root: impl AsRef<Path>,
        cache_dir: impl AsRef<Path>,
        ttl: Duration,
    ) -> Result<Self> {
        let guard = PathGuard::new(root.as_ref())
            .map_err(|e| AppError::Scan(format!("book root unavailable: {}", e)))?;
        let cache_dir = cache_dir.as_ref();

        Ok(Self {
            scanner: Scanner::new(guard),
            scan_cache: ScanCache::new(cache_dir),
            cover_cache: CoverCache::new(cache_dir),
            ttl,
        })
    }

    /// Open using the book root, cache directory and TTL from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.library.path, &config.cache.dir, config.scan.ttl())
    }

    /// Canonical book root.
    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    /// Default scan time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current book list, rescanning when the cached one is older than `ttl`.
    pub fn list_books(&self, ttl: Duration) -> Result<Vec<BookRecord>> {
        self.scan_cache.get_books_with(ttl, || self.scanner.scan())
    }

    /// Current book list under the default TTL.
    pub fn books(&self) -> Result<Vec<BookRecord>> {
        self.list_books(self.ttl)
    }

    /// Look a book up by id in the current list.
    pub fn find_book(&self, id: &str) -> Result<BookRecord> {
        self.books()?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or(AppError::NotFound)
    }

    /// Cover bytes for a book. Unknown ids and books without a cover are
    /// both [`AppError::NotFound`].
    pub fn get_cover_bytes(&self, id: &str) -> Result<Cover> {
        let book = self.find_book(id)?;
        let root = self.root();

        self.cover_cache
            .get_cover(&book.id, || formats::extract_cover(&book, root))
            .into_cover()
            .ok_or(AppError::NotFound)
    }

    /// Cached cover knowledge for `id`, without extracting.
    pub fn cover_status(&self, id: &str) -> CoverStatus {
        self.cover_cache.status(id)
    }

    /// Cached cover knowledge for every book, from one listing of the cover
    /// directory. Books missing from the map are [`CoverStatus::Unknown`].
    pub fn cover_statuses(&self) -> HashMap<String, CoverStatus> {
        self.cover_cache.statuses()
    }

    /// Resolve a client-supplied relative path to a servable book file.
    ///
    /// Paths escaping the root are [`AppError::Traversal`]. Paths that stay
    /// inside it but name nothing servable are [`AppError::NotFound`].
    pub fn resolve_download_path(&self, relative: &str) -> Result<PathBuf> {
        let guard = self.scanner.guard();
        let requested = Path::new(relative);
        let path = match guard.validate(requested) {
            Ok(path) => path,
            Err(AppError::Traversal) if guard.is_missing_inside(requested) => {
                return Err(AppError::NotFound);
            }
            Err(e) => return Err(e),
        };

        if !path.is_file() || BookFormat::from_path(&path).is_none() {
            return Err(AppError::NotFound);
        }
        Ok(path)
    }

    /// Resolve a download target: a book id from the feed, or a relative path.
    pub fn resolve_download(&self, target: &str) -> Result<PathBuf> {
        if book::is_book_id(target) {
            let book = self.find_book(target)?;
            return self.resolve_download_path(&book.relative_path);
        }
        self.resolve_download_path(target)
    }

    /// Scan now, regardless of the cached entry's age, and persist the result.
    pub fn rescan(&self) -> Result<ScanCacheEntry> {
        self.scan_cache.refresh_with(|| self.scanner.scan())
    }
}
