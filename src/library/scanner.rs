//! Recursive walk of the book root.

use crate::config::BookFormat;
use crate::error::{AppError, Result};
use crate::library::book::BookRecord;
use crate::library::guard::PathGuard;
use chrono::{DateTime, Utc};
use std::path::Path;
use walkdir::WalkDir;

/// Walks a book root and builds the ordered book list.
#[derive(Debug, Clone)]
pub struct Scanner {
    guard: PathGuard,
}

impl Scanner {
    /// Create a scanner for the root held by `guard`.
    pub fn new(guard: PathGuard) -> Self {
        Self { guard }
    }

    /// Canonical root being scanned.
    pub fn root(&self) -> &Path {
        self.guard.root()
    }

    /// Guard for the scanned root.
    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Enumerate every supported file under the root, sorted by relative path.
    ///
    /// Unsupported files are skipped silently. An unreadable subdirectory or a
    /// name that is not valid UTF-8 is logged and skipped; only an unreadable
    /// root fails the scan. Symbolic
    /// links are followed only while their target stays inside the root.
    pub fn scan(&self) -> Result<Vec<BookRecord>> {
        let root = self.guard.root();
        let start = std::time::Instant::now();

        std::fs::read_dir(root)
            .map_err(|e| AppError::Scan(format!("book root unreadable: {}", e)))?;

        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !e.path_is_symlink() || self.guard.contains_resolved(e.path()));

        let mut books = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(AppError::Scan(format!("book root unreadable: {}", e)));
                }
                Err(e) => {
                    tracing::warn!(
                        path = ?e.path().and_then(|p| p.strip_prefix(root).ok()),
                        error = %e,
                        "Skipping unreadable entry"
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(format) = BookFormat::from_path(entry.path()) else {
                continue;
            };

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };

            // Ids and stored paths are UTF-8; a lossy name would not round-trip.
            if relative.to_str().is_none() {
                tracing::warn!(path = %relative.display(), "Skipping file with non UTF-8 name");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %relative.display(), error = %e, "Skipping file without metadata");
                    continue;
                }
            };

            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            books.push(BookRecord::new(relative, format, metadata.len(), modified));
        }

        books.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        tracing::info!(books = books.len(), elapsed = ?start.elapsed(), "Scan complete");
        Ok(books)
    }
}
