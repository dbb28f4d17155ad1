//! Book record model.

use crate::config::BookFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// One supported file discovered under the book root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Stable identifier derived from the relative path.
    pub id: String,

    /// Path from the book root, `/`-separated.
    pub relative_path: String,

    /// File format.
    pub format: BookFormat,

    /// File size in bytes.
    pub size_bytes: u64,

    /// Last modified time.
    pub modified: DateTime<Utc>,
}

impl BookRecord {
    /// Build a record for a file at `relative` (already split from the root).
    pub fn new(
        relative: &Path,
        format: BookFormat,
        size_bytes: u64,
        modified: DateTime<Utc>,
    ) -> Self {
        let relative_path = normalize_relative(relative);
        Self {
            id: book_id(&relative_path),
            relative_path,
            format,
            size_bytes,
            modified,
        }
    }

    /// Display title: the file name without its extension.
    pub fn title(&self) -> &str {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Get the filename of the book.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Absolute location of the book under `root`.
    pub fn absolute_path(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path)
    }
}

/// Deterministic id for a relative path.
///
/// A UUIDv5 never exposes the directory structure, and the scan result maps
/// it back to the file.
pub fn book_id(relative_path: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, relative_path.as_bytes()).to_string()
}

/// Whether `key` has the shape of an id produced by [`book_id`].
pub fn is_book_id(key: &str) -> bool {
    Uuid::parse_str(key).is_ok_and(|u| u.to_string() == key)
}

fn normalize_relative(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
