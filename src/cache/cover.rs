//! Write-once cover cache with negative entries.

use crate::cache::write_atomic;
use crate::formats::{Cover, CoverEntry, IMAGE_TYPES, mime_extension};
use crate::library::book::is_book_id;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const COVERS_DIR: &str = "covers";
const ABSENT_SUFFIX: &str = "none";

/// What the cache knows about a book's cover, without extracting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverStatus {
    /// Never extracted.
    Unknown,
    /// Cover stored with this MIME type.
    Present(&'static str),
    /// Checked, no cover.
    Absent,
}

/// Per-book cover store: `<id>.<ext>` payloads and zero-byte `<id>.none`
/// sentinels.
///
/// Once an entry exists it is final; extraction is never repeated for that
/// id, even if the book changes, until the directory is cleared. Concurrent
/// first requests may each extract, and each writes the same result through
/// an atomic replace.
#[derive(Debug, Clone)]
pub struct CoverCache {
    dir: PathBuf,
}

impl CoverCache {
    /// Cover store inside `cache_dir`.
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: cache_dir.as_ref().join(COVERS_DIR),
        }
    }

    /// Directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached entry for `id`, or the result of `extract` on first access.
    ///
    /// Ids that could not have come from a scan are never used as file names;
    /// they are treated as having no cover.
    pub fn get_cover<F>(&self, id: &str, extract: F) -> CoverEntry
    where
        F: FnOnce() -> CoverEntry,
    {
        if !is_book_id(id) {
            tracing::warn!(id, "Rejected malformed cover key");
            return CoverEntry::Absent;
        }

        if let Some(entry) = self.load(id) {
            return entry;
        }

        let entry = extract();
        self.store(id, &entry);
        entry
    }

    /// Existence check only; never reads a payload or extracts.
    pub fn status(&self, id: &str) -> CoverStatus {
        if !is_book_id(id) {
            return CoverStatus::Unknown;
        }
        if let Some((_, mime)) = IMAGE_TYPES
            .iter()
            .find(|(ext, _)| self.entry_path(id, ext).is_file())
        {
            return CoverStatus::Present(*mime);
        }
        if self.entry_path(id, ABSENT_SUFFIX).is_file() {
            return CoverStatus::Absent;
        }
        CoverStatus::Unknown
    }

    /// Status of every entry, read with a single directory listing.
    ///
    /// Ids without an entry are left out. A payload wins over a sentinel for
    /// the same id, as in [`CoverCache::status`].
    pub fn statuses(&self) -> HashMap<String, CoverStatus> {
        let mut statuses = HashMap::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Cover cache unreadable");
                }
                return statuses;
            }
        };

        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            let name = entry.file_name();
            let Some((id, suffix)) = name.to_str().and_then(|n| n.rsplit_once('.')) else {
                continue;
            };
            if !is_book_id(id) {
                continue;
            }

            let status = if suffix == ABSENT_SUFFIX {
                CoverStatus::Absent
            } else if let Some((_, mime)) = IMAGE_TYPES.iter().find(|(ext, _)| *ext == suffix) {
                CoverStatus::Present(*mime)
            } else {
                continue;
            };

            let known = statuses.entry(id.to_string()).or_insert(status);
            if *known == CoverStatus::Absent {
                *known = status;
            }
        }

        statuses
    }

    fn load(&self, id: &str) -> Option<CoverEntry> {
        for (ext, mime) in IMAGE_TYPES {
            match std::fs::read(self.entry_path(id, ext)) {
                Ok(data) => return Some(CoverEntry::Present(Cover { data, mime })),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(id, error = %e, "Cover cache entry unreadable");
                    return None;
                }
            }
        }

        self.entry_path(id, ABSENT_SUFFIX)
            .is_file()
            .then_some(CoverEntry::Absent)
    }

    /// Persist `entry`. Failures are logged; the caller still has the result.
    fn store(&self, id: &str, entry: &CoverEntry) {
        let (path, data) = match entry {
            CoverEntry::Present(cover) => {
                let Some(ext) = mime_extension(cover.mime) else {
                    tracing::warn!(id, mime = cover.mime, "No cache suffix for cover type");
                    return;
                };
                (self.entry_path(id, ext), cover.data.as_slice())
            }
            CoverEntry::Absent => (self.entry_path(id, ABSENT_SUFFIX), &[][..]),
        };

        if let Err(e) = write_atomic(&path, data) {
            tracing::warn!(id, error = %e, "Cover not cached");
        }
    }

    fn entry_path(&self, id: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, suffix))
    }
}
