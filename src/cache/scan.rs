//! Time-bounded scan result slot.

use crate::cache::write_atomic;
use crate::error::Result;
use crate::library::book::BookRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SLOT_FILE: &str = "scan.json";

/// One persisted scan result. Superseded as a whole, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCacheEntry {
    /// When the scan finished.
    pub generated_at: DateTime<Utc>,
    /// Books in relative-path order.
    pub books: Vec<BookRecord>,
}

impl ScanCacheEntry {
    /// Wrap a fresh scan result.
    pub fn new(books: Vec<BookRecord>) -> Self {
        Self {
            generated_at: Utc::now(),
            books,
        }
    }

    /// Whether the entry is younger than `ttl` at `now`.
    ///
    /// Entries stamped in the future (clock skew between hosts sharing the
    /// cache) count as expired.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Ok(age) = (now - self.generated_at).to_std() else {
            return false;
        };
        age < ttl
    }
}

/// Single on-disk slot holding the latest scan result.
#[derive(Debug, Clone)]
pub struct ScanCache {
    slot: PathBuf,
}

impl ScanCache {
    /// Slot inside `cache_dir`.
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            slot: cache_dir.as_ref().join(SLOT_FILE),
        }
    }

    /// Path of the slot file.
    pub fn slot_path(&self) -> &Path {
        &self.slot
    }

    /// Read the persisted entry. A missing, unreadable or corrupt slot is `None`.
    pub fn load(&self) -> Option<ScanCacheEntry> {
        let data = match std::fs::read(&self.slot) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Scan cache unreadable");
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Scan cache corrupt, ignoring");
                None
            }
        }
    }

    /// Atomically replace the slot.
    pub fn store(&self, entry: &ScanCacheEntry) -> Result<()> {
        let data = serde_json::to_vec(entry)?;
        write_atomic(&self.slot, &data)
    }

    /// Books from a slot younger than `ttl`, otherwise from `scan`.
    ///
    /// A successful scan is persisted; a failed persist is logged and the
    /// result served anyway. A failed scan falls back to the previous entry,
    /// however old, and only errors when there is none.
    pub fn get_books_with<F>(&self, ttl: Duration, scan: F) -> Result<Vec<BookRecord>>
    where
        F: FnOnce() -> Result<Vec<BookRecord>>,
    {
        let previous = match self.load() {
            Some(entry) if entry.is_fresh(ttl, Utc::now()) => return Ok(entry.books),
            previous => previous,
        };

        match scan() {
            Ok(books) => {
                let entry = ScanCacheEntry::new(books);
                if let Err(e) = self.store(&entry) {
                    tracing::warn!(error = %e, "Scan result not cached");
                }
                Ok(entry.books)
            }
            Err(e) => match previous {
                Some(stale) => {
                    tracing::warn!(
                        error = %e,
                        generated_at = %stale.generated_at,
                        "Scan failed, serving previous result"
                    );
                    Ok(stale.books)
                }
                None => Err(e),
            },
        }
    }

    /// Run `scan` unconditionally and persist the result.
    pub fn refresh_with<F>(&self, scan: F) -> Result<ScanCacheEntry>
    where
        F: FnOnce() -> Result<Vec<BookRecord>>,
    {
        let entry = ScanCacheEntry::new(scan()?);
        self.store(&entry)?;
        Ok(entry)
    }
}
