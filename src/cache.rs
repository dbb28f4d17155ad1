//! Filesystem-backed caches shared by every worker process.
//!
//! Workers share nothing but the cache directory, so every write is a
//! whole-file replace: content goes to a temporary file in the target
//! directory and is renamed into place. Readers see the old file or the new
//! one, never a partial write. Racing writers resolve as "last rename wins".

mod cover;
mod scan;

pub use cover::{CoverCache, CoverStatus};
pub use scan::{ScanCache, ScanCacheEntry};

use crate::error::{AppError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically create or replace `path` with `data`.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| AppError::CacheWrite(format!("no parent for {}", path.display())))?;

    let write = || -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    };

    write().map_err(|e| AppError::CacheWrite(format!("{}: {}", path.display(), e)))
}
