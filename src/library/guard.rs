//! Containment check for client-supplied paths.

use crate::error::{AppError, Result};
use std::path::{Component, Path, PathBuf};

/// Resolves relative paths against a canonical book root and rejects
/// anything that lands outside it.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Canonicalize `root` once. Fails if the root does not exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self { root })
    }

    /// Canonical book root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `requested` under the root.
    ///
    /// Symbolic links and `..` are resolved before the containment check.
    /// Any canonicalization failure is reported as [`AppError::Traversal`],
    /// the same as an escape, so callers cannot probe for existence outside
    /// the root.
    pub fn validate(&self, requested: impl AsRef<Path>) -> Result<PathBuf> {
        let requested = requested.as_ref();
        if requested.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        let resolved = self
            .root
            .join(requested)
            .canonicalize()
            .map_err(|_| AppError::Traversal)?;

        if self.contains(&resolved) {
            Ok(resolved)
        } else {
            Err(AppError::Traversal)
        }
    }

    /// Whether an already canonical path is the root or lies below it.
    ///
    /// Compares whole components, so a sibling such as `/books-evil` never
    /// matches the root `/books`.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
    }

    /// Canonicalize `path` and check containment. Unresolvable paths are
    /// treated as outside.
    pub fn contains_resolved(&self, path: &Path) -> bool {
        path.canonicalize()
            .map(|p| self.contains(&p))
            .unwrap_or(false)
    }

    /// Whether a `requested` path that failed [`validate`](Self::validate)
    /// simply does not exist inside the root.
    ///
    /// True only if it stays below the root lexically and its deepest
    /// existing ancestor resolves inside the root.
    pub fn is_missing_inside(&self, requested: &Path) -> bool {
        if !lexically_contained(requested) {
            return false;
        }

        let full = self.root.join(requested);
        if full.symlink_metadata().is_ok() {
            return false;
        }

        full.ancestors()
            .skip(1)
            .find_map(|a| a.canonicalize().ok())
            .is_some_and(|p| self.contains(&p))
    }
}

/// Whether `relative` stays below its base without resolving anything on
/// disk: not absolute, and no `..` climbs above the start.
fn lexically_contained(relative: &Path) -> bool {
    let mut depth: usize = 0;
    for component in relative.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}
