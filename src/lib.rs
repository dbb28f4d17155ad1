//! opds-shelf: a lightweight OPDS catalog for a directory of ebooks.
//!
//! Several independent server processes may serve the same book tree. They
//! share nothing but a cache directory, which holds the latest scan result
//! and one entry per extracted cover (including "no cover" sentinels).
//!
//! # Features
//!
//! - OPDS acquisition feed of every supported file under the book root
//! - Time-bounded scan cache with stale fallback when the tree is unreadable
//! - EPUB cover extraction with manifest, property and file-name lookups
//! - Write-once cover cache with negative entries
//! - Downloads confined to the book root

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Shared on-disk caches.
pub mod cache;
/// Configuration and CLI.
pub mod config;
/// Error types.
pub mod error;
/// Book format handlers.
pub mod formats;
/// Book records, scanning and path containment.
pub mod library;
/// OPDS feed generation.
pub mod opds;
/// HTTP server.
pub mod server;


pub use config::{Cli, Command, Config};
pub use error::{AppError, Result};
pub use library::Library;
pub use server::AppState;
