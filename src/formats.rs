mod epub;

pub use epub::EpubHandler;

use crate::config::BookFormat;
use crate::error::Result;
use crate::library::book::BookRecord;
use std::path::Path;

/// Image types a cover can be stored as: cache file suffix and MIME type.
pub const IMAGE_TYPES: [(&str, &str); 5] = [
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
];

/// Raw cover image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    /// Image bytes exactly as stored in the book.
    pub data: Vec<u8>,
    /// MIME type, one of [`IMAGE_TYPES`].
    pub mime: &'static str,
}

/// Outcome of a cover lookup, including the negative result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverEntry {
    /// The book has a cover.
    Present(Cover),
    /// The book was checked and has no cover.
    Absent,
}

impl CoverEntry {
    /// Convert into an optional cover.
    pub fn into_cover(self) -> Option<Cover> {
        match self {
            CoverEntry::Present(cover) => Some(cover),
            CoverEntry::Absent => None,
        }
    }
}

/// Trait for format-specific book handlers.
pub trait FormatHandler: Send + Sync {
    /// Extract the embedded cover image, if the book declares or contains one.
    fn extract_cover(&self, path: &Path) -> Result<Option<Cover>>;
}

/// Get the appropriate handler for a book format.
pub fn get_handler(format: BookFormat) -> Box<dyn FormatHandler> {
    if format.has_embedded_cover() {
        Box::new(EpubHandler)
    } else {
        Box::new(MinimalHandler)
    }
}

/// Extract the cover of `book` stored under `root`.
///
/// Never fails: an unreadable or malformed book is logged and yields
/// [`CoverEntry::Absent`]. The source file is only read.
pub fn extract_cover(book: &BookRecord, root: &Path) -> CoverEntry {
    if !book.format.has_embedded_cover() {
        return CoverEntry::Absent;
    }

    let path = book.absolute_path(root);
    match get_handler(book.format).extract_cover(&path) {
        Ok(Some(cover)) => CoverEntry::Present(cover),
        Ok(None) => CoverEntry::Absent,
        Err(e) => {
            tracing::debug!(book = %book.id, error = %e, "Cover extraction failed");
            CoverEntry::Absent
        }
    }
}

/// Determine the image MIME type of `data`.
///
/// Leading magic bytes win over the entry name, since package metadata can
/// mislabel the extension. The name is only consulted for formats without a
/// signature (SVG) or when the bytes are not recognised.
pub fn image_mime(data: &[u8], name: &str) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(data) {
        let mime = format.to_mime_type();
        if let Some((_, known)) = IMAGE_TYPES.iter().find(|(_, m)| *m == mime) {
            return Some(*known);
        }
    }

    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
    IMAGE_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Cache file suffix for an image MIME type.
pub fn mime_extension(mime: &str) -> Option<&'static str> {
    IMAGE_TYPES
        .iter()
        .find(|(_, m)| *m == mime)
        .map(|(ext, _)| *ext)
}

/// Handler for formats without an extractable cover.
struct MinimalHandler;

impl FormatHandler for MinimalHandler {
    fn extract_cover(&self, _path: &Path) -> Result<Option<Cover>> {
        Ok(None)
    }
}
