//! EPUB cover extraction.

use crate::error::{AppError, Result};
use crate::formats::{Cover, FormatHandler, image_mime};
use roxmltree::{Document, ParsingOptions};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Covers larger than this are ignored.
const MAX_COVER_BYTES: u64 = 32 * 1024 * 1024;

/// One way of finding the cover inside an opened epub.
type Strategy = fn(&mut EpubArchive) -> Option<Cover>;

/// Cover lookup strategies, tried in order. The first hit wins.
const STRATEGIES: [(&str, Strategy); 3] = [
    ("meta-cover", EpubArchive::cover_from_meta),
    ("cover-image-property", EpubArchive::cover_from_properties),
    ("cover-entry-name", EpubArchive::cover_from_entry_name),
];

/// Handler for EPUB files.
pub struct EpubHandler;

impl FormatHandler for EpubHandler {
    fn extract_cover(&self, path: &Path) -> Result<Option<Cover>> {
        let file = File::open(path)?;
        let mut epub = EpubArchive {
            archive: ZipArchive::new(file)?,
            package: None,
        };

        for (name, strategy) in STRATEGIES {
            if let Some(cover) = strategy(&mut epub) {
                tracing::debug!(path = %path.display(), strategy = name, "Found cover");
                return Ok(Some(cover));
            }
            tracing::debug!(path = %path.display(), strategy = name, "Cover strategy found nothing");
        }

        Ok(None)
    }
}

/// Package (OPF) document and the archive directory it lives in.
struct Package {
    dir: String,
    content: String,
}

/// An opened epub whose package document is read at most once.
struct EpubArchive {
    archive: ZipArchive<File>,
    package: Option<Option<Package>>,
}

impl EpubArchive {
    /// `<meta name="cover" content="ID"/>` naming a manifest item.
    fn cover_from_meta(&mut self) -> Option<Cover> {
        let entry = {
            let package = self.package()?;
            let doc = parse_xml(&package.content).ok()?;

            let cover_id = doc
                .descendants()
                .find(|n| n.tag_name().name() == "meta" && n.attribute("name") == Some("cover"))
                .and_then(|n| n.attribute("content"))?;

            let href = doc
                .descendants()
                .find(|n| n.tag_name().name() == "item" && n.attribute("id") == Some(cover_id))
                .and_then(|n| n.attribute("href"))?;

            resolve_href(&package.dir, href)
        };

        self.read_cover(&entry)
    }

    /// Manifest item carrying the `cover-image` property (EPUB 3).
    fn cover_from_properties(&mut self) -> Option<Cover> {
        let entry = {
            let package = self.package()?;
            let doc = parse_xml(&package.content).ok()?;

            let href = doc
                .descendants()
                .filter(|n| n.tag_name().name() == "item")
                .find(|n| {
                    n.attribute("properties")
                        .is_some_and(|p| p.split_whitespace().any(|t| t == "cover-image"))
                })
                .and_then(|n| n.attribute("href"))?;

            resolve_href(&package.dir, href)
        };

        self.read_cover(&entry)
    }

    /// Any entry whose base name is `cover`, at any depth, in archive order.
    fn cover_from_entry_name(&mut self) -> Option<Cover> {
        let candidates: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| !name.ends_with('/') && is_cover_name(name))
            .map(String::from)
            .collect();

        candidates.iter().find_map(|name| self.read_cover(name))
    }

    /// Package document, loaded on first use. `None` if the container or
    /// package is missing or unparsable.
    fn package(&mut self) -> Option<&Package> {
        if self.package.is_none() {
            let loaded = self.load_package();
            if let Err(ref e) = loaded {
                tracing::debug!(error = %e, "No usable package document");
            }
            self.package = Some(loaded.ok());
        }
        self.package.as_ref().and_then(Option::as_ref)
    }

    fn load_package(&mut self) -> Result<Package> {
        let container = self.read_text("META-INF/container.xml")?;
        let doc = parse_xml(&container)?;

        let opf_path = doc
            .descendants()
            .find(|n| n.has_tag_name("rootfile"))
            .and_then(|n| n.attribute("full-path"))
            .map(String::from)
            .ok_or_else(|| AppError::Internal("No rootfile in container.xml".into()))?;

        let content = self.read_text(&opf_path)?;
        let dir = opf_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();

        Ok(Package { dir, content })
    }

    fn read_text(&mut self, name: &str) -> Result<String> {
        let mut content = String::new();
        self.archive.by_name(name)?.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Read an entry as a cover. Fails if the entry is missing, oversized,
    /// or not recognisable as an image.
    fn read_cover(&mut self, name: &str) -> Option<Cover> {
        let mut file = self.archive.by_name(name).ok()?;
        if file.size() > MAX_COVER_BYTES {
            tracing::debug!(entry = name, size = file.size(), "Cover entry too large");
            return None;
        }

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data).ok()?;

        let mime = image_mime(&data, name)?;
        Some(Cover { data, mime })
    }
}

/// Parse a container or package document. Older packages carry a DOCTYPE.
fn parse_xml(text: &str) -> std::result::Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options)
}

/// Resolve a manifest `href` (relative to the package document) to an
/// archive entry name.
fn resolve_href(dir: &str, href: &str) -> String {
    let href = href.split(['#', '?']).next().unwrap_or(href);
    let href = urlencoding::decode(href)
        .map(|h| h.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Whether an entry's base name, without extension, is `cover`.
fn is_cover_name(name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);
    let stem = base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base);
    stem.eq_ignore_ascii_case("cover")
}

#[cfg(test)]
mod tests {
    use super::{is_cover_name, resolve_href};

    #[test]
    fn href_resolution() {
        assert_eq!(resolve_href("OEBPS", "images/cover.jpg"), "OEBPS/images/cover.jpg");
        assert_eq!(resolve_href("OEBPS/text", "../img/c.png"), "OEBPS/img/c.png");
        assert_eq!(resolve_href("", "cover.jpg"), "cover.jpg");
        assert_eq!(resolve_href("OPS", "my%20cover.jpg#frag"), "OPS/my cover.jpg");
    }

    #[test]
    fn cover_names() {
        assert!(is_cover_name("cover.jpg"));
        assert!(is_cover_name("OEBPS/Images/Cover.PNG"));
        assert!(is_cover_name("images/cover"));
        assert!(!is_cover_name("images/cover-small.jpg"));
        assert!(!is_cover_name("covers/page1.jpg"));
    }
}
