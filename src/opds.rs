//! OPDS catalog generation.

use crate::cache::CoverStatus;
use crate::library::BookRecord;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

/// Content type of an acquisition feed.
pub const ACQUISITION_MIME: &str = "application/atom+xml;profile=opds-catalog;kind=acquisition";

/// Link relation for a full-size cover.
pub const REL_IMAGE: &str = "http://opds-spec.org/image";
/// Link relation for a cover thumbnail.
pub const REL_THUMBNAIL: &str = "http://opds-spec.org/image/thumbnail";
/// Link relation for a download.
pub const REL_ACQUISITION: &str = "http://opds-spec.org/acquisition";

/// OPDS feed link.
#[derive(Debug, Clone)]
pub struct Link {
    /// Link relation type (e.g., "self", "start", acquisition).
    pub rel: String,
    /// URL of the linked resource.
    pub href: String,
    /// MIME type of the linked resource.
    pub link_type: String,
}

/// OPDS feed entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Unique identifier for the entry.
    pub id: String,
    /// Entry title.
    pub title: String,
    /// Last update timestamp.
    pub updated: DateTime<Utc>,
    /// Links associated with this entry.
    pub links: Vec<Link>,
}

/// OPDS feed builder.
pub struct FeedBuilder {
    id: String,
    title: String,
    updated: DateTime<Utc>,
    links: Vec<Link>,
    entries: Vec<Entry>,
}

impl FeedBuilder {
    /// Create a new feed builder.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            updated: Utc::now(),
            links: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Add a self link.
    pub fn self_link(mut self, href: impl Into<String>) -> Self {
        self.links.push(Link {
            rel: "self".to_string(),
            href: href.into(),
            link_type: ACQUISITION_MIME.to_string(),
        });
        self
    }

    /// Add a start link.
    pub fn start_link(mut self, href: impl Into<String>) -> Self {
        self.links.push(Link {
            rel: "start".to_string(),
            href: href.into(),
            link_type: ACQUISITION_MIME.to_string(),
        });
        self
    }

    /// Add a book entry.
    ///
    /// Cover links are added for formats that can carry a cover, unless the
    /// cover cache already knows there is none.
    pub fn book_entry(mut self, book: &BookRecord, cover: CoverStatus, base_url: &str) -> Self {
        let mut links = Vec::with_capacity(3);

        let cover_type = match cover {
            CoverStatus::Present(mime) => Some(mime),
            CoverStatus::Unknown if book.format.has_embedded_cover() => Some("image/jpeg"),
            _ => None,
        };
        if let Some(mime) = cover_type {
            let href = format!("{}/cover/{}", base_url, book.id);
            for rel in [REL_IMAGE, REL_THUMBNAIL] {
                links.push(Link {
                    rel: rel.to_string(),
                    href: href.clone(),
                    link_type: mime.to_string(),
                });
            }
        }

        links.push(Link {
            rel: REL_ACQUISITION.to_string(),
            href: format!("{}/download/{}", base_url, book.id),
            link_type: book.format.mime_type().to_string(),
        });

        self.entries.push(Entry {
            id: format!("urn:uuid:{}", book.id),
            title: book.title().to_string(),
            updated: book.modified,
            links,
        });
        self
    }

    /// Build the XML feed.
    pub fn build(self) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        // XML declaration - writing to Vec can't fail
        let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));

        let mut feed = BytesStart::new("feed");
        feed.push_attribute(("xmlns", "http://www.w3.org/2005/Atom"));
        feed.push_attribute(("xmlns:opds", "http://opds-spec.org/2010/catalog"));
        let _ = writer.write_event(Event::Start(feed));

        write_text_element(&mut writer, "id", &self.id);
        write_text_element(&mut writer, "title", &self.title);
        write_text_element(&mut writer, "updated", &format_time(&self.updated));

        for link in &self.links {
            write_link(&mut writer, link);
        }

        for entry in &self.entries {
            write_entry(&mut writer, entry);
        }

        let _ = writer.write_event(Event::End(BytesEnd::new("feed")));

        String::from_utf8(writer.into_inner().into_inner()).unwrap_or_default()
    }
}

/// Atom timestamp, second precision in UTC.
fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Write a simple text element.
fn write_text_element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, text: &str) {
    let _ = writer.write_event(Event::Start(BytesStart::new(name)));
    let _ = writer.write_event(Event::Text(BytesText::new(text)));
    let _ = writer.write_event(Event::End(BytesEnd::new(name)));
}

/// Write a link element.
fn write_link<W: std::io::Write>(writer: &mut Writer<W>, link: &Link) {
    let mut elem = BytesStart::new("link");
    elem.push_attribute(("rel", link.rel.as_str()));
    elem.push_attribute(("href", link.href.as_str()));
    elem.push_attribute(("type", link.link_type.as_str()));
    let _ = writer.write_event(Event::Empty(elem));
}

/// Write an entry element.
fn write_entry<W: std::io::Write>(writer: &mut Writer<W>, entry: &Entry) {
    let _ = writer.write_event(Event::Start(BytesStart::new("entry")));

    write_text_element(writer, "title", &entry.title);
    write_text_element(writer, "id", &entry.id);
    write_text_element(writer, "updated", &format_time(&entry.updated));

    for link in &entry.links {
        write_link(writer, link);
    }

    let _ = writer.write_event(Event::End(BytesEnd::new("entry")));
}
