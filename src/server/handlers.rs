//! HTTP request handlers.

use crate::cache::CoverStatus;
use crate::config::BookFormat;
use crate::error::Result;
use crate::opds::{ACQUISITION_MIME, FeedBuilder};
use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// Build a response, returning 500 on error (which shouldn't happen).
fn build_response(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("Internal error"))
                .unwrap_or_default()
        })
}

/// Landing page linking to the catalog.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
</head>
<body>
    <h1>{title}</h1>
    <p><a href="{base}/opds">OPDS Catalog</a></p>
</body>
</html>"#,
        title = escape_html(&state.config.server.title),
        base = state.base_url(),
    );

    Html(html)
}

/// Acquisition feed of every book.
pub async fn catalog(State(state): State<AppState>) -> Result<Response<Body>> {
    let entries = state
        .with_library(|library| {
            let books = library.books()?;
            let covers = library.cover_statuses();
            Ok(books
                .into_iter()
                .map(|book| {
                    let cover = covers.get(&book.id).copied().unwrap_or(CoverStatus::Unknown);
                    (book, cover)
                })
                .collect::<Vec<(_, CoverStatus)>>())
        })
        .await?;

    let base_url = state.base_url();
    let mut feed = FeedBuilder::new("urn:opds:library", &state.config.server.title)
        .self_link(format!("{}/opds", base_url))
        .start_link(format!("{}/opds", base_url));

    for (book, cover) in &entries {
        feed = feed.book_entry(book, *cover, base_url);
    }

    Ok(build_response(StatusCode::OK, ACQUISITION_MIME, feed.build()))
}

/// Book cover image.
pub async fn cover(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response<Body>> {
    let cover = state
        .with_library(move |library| library.get_cover_bytes(&id))
        .await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, cover.mime)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(cover.data))
        .unwrap_or_else(|_| Response::default()))
}

/// Book download by id or by path relative to the book root.
pub async fn download(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Response<Body>> {
    let path = state
        .with_library(move |library| library.resolve_download(&target))
        .await?;

    let file = tokio::fs::File::open(&path).await?;
    let size = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    let mime = BookFormat::from_path(&path)
        .map(|f| f.mime_type())
        .unwrap_or("application/octet-stream");
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', "'"))
        .unwrap_or_else(|| "book".to_string());

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .header(header::CONTENT_LENGTH, size)
        .body(body)
        .unwrap_or_else(|_| Response::default()))
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    build_response(StatusCode::NOT_FOUND, "text/plain", "Not found")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
