//! Single-page application assets, served in production mode.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};

const INDEX: &str = "index.html";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("js", "application/javascript"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

pub fn mime_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

/// Map a request path onto a file below `root`. Extension-less paths are
/// client-side routes and get the index document. `None` for anything that
/// tries to leave `root`.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    if relative.as_os_str().is_empty() || relative.extension().is_none() {
        return Some(root.join(INDEX));
    }
    Some(root.join(relative))
}

async fn file_response(path: &Path) -> std::io::Result<Response> {
    let file = tokio::fs::File::open(path).await?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(std::io::Error::other(format!("not a regular file: {}", path.display())));
    }
    let len = metadata.len();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_for(path))
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(std::io::Error::other)?;
    Ok(response)
}

pub async fn serve(root: &Path, request_path: &str) -> AppResult<Response> {
    let Some(path) = resolve(root, request_path) else {
        return Err(AppError::NotFound);
    };

    match file_response(&path).await {
        Ok(response) => Ok(response),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            file_response(&root.join(INDEX)).await.map_err(|e| match e.kind() {
                ErrorKind::NotFound => AppError::NotFound,
                _ => AppError::Internal(e.to_string()),
            })
        }
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}
