//! `GET <proxy-path>?url=<target>`: relays HLS playlists (rewritten) and
//! media segments (streamed) from third-party origins.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use tracing::{info, warn};
use url::Url;

use crate::error::{AppError, AppResult};
use crate::fetcher::OriginResponse;
use crate::media_type::{classify, target_kind, TargetKind};
use crate::metrics::record_proxy_request;
use crate::rewrite::rewrite_manifest;
use crate::AppState;

/// Upstream headers copied onto streamed responses.
const PASSTHROUGH_HEADERS: [header::HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
];

/// First `url` query parameter, percent-decoded. Empty counts as missing.
fn target_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Validate the requested target: absolute, http or https.
pub fn parse_target(query: Option<&str>) -> AppResult<Url> {
    let raw = target_param(query).ok_or_else(|| AppError::bad_request("Missing url parameter"))?;
    let target = Url::parse(&raw).map_err(|_| AppError::bad_request("Invalid URL"))?;
    match target.scheme() {
        "http" | "https" => Ok(target),
        _ => Err(AppError::bad_request("Only HTTP/HTTPS URLs allowed")),
    }
}

fn outcome_label(err: &AppError) -> &'static str {
    match err {
        AppError::BadRequest(_) => "bad_request",
        AppError::UpstreamTimeout => "timeout",
        _ => "upstream_error",
    }
}

pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> AppResult<Response> {
    let target = match parse_target(query.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            record_proxy_request("invalid", outcome_label(&e));
            return Err(e);
        }
    };
    let kind = target_kind(&target);
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    info!(
        "HTTP proxy request: kind={} url={} Range=\"{}\"",
        kind.as_str(),
        target,
        range.unwrap_or("<none>")
    );

    let result = match state.fetcher.fetch(&target, range).await {
        Ok(upstream) => match kind {
            TargetKind::Manifest => manifest_response(&state, &target, upstream).await,
            TargetKind::Passthrough => stream_response(&target, upstream),
        },
        Err(e) => Err(e.into()),
    };

    match &result {
        Ok(_) => record_proxy_request(kind.as_str(), "ok"),
        Err(e) => {
            warn!("Proxy error: url={} err={}", target, e);
            record_proxy_request(kind.as_str(), outcome_label(e));
        }
    }
    result
}

async fn manifest_response(
    state: &AppState,
    target: &Url,
    upstream: OriginResponse,
) -> AppResult<Response> {
    let content_type = classify(target, upstream.content_type());
    let body = upstream.text().await.map_err(AppError::from)?;
    let rewritten = rewrite_manifest(&body, target.as_str(), &state.proxy_path);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(rewritten))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn stream_response(target: &Url, upstream: OriginResponse) -> AppResult<Response> {
    let content_type = classify(target, upstream.content_type());
    let mut builder = Response::builder()
        .status(upstream.status())
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache");
    for name in PASSTHROUGH_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            builder = builder.header(name, value.clone());
        }
    }

    builder
        .body(Body::from_stream(upstream.into_stream()))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let target = parse_target(Some("url=https%3A%2F%2Fx%2Fy.m3u8")).unwrap();
        assert_eq!(target.as_str(), "https://x/y.m3u8");

        assert!(matches!(parse_target(None), Err(AppError::BadRequest(m)) if m == "Missing url parameter"));
        assert!(matches!(parse_target(Some("url=")), Err(AppError::BadRequest(m)) if m == "Missing url parameter"));
        assert!(matches!(parse_target(Some("other=1")), Err(AppError::BadRequest(m)) if m == "Missing url parameter"));
        assert!(matches!(parse_target(Some("url=not%20a%20url")), Err(AppError::BadRequest(m)) if m == "Invalid URL"));
        assert!(matches!(
            parse_target(Some("url=ftp%3A%2F%2Fx%2Fy.ts")),
            Err(AppError::BadRequest(m)) if m == "Only HTTP/HTTPS URLs allowed"
        ));
    }

    #[test]
    fn test_first_url_param_wins() {
        let target = parse_target(Some("url=http%3A%2F%2Fa%2F1.ts&url=http%3A%2F%2Fb%2F2.ts")).unwrap();
        assert_eq!(target.host_str(), Some("a"));
    }
}
