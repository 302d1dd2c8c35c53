//! Open CORS policy applied to every response.
//!
//! The proxy and relay are unauthenticated and any origin may use them.
//! Access control belongs to the network layer.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const CORS_HEADERS: [(header::HeaderName, &str); 4] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Range"),
    (header::ACCESS_CONTROL_EXPOSE_HEADERS, "Content-Length, Content-Range"),
];

pub fn apply(headers: &mut HeaderMap) {
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Answers `OPTIONS` on any path with `204`, and stamps the CORS headers on
/// everything else.
pub async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    apply(response.headers_mut());
    response
}
