pub mod channels;
pub mod cors;
pub mod error;
pub mod failover;
pub mod fetcher;
pub mod media_type;
pub mod metrics;
pub mod navigation;
pub mod protocol;
pub mod proxy;
pub mod relay;
pub mod remote_client;
pub mod rewrite;
pub mod settings;
pub mod static_files;
pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, FromRef, State, WebSocketUpgrade},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use channels::Channel;
use error::AppError;
use fetcher::OriginFetcher;
use relay::Relay;
use settings::{Mode, Settings};
use tracing::info;

const DEV_BANNER: &str = "tvrelay - Dev Mode\nServe the frontend separately.";

pub struct AppState {
    channels: Vec<Channel>,
    fetcher: OriginFetcher,
    relay: Relay,
    proxy_path: String,
    relay_colocated: bool,
    mode: Mode,
    static_dir: PathBuf,
}

impl FromRef<Arc<AppState>> for Relay {
    fn from_ref(state: &Arc<AppState>) -> Relay {
        state.relay.clone()
    }
}

/// Build the HTTP application: proxy, catalog API, metrics, static site and,
/// unless the relay has its own listener, the control relay.
pub fn create_app(settings: &Settings, channels: Vec<Channel>, relay: Relay) -> anyhow::Result<Router> {
    anyhow::ensure!(
        settings.proxy.path.starts_with('/'),
        "proxy.path must start with '/': {}",
        settings.proxy.path
    );
    anyhow::ensure!(
        settings.relay.path.starts_with('/') && settings.relay.path != settings.proxy.path,
        "relay.path must start with '/' and differ from proxy.path: {}",
        settings.relay.path
    );

    let fetcher = OriginFetcher::new(settings.proxy.user_agent.clone(), settings.proxy.timeout())?;
    let relay_colocated = settings.relay.colocated();
    let state = Arc::new(AppState {
        channels,
        fetcher,
        relay,
        proxy_path: settings.proxy.path.clone(),
        relay_colocated,
        mode: settings.server.mode,
        static_dir: settings.server.static_dir.clone(),
    });

    let mut router = Router::new()
        .route(&settings.proxy.path, get(proxy::proxy_handler))
        .route("/api/channels", get(channels_api_handler))
        .route("/metrics", get(metrics_handler));
    if relay_colocated {
        router = router.route(&settings.relay.path, get(ws::relay_handler));
    }

    Ok(router
        .fallback(site_handler)
        .layer(middleware::from_fn(cors::cors))
        .with_state(state))
}

/// Standalone relay listener: accepts upgrades on any path.
pub fn create_relay_app(relay: Relay) -> Router {
    Router::new()
        .fallback(ws::relay_handler)
        .layer(middleware::from_fn(cors::cors))
        .with_state(relay)
}

async fn channels_api_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Channel>> {
    Json(state.channels.clone())
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Everything not matched by a route: relay upgrades (when colocated), then
/// the static site or the development banner.
async fn site_handler(
    State(state): State<Arc<AppState>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if state.relay_colocated {
        if let Ok(ws) = upgrade {
            return ws::upgrade(ws, state.relay.clone());
        }
    }

    match state.mode {
        Mode::Development => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            DEV_BANNER,
        )
            .into_response(),
        Mode::Production => match static_files::serve(&state.static_dir, uri.path()).await {
            Ok(response) => response,
            Err(e) => {
                if matches!(e, AppError::NotFound) {
                    let user_agent = headers
                        .get(header::USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("<none>");
                    info!(
                        "HTTP 404: method={} uri={} UA=\"{}\"",
                        method,
                        uri,
                        user_agent
                    );
                }
                e.into_response()
            }
        },
    }
}
