//! HTTP surface: router, shared state, CORS and serving.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/convert/document` | [`handlers::convert_document`] |
//! | POST | `/convert/image` | [`handlers::convert_image`] |
//! | GET | `/formats/{extension}` | [`handlers::formats`] |
//! | GET, HEAD | `/health` | [`handlers::health`] |

pub mod handlers;
pub mod upload;

use crate::config::ServerConfig;
use crate::convert::Converter;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// State shared by every request. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub converter: Arc<Converter>,
}

impl AppState {
    /// State with the real backends described by `config`.
    pub fn new(config: ServerConfig) -> Self {
        let converter = Converter::from_config(&config);
        Self::with_converter(config, converter)
    }

    /// State with caller-supplied backends.
    pub fn with_converter(config: ServerConfig, converter: Converter) -> Self {
        Self {
            config: Arc::new(config),
            converter: Arc::new(converter),
        }
    }
}

/// Build the router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/formats/{extension}", get(handlers::formats))
        .route("/convert/document", post(handlers::convert_document))
        .route("/convert/image", post(handlers::convert_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy from the configured origin allow-list.
///
/// Origins are validated by [`ServerConfigBuilder::build`]. Any that still
/// fail to parse are dropped; an allow-list that ends up empty admits no
/// cross-origin caller.
///
/// [`ServerConfigBuilder::build`]: crate::config::ServerConfigBuilder::build
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        warn!("No valid CORS origins configured, cross-origin requests will be refused");
    }
    base.allow_origin(origins)
}

/// Bind `state.config.bind_address` and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(&state.config.bind_address).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
