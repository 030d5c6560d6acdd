//! GeoWPS Service Library
//!
//! HTTP handlers and router for the WPS demo server.
//! This library is used by both the geowps-service binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use geowps::WpsService;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use url::Url;

/// Application state shared across handlers.
pub struct AppState {
    /// WPS facade and result cache.
    pub wps: WpsService,
    /// Base URL used when a request carries no usable `Host` header.
    pub base_url: Url,
    /// Include error details in processing exception reports.
    pub debug: bool,
}

impl AppState {
    /// Create state for a server reachable at `http://<listen>/`.
    pub fn new(wps: WpsService, listen: &str, debug: bool) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&format!("http://{}/", listen))?;
        Ok(Self {
            wps,
            base_url,
            debug,
        })
    }
}

/// Build the router with every route and middleware attached.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/wps", get(handlers::wps_get).post(handlers::wps_post))
        .route("/datafile/:id", get(handlers::datafile))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
