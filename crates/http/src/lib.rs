//! HTTP server for nbsim.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]
#![allow(clippy::exhaustive_structs, reason = "HTTP types are stable")]
#![allow(clippy::single_call_fn, reason = "Helper functions improve readability")]

pub mod api_error;
mod api_types;
mod handlers;
mod viewer;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use nbsim_core::constants::{DEFAULT_SERVICE_ORIGIN, GENERATE_ROUTE};
use nbsim_service::{GenerationService, StreamSettings};

pub use api_types::{GenerateResponse, VersionResponse};
pub use viewer::ServiceBackend;

/// Shared application state for all HTTP handlers.
pub struct AppState {
    pub service: Arc<GenerationService>,
    /// Polling and timeout settings of `/_stream`.
    pub stream_settings: StreamSettings,
    /// Public origin of this server, used to build frame sources on viewer pages.
    pub origin: String,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<GenerationService>) -> Self {
        Self {
            service,
            stream_settings: StreamSettings::default(),
            origin: DEFAULT_SERVICE_ORIGIN.to_owned(),
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    #[must_use]
    pub fn with_stream_settings(mut self, settings: StreamSettings) -> Self {
        self.stream_settings = settings;
        self
    }
}

/// Routes of the generation server.
///
/// Paths without a route are served from the generation directory; anything
/// not found there gets a viewer page for that path.
pub fn create_router(state: Arc<AppState>) -> Router {
    let pages: MethodRouter = get(viewer::serve_viewer_page).with_state(Arc::clone(&state));
    let artifacts = ServeDir::new(state.service.gen_dir()).fallback(pages);

    Router::new()
        .route(GENERATE_ROUTE, post(handlers::generate::generate))
        .route("/_stream/", get(handlers::stream::stream_notebook))
        .route("/_stream/{*path}", get(handlers::stream::stream_notebook))
        .route("/favicon.ico", get(favicon))
        .route("/health", get(health))
        .route("/api/version", get(version))
        .fallback_service(artifacts)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn favicon() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 favicon.ico")
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}
