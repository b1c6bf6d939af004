//! HTTP surface of the research assistant
//!
//! Serves the single-page form, starts runs on background tasks and exposes
//! progress polling plus the rendered and downloadable report. Every request
//! is tied to a browser session through the `X-Session-ID` header.

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/research", post(handlers::start_research))
        .route("/api/research/status", get(handlers::research_status))
        .route("/api/research/report", get(handlers::report))
        .route("/api/research/report/download", get(handlers::download_report))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
