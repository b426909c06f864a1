//! Evalgate server library.
//!
//! Axum-based HTTP surface over the evaluation pipeline: health reporting,
//! admin revalidation, and the evaluation endpoint itself.

pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::api_routes;
pub use state::AppState;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ─────────────────────────────────────────────
// Integration tests
// ─────────────────────────────────────────────
