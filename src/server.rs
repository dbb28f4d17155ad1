//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/opds", get(handlers::catalog))
        .route("/opds/", get(handlers::catalog))
        .route("/cover/{id}", get(handlers::cover))
        .route("/download/{*target}", get(handlers::download))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
