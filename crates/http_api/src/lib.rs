mod errors;
mod handlers;
mod middleware;
mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

pub use errors::HttpError;
pub use state::HttpState;

/// `/api` JSON routes plus the raw data directory as static files.
pub fn router(state: HttpState) -> Router<()> {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/cards", get(handlers::cards))
        .route("/series", get(handlers::series))
        .route("/projects", get(handlers::projects))
        .route("/scopes", get(handlers::scopes))
        .route("/live", get(handlers::live))
        .route("/account", get(handlers::account))
        .route("/sync_status", get(handlers::sync_status))
        .route("/sync", post(handlers::sync))
        .route_layer(axum_middleware::from_fn(middleware::require_loopback_origin));

    let data_files = ServeDir::new(state.context.data_dir());
    Router::new()
        .nest("/api", api)
        .fallback_service(data_files)
        .with_state(state)
}
