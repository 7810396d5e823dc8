use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{answer, health};
use crate::state::AppState;

/// Creates the application router: health check and the answer endpoint,
/// with HTTP request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/answer", post(answer::answer))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
