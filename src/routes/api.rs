//! Plain HTTP route configuration.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, callbacks};
use crate::state::AppState;

/// Create the HTTP API router.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_handler))
        .route(
            "/api/callbacks/{context_id}/{source_number}",
            post(callbacks::callbacks_handler),
        )
        .layer(TraceLayer::new_for_http())
}
