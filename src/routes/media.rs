//! Media WebSocket route configuration.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media::media_handler;
use crate::state::AppState;

/// Create the media WebSocket router.
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for the telephony media stream
///
/// Call identity is carried in the query string (`callerId`, `targetNumber`,
/// `callContextId`). After the upgrade the peer sends JSON media frames and
/// receives audio and stop-audio frames back.
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(media_handler))
        .layer(TraceLayer::new_for_http())
}
