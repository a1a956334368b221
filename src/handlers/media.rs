//! Media-streaming WebSocket handler.
//!
//! Accepts the telephony media connection and hands it to the per-call
//! bridge. Call identity arrives in the upgrade query string.

use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tracing::{error, info};

use crate::core::relay::bridge::{CallContext, run_call};
use crate::state::AppState;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Call identity carried in the upgrade query string.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MediaQuery {
    /// Caller identifier
    #[serde(rename = "callerId")]
    pub caller_id: Option<String>,
    /// Dialed number
    #[serde(rename = "targetNumber")]
    pub target_number: Option<String>,
    /// Correlation id assigned at admission
    #[serde(rename = "callContextId")]
    pub call_context_id: Option<String>,
}

/// Media WebSocket handler.
///
/// Upgrades the HTTP connection and bridges the call to the model endpoint.
pub async fn media_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<MediaQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!(
        caller_id = ?query.caller_id,
        target_number = ?query.target_number,
        "Media WebSocket upgrade requested"
    );

    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state, query))
}

async fn handle_media_socket(socket: WebSocket, state: Arc<AppState>, query: MediaQuery) {
    // Calls admitted without a context id still get a correlation id in logs
    let call_context_id = query
        .call_context_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let ctx = CallContext {
        caller_id: query.caller_id,
        target_number: query.target_number,
        call_context_id: Some(call_context_id),
    };

    if let Err(e) = run_call(socket, state.relay.clone(), ctx).await {
        error!("Call could not be bridged: {e}");
    }
}
