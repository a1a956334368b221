//! Call-automation callback handler.
//!
//! The telephony platform posts call lifecycle events (connected,
//! disconnected, media subscription changes) to a per-call callback URL.
//! The relay acknowledges them; the call itself is driven entirely over the
//! media WebSocket.

use axum::Json;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Query parameters attached to the callback URL at admission time.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CallbackQuery {
    /// Caller identifier
    #[serde(rename = "callerId")]
    pub caller_id: Option<String>,
}

/// Acknowledge call lifecycle events.
///
/// `POST /api/callbacks/{context_id}/{source_number}`
pub async fn callbacks_handler(
    Path((context_id, source_number)): Path<(String, String)>,
    Query(query): Query<CallbackQuery>,
    Json(events): Json<Value>,
) -> StatusCode {
    let events = match events {
        Value::Array(events) => events,
        single => vec![single],
    };

    for event in &events {
        let event_type = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(
            context_id,
            source_number,
            caller_id = ?query.caller_id,
            event_type,
            "Call event received"
        );
        debug!(?event, "Call event payload");
    }

    StatusCode::OK
}
