//! Per-call bridge between the accepted media WebSocket and the model.
//!
//! One bridge runs per accepted call. It opens the model connection, then
//! drives two pumps until either side closes:
//!
//! - client-to-model: media frames become input-buffer appends
//! - model-to-client: model events pass through the outbound transformer
//!
//! Writes to the model socket go through an mpsc channel drained by a
//! dedicated writer task, so both pumps can enqueue model events without
//! sharing the sink. The client sink is written only by the
//! model-to-client pump.

use std::sync::Arc;

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as ModelMessage;
use tracing::{debug, error, info, warn};

use crate::errors::RelayResult;

use super::greeting::Greeting;
use super::policy::SessionPolicy;
use super::tools::ToolRegistry;
use super::transform::{OutboundTransformer, RelayAction, process_inbound};
use super::upstream::UpstreamConfig;

/// Buffer size of the model-writer channel.
const MODEL_CHANNEL_SIZE: usize = 1024;

/// Frames routed to the model-writer task.
enum ModelRoute {
    /// Serialized client event
    Event(super::messages::ClientEvent),
    /// Half-close of the model connection
    Close,
}

/// Identity of one accepted call, taken from the upgrade query string.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Caller identifier, when the admission layer passed one through
    pub caller_id: Option<String>,
    /// Dialed number
    pub target_number: Option<String>,
    /// Opaque correlation id assigned at admission
    pub call_context_id: Option<String>,
}

/// Shared per-process pieces a bridge needs, built once at startup.
#[derive(Clone)]
pub struct RelayConfig {
    /// Model endpoint and credentials
    pub upstream: UpstreamConfig,
    /// Server-side session policy
    pub policy: Arc<SessionPolicy>,
    /// Registered tools
    pub tools: Arc<ToolRegistry>,
    /// Greeting audio, when configured
    pub greeting: Option<Greeting>,
}

/// Run one call to completion.
///
/// Returns `Err` only when the model connection cannot be established; once
/// both sockets are up, every termination path is normal and returns `Ok`.
pub async fn run_call(socket: WebSocket, config: RelayConfig, ctx: CallContext) -> RelayResult<()> {
    info!(
        caller_id = ?ctx.caller_id,
        call_context_id = ?ctx.call_context_id,
        "Bridging call to model endpoint"
    );

    let upstream = config.upstream.connect().await?;

    let (mut client_sink, mut client_stream) = socket.split();
    let (mut model_sink, mut model_stream) = upstream.split();
    let (model_tx, mut model_rx) = mpsc::channel::<ModelRoute>(MODEL_CHANNEL_SIZE);

    // Writer task: sole owner of the model sink.
    let writer_task = tokio::spawn(async move {
        while let Some(route) = model_rx.recv().await {
            let result = match route {
                ModelRoute::Event(event) => match serde_json::to_string(&event) {
                    Ok(json) => model_sink.send(ModelMessage::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize model event: {e}");
                        continue;
                    }
                },
                ModelRoute::Close => {
                    debug!("Closing model connection");
                    let _ = model_sink.send(ModelMessage::Close(None)).await;
                    break;
                }
            };
            if let Err(e) = result {
                // The model side going away is handled by the outbound pump.
                debug!("Model send failed: {e}");
                break;
            }
        }
    });

    // Client-to-model pump.
    let inbound_tx = model_tx.clone();
    let inbound_task = tokio::spawn(async move {
        while let Some(msg) = client_stream.next().await {
            match msg {
                Ok(ClientMessage::Text(text)) => {
                    if let Some(event) = process_inbound(&text)
                        && inbound_tx.send(ModelRoute::Event(event)).await.is_err()
                    {
                        break;
                    }
                }
                Ok(ClientMessage::Close(_)) => {
                    info!("Media peer closed the call");
                    break;
                }
                Ok(ClientMessage::Ping(_)) | Ok(ClientMessage::Pong(_)) => {}
                Ok(ClientMessage::Binary(_)) => {
                    debug!("Dropping unexpected binary frame from media peer");
                }
                Err(e) => {
                    // Abrupt resets after hangup are routine for telephony peers.
                    debug!("Media socket ended: {e}");
                    break;
                }
            }
        }
        let _ = inbound_tx.send(ModelRoute::Close).await;
    });

    // Model-to-client pump, owner of the transformer and the pending table.
    let mut transformer =
        OutboundTransformer::new(config.policy, config.tools, config.greeting);
    while let Some(msg) = model_stream.next().await {
        match msg {
            Ok(ModelMessage::Text(text)) => {
                let mut closed = false;
                for action in transformer.process(&text).await {
                    match action {
                        RelayAction::ToClient(json) => {
                            if client_sink.send(ClientMessage::Text(json.into())).await.is_err() {
                                closed = true;
                                break;
                            }
                        }
                        RelayAction::ToModel(event) => {
                            if model_tx.send(ModelRoute::Event(event)).await.is_err() {
                                closed = true;
                                break;
                            }
                        }
                    }
                }
                if closed {
                    break;
                }
            }
            Ok(ModelMessage::Close(_)) => {
                info!("Model closed the session");
                break;
            }
            Ok(ModelMessage::Ping(_)) | Ok(ModelMessage::Pong(_)) => {}
            Ok(other) => {
                debug!("Ignoring non-text model frame: {other:?}");
            }
            Err(e) => {
                warn!("Model socket ended: {e}");
                break;
            }
        }
    }

    // Tear down whichever side is still up.
    let _ = model_tx.send(ModelRoute::Close).await;
    let _ = client_sink.send(ClientMessage::Close(None)).await;
    inbound_task.abort();
    let _ = writer_task.await;

    info!(call_context_id = ?ctx.call_context_id, "Call terminated");
    Ok(())
}
