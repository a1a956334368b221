//! Message transformation between the media peer and the model.
//!
//! Both directions are expressed as pure-ish transformers that turn one raw
//! incoming message into an ordered list of sends. The bridge applies the
//! list strictly in order, which is what gives the relay its ordering
//! guarantees: audio deltas come out in arrival order, and a stop-audio
//! frame always precedes any audio of the turn that follows it.
//!
//! The pending-call table lives inside [`OutboundTransformer`], which is
//! owned by the model-to-client pump task. That single-writer ownership is
//! the concurrency story: no lock, no cross-task sharing.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, trace, warn};

use super::greeting::Greeting;
use super::media::{InboundMediaFrame, OutboundMediaFrame, ToolResponseExtension};
use super::messages::{
    ClientEvent, ConversationItem, ServerEvent, SessionConfig, TurnDetection,
};
use super::policy::SessionPolicy;
use super::tools::{PendingToolCall, ToolDestination, ToolRegistry};

/// One ordered send produced by a transformer.
#[derive(Debug)]
pub enum RelayAction {
    /// JSON text frame for the media peer
    ToClient(String),
    /// Event for the model socket
    ToModel(ClientEvent),
}

// =============================================================================
// Inbound (media peer -> model)
// =============================================================================

/// Transform one media frame into a model event.
///
/// Audio frames are the hot path and map one-to-one onto buffer appends.
/// Every other frame kind is logged and dropped, and malformed frames never
/// terminate the call.
pub fn process_inbound(raw: &str) -> Option<ClientEvent> {
    match serde_json::from_str::<InboundMediaFrame>(raw) {
        Ok(InboundMediaFrame::AudioData { audio_data }) => {
            Some(ClientEvent::audio_append(audio_data.data))
        }
        Ok(frame) => {
            debug!(?frame, "Dropping non-audio media frame");
            None
        }
        Err(e) => {
            warn!("Dropping malformed media frame: {e}");
            None
        }
    }
}

// =============================================================================
// Outbound (model -> media peer)
// =============================================================================

/// Transforms model events before they reach the media peer.
///
/// Holds the pending-call table and is the only writer to it.
pub struct OutboundTransformer {
    policy: Arc<SessionPolicy>,
    registry: Arc<ToolRegistry>,
    greeting: Option<Greeting>,
    pending: HashMap<String, PendingToolCall>,
}

impl OutboundTransformer {
    /// New transformer for one call.
    pub fn new(
        policy: Arc<SessionPolicy>,
        registry: Arc<ToolRegistry>,
        greeting: Option<Greeting>,
    ) -> Self {
        OutboundTransformer {
            policy,
            registry,
            greeting,
            pending: HashMap::new(),
        }
    }

    /// Number of outstanding tool calls.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Process one raw model message into ordered sends.
    ///
    /// Kinds outside the dispatch table pass through to the peer unchanged.
    pub async fn process(&mut self, raw: &str) -> Vec<RelayAction> {
        let event = match serde_json::from_str::<ServerEvent>(raw) {
            Ok(event) => event,
            Err(_) => {
                trace!("Forwarding unhandled model event");
                return vec![RelayAction::ToClient(raw.to_string())];
            }
        };

        match event {
            ServerEvent::SessionCreated { mut session } => {
                self.policy.sanitize_created(&mut session);
                let announcement = json!({
                    "type": "session.created",
                    "session": session,
                });

                let mut turn_config = SessionConfig {
                    turn_detection: Some(TurnDetection::server_vad()),
                    ..Default::default()
                };
                self.policy.apply(&mut turn_config, &self.registry);

                let mut actions = vec![
                    RelayAction::ToClient(announcement.to_string()),
                    RelayAction::ToModel(ClientEvent::SessionUpdate {
                        session: turn_config,
                    }),
                ];
                if let Some(greeting) = &self.greeting {
                    debug!("Enqueueing greeting audio");
                    actions.push(RelayAction::ToModel(greeting.append_event()));
                }
                actions
            }

            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                debug!(?audio_start_ms, "Speech started, halting playback");
                let frame = OutboundMediaFrame::stop_audio();
                vec![RelayAction::ToClient(to_json(&frame))]
            }

            ServerEvent::ConversationItemCreated {
                previous_item_id,
                item,
            } => {
                if item.is_function_call() {
                    if let Some(call_id) = &item.call_id {
                        self.pending
                            .entry(call_id.clone())
                            .or_insert_with(|| PendingToolCall {
                                call_id: call_id.clone(),
                                previous_item_id,
                            });
                    }
                    Vec::new()
                } else if item.is_function_call_output() {
                    Vec::new()
                } else {
                    vec![RelayAction::ToClient(raw.to_string())]
                }
            }

            ServerEvent::OutputItemAdded { item } => {
                if item.is_function_call() {
                    Vec::new()
                } else {
                    vec![RelayAction::ToClient(raw.to_string())]
                }
            }

            ServerEvent::FunctionCallArgumentsDelta {}
            | ServerEvent::FunctionCallArgumentsDone {} => Vec::new(),

            ServerEvent::OutputItemDone { item } => {
                if item.is_function_call() {
                    self.dispatch_tool_call(item).await
                } else {
                    vec![RelayAction::ToClient(raw.to_string())]
                }
            }

            ServerEvent::ResponseDone { response } => {
                let mut actions = Vec::new();
                if !self.pending.is_empty() {
                    // The model may be stalled waiting on a tool result;
                    // chaining across responses is the model's job.
                    self.pending.clear();
                    actions.push(RelayAction::ToModel(ClientEvent::ResponseCreate));
                }

                let has_call_records = response.output.iter().any(|o| o.is_function_call());
                if has_call_records {
                    let mut stripped = response;
                    stripped.output.retain(|o| !o.is_function_call());
                    let message = json!({
                        "type": "response.done",
                        "response": stripped,
                    });
                    actions.push(RelayAction::ToClient(message.to_string()));
                } else {
                    actions.push(RelayAction::ToClient(raw.to_string()));
                }
                actions
            }

            ServerEvent::AudioDelta { delta } => {
                let frame = OutboundMediaFrame::audio(delta);
                vec![RelayAction::ToClient(to_json(&frame))]
            }
        }
    }

    /// Invoke the tool named by a completed function-call item.
    ///
    /// A failing tool never crashes the relay: the model gets an output item
    /// either way so the turn can close.
    async fn dispatch_tool_call(&mut self, item: ConversationItem) -> Vec<RelayAction> {
        let Some(call_id) = item.call_id.clone() else {
            warn!("Function call item without call_id, suppressing");
            return Vec::new();
        };
        let name = item.name.clone().unwrap_or_default();
        let pending = self.pending.remove(&call_id);
        if pending.is_none() {
            warn!(call_id, "Completed tool call was never recorded as pending");
        }

        let result = match self.registry.get(&name) {
            Some(tool) => {
                let arguments = item
                    .arguments
                    .as_deref()
                    .map(serde_json::from_str)
                    .unwrap_or(Ok(serde_json::Value::Null));
                match arguments {
                    Ok(args) => tool.invoke(args).await,
                    Err(e) => Err(anyhow::anyhow!("unparseable tool arguments: {e}")),
                }
            }
            None => Err(anyhow::anyhow!("unknown tool: {name}")),
        };

        match result {
            Ok(result) => {
                let to_model_text = match result.destination {
                    ToolDestination::ToModel => result.to_text().to_string(),
                    // The model still needs an output item to close the turn.
                    ToolDestination::ToClient => String::new(),
                };
                let mut actions = vec![RelayAction::ToModel(ClientEvent::ConversationItemCreate {
                    item: ConversationItem::function_call_output(call_id, to_model_text),
                })];
                if result.destination == ToolDestination::ToClient {
                    let extension = ToolResponseExtension::new(
                        pending.and_then(|p| p.previous_item_id),
                        name,
                        result.to_text(),
                    );
                    actions.push(RelayAction::ToClient(to_json(&extension)));
                }
                actions
            }
            Err(e) => {
                error!(tool = name, "Tool invocation failed: {e:#}");
                let output = format!("Error: tool '{name}' failed: {e}");
                vec![RelayAction::ToModel(ClientEvent::ConversationItemCreate {
                    item: ConversationItem::function_call_output(call_id, output),
                })]
            }
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    // The relay's own message types serialize infallibly.
    serde_json::to_string(value).unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::relay::messages::ToolDef;
    use crate::core::relay::tools::{Tool, ToolResult};
    use bytes::Bytes;
    use serde_json::Value;

    fn transformer(registry: ToolRegistry, greeting: Option<Greeting>) -> OutboundTransformer {
        OutboundTransformer::new(
            Arc::new(SessionPolicy {
                voice: Some("sage".to_string()),
                ..Default::default()
            }),
            Arc::new(registry),
            greeting,
        )
    }

    fn tool(name: &str, destination: ToolDestination) -> Tool {
        Tool::new(
            ToolDef {
                tool_type: "function".to_string(),
                name: name.to_string(),
                description: None,
                parameters: None,
            },
            Arc::new(move |args| {
                Box::pin(async move { Ok(ToolResult::json(&args, destination)) })
            }),
        )
    }

    fn function_call_created(call_id: &str, previous: &str) -> String {
        json!({
            "type": "conversation.item.created",
            "previous_item_id": previous,
            "item": {"id": "fc_item", "type": "function_call", "call_id": call_id, "name": "probe"}
        })
        .to_string()
    }

    #[test]
    fn test_inbound_audio_becomes_buffer_append() {
        let event =
            process_inbound(r#"{"kind":"AudioData","audioData":{"data":"QUJD"}}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"input_audio_buffer.append","audio":"QUJD"}"#
        );
    }

    #[test]
    fn test_inbound_non_audio_and_malformed_are_dropped() {
        assert!(process_inbound(r#"{"kind":"AudioMetadata","audioMetadata":{}}"#).is_none());
        assert!(process_inbound(r#"{"kind":"DtmfData","dtmfData":{"data":"5"}}"#).is_none());
        assert!(process_inbound("not json at all").is_none());
        assert!(process_inbound(r#"{"kind":"AudioData"}"#).is_none());
    }

    #[tokio::test]
    async fn test_session_created_sanitizes_then_configures_then_greets() {
        let mut tx = transformer(
            ToolRegistry::new(),
            Some(Greeting::from_pcm(Bytes::from_static(b"ABC"))),
        );
        let raw = json!({
            "type": "session.created",
            "session": {
                "id": "sess_1",
                "instructions": "secret prompt",
                "voice": "alloy",
                "tools": [{"type": "function", "name": "hidden"}],
                "tool_choice": "auto",
                "max_response_output_tokens": 200
            }
        })
        .to_string();

        let actions = tx.process(&raw).await;
        assert_eq!(actions.len(), 3);

        let RelayAction::ToClient(announcement) = &actions[0] else {
            panic!("expected sanitized announcement first");
        };
        let value: Value = serde_json::from_str(announcement).unwrap();
        assert_eq!(value["type"], "session.created");
        assert_eq!(value["session"]["instructions"], "");
        assert_eq!(value["session"]["tools"], json!([]));
        assert_eq!(value["session"]["tool_choice"], "none");
        assert_eq!(value["session"]["voice"], "sage");
        assert_eq!(value["session"]["max_response_output_tokens"], Value::Null);
        assert_eq!(value["session"]["id"], "sess_1");

        let RelayAction::ToModel(ClientEvent::SessionUpdate { session }) = &actions[1] else {
            panic!("expected session.update second");
        };
        assert!(matches!(
            session.turn_detection,
            Some(TurnDetection::ServerVad { .. })
        ));
        assert_eq!(session.tool_choice.as_deref(), Some("none"));

        let RelayAction::ToModel(ClientEvent::InputAudioBufferAppend { audio, event_id }) =
            &actions[2]
        else {
            panic!("expected greeting append third");
        };
        assert_eq!(audio, "QUJD");
        assert_eq!(event_id.as_deref(), Some("greeting"));
    }

    #[tokio::test]
    async fn test_audio_deltas_forward_in_order() {
        let mut tx = transformer(ToolRegistry::new(), None);
        let mut frames = Vec::new();
        for delta in ["ZDE=", "ZDI=", "ZDM="] {
            let raw = json!({"type": "response.audio.delta", "delta": delta}).to_string();
            let actions = tx.process(&raw).await;
            assert_eq!(actions.len(), 1);
            match &actions[0] {
                RelayAction::ToClient(frame) => frames.push(frame.clone()),
                other => panic!("unexpected action {other:?}"),
            }
        }
        for (frame, delta) in frames.iter().zip(["ZDE=", "ZDI=", "ZDM="]) {
            let value: Value = serde_json::from_str(frame).unwrap();
            assert_eq!(value["Kind"], "AudioData");
            assert_eq!(value["AudioData"]["Data"], delta);
        }
    }

    #[tokio::test]
    async fn test_speech_started_emits_stop_audio() {
        let mut tx = transformer(ToolRegistry::new(), None);
        let raw = json!({
            "type": "input_audio_buffer.speech_started",
            "audio_start_ms": 10,
            "item_id": "item_1"
        })
        .to_string();
        let actions = tx.process(&raw).await;
        assert_eq!(actions.len(), 1);
        let RelayAction::ToClient(frame) = &actions[0] else {
            panic!("expected stop-audio frame");
        };
        assert_eq!(
            frame,
            r#"{"Kind":"StopAudio","AudioData":null,"StopAudio":{}}"#
        );
    }

    #[tokio::test]
    async fn test_function_call_lifecycle_to_model() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("probe", ToolDestination::ToModel));
        let mut tx = transformer(registry, None);

        let actions = tx.process(&function_call_created("call_1", "item_0")).await;
        assert!(actions.is_empty());
        assert_eq!(tx.pending_calls(), 1);

        let done = json!({
            "type": "response.output_item.done",
            "item": {
                "id": "fc_item",
                "type": "function_call",
                "call_id": "call_1",
                "name": "probe",
                "arguments": "{\"q\":7}"
            }
        })
        .to_string();
        let actions = tx.process(&done).await;
        assert_eq!(tx.pending_calls(), 0);
        assert_eq!(actions.len(), 1);

        let RelayAction::ToModel(ClientEvent::ConversationItemCreate { item }) = &actions[0]
        else {
            panic!("expected function_call_output upstream");
        };
        assert_eq!(item.call_id.as_deref(), Some("call_1"));
        assert_eq!(item.output.as_deref(), Some(r#"{"q":7}"#));
    }

    #[tokio::test]
    async fn test_function_call_lifecycle_to_client() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("probe", ToolDestination::ToClient));
        let mut tx = transformer(registry, None);

        tx.process(&function_call_created("call_2", "item_5")).await;
        let done = json!({
            "type": "response.output_item.done",
            "item": {
                "type": "function_call",
                "call_id": "call_2",
                "name": "probe",
                "arguments": "\"ok\""
            }
        })
        .to_string();
        let actions = tx.process(&done).await;
        assert_eq!(actions.len(), 2);

        let RelayAction::ToModel(ClientEvent::ConversationItemCreate { item }) = &actions[0]
        else {
            panic!("expected output item upstream first");
        };
        assert_eq!(item.output.as_deref(), Some(""));

        let RelayAction::ToClient(extension) = &actions[1] else {
            panic!("expected extension message second");
        };
        let value: Value = serde_json::from_str(extension).unwrap();
        assert_eq!(value["type"], "extension.middle_tier_tool_response");
        assert_eq!(value["previous_item_id"], "item_5");
        assert_eq!(value["tool_name"], "probe");
        assert_eq!(value["tool_result"], "ok");
    }

    #[tokio::test]
    async fn test_failing_tool_closes_turn_with_error_output() {
        let mut registry = ToolRegistry::new();
        registry.register(Tool::new(
            ToolDef {
                tool_type: "function".to_string(),
                name: "broken".to_string(),
                description: None,
                parameters: None,
            },
            Arc::new(|_| Box::pin(async { Err(anyhow::anyhow!("backend down")) })),
        ));
        let mut tx = transformer(registry, None);

        let done = json!({
            "type": "response.output_item.done",
            "item": {"type": "function_call", "call_id": "call_3", "name": "broken", "arguments": "{}"}
        })
        .to_string();
        let actions = tx.process(&done).await;
        assert_eq!(actions.len(), 1);
        let RelayAction::ToModel(ClientEvent::ConversationItemCreate { item }) = &actions[0]
        else {
            panic!("expected recovery output item");
        };
        let output = item.output.as_deref().unwrap();
        assert!(output.contains("backend down"), "got: {output}");
    }

    #[tokio::test]
    async fn test_response_done_clears_pending_and_continues() {
        let mut tx = transformer(ToolRegistry::new(), None);
        tx.process(&function_call_created("call_a", "item_1")).await;
        tx.process(&function_call_created("call_b", "item_2")).await;
        assert_eq!(tx.pending_calls(), 2);

        let raw = json!({
            "type": "response.done",
            "response": {"id": "resp_1", "status": "completed", "output": []}
        })
        .to_string();
        let actions = tx.process(&raw).await;
        assert_eq!(tx.pending_calls(), 0);
        assert_eq!(actions.len(), 2);
        assert!(matches!(
            actions[0],
            RelayAction::ToModel(ClientEvent::ResponseCreate)
        ));
        assert!(matches!(actions[1], RelayAction::ToClient(_)));
    }

    #[tokio::test]
    async fn test_response_done_strips_function_call_records() {
        let mut tx = transformer(ToolRegistry::new(), None);
        let raw = json!({
            "type": "response.done",
            "response": {
                "id": "resp_2",
                "status": "completed",
                "output": [
                    {"id": "m1", "type": "message", "role": "assistant"},
                    {"id": "f1", "type": "function_call", "call_id": "call_x", "name": "probe"}
                ]
            }
        })
        .to_string();
        let actions = tx.process(&raw).await;
        assert_eq!(actions.len(), 1);
        let RelayAction::ToClient(message) = &actions[0] else {
            panic!("expected forwarded response.done");
        };
        let value: Value = serde_json::from_str(message).unwrap();
        let output = value["response"]["output"].as_array().unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0]["type"], "message");
        // Unmodelled response fields survive the strip
        assert_eq!(value["response"]["id"], "resp_2");
        assert_eq!(value["response"]["status"], "completed");
    }

    #[tokio::test]
    async fn test_argument_streaming_is_never_client_visible() {
        let mut tx = transformer(ToolRegistry::new(), None);
        let delta = json!({
            "type": "response.function_call_arguments.delta",
            "call_id": "call_1",
            "delta": "{\"q\""
        })
        .to_string();
        assert!(tx.process(&delta).await.is_empty());

        let done = json!({
            "type": "response.function_call_arguments.done",
            "call_id": "call_1",
            "arguments": "{\"q\":1}"
        })
        .to_string();
        assert!(tx.process(&done).await.is_empty());

        let added = json!({
            "type": "response.output_item.added",
            "item": {"type": "function_call", "call_id": "call_1", "name": "probe"}
        })
        .to_string();
        assert!(tx.process(&added).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kinds_pass_through_unchanged() {
        let mut tx = transformer(ToolRegistry::new(), None);
        let raw = r#"{"type":"response.audio_transcript.delta","delta":"Hel"}"#;
        let actions = tx.process(raw).await;
        assert_eq!(actions.len(), 1);
        let RelayAction::ToClient(forwarded) = &actions[0] else {
            panic!("expected pass-through");
        };
        assert_eq!(forwarded, raw);
    }
}
