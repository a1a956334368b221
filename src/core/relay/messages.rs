//! Model-side realtime protocol types.
//!
//! This module defines the JSON events exchanged with the model endpoint over
//! WebSocket. Only the kinds the relay acts on are modelled; any event whose
//! `type` tag is not listed here fails enum deserialization and is forwarded
//! verbatim by the outbound transformer.
//!
//! # Protocol Overview
//!
//! Events sent to the model:
//! - session.update - Update session configuration
//! - input_audio_buffer.append - Append audio to the input buffer
//! - conversation.item.create - Add item to conversation (tool results)
//! - response.create - Request a response continuation
//!
//! Events received from the model:
//! - session.created - Session announcement
//! - input_audio_buffer.speech_started - Barge-in signal
//! - conversation.item.created - Item added to conversation
//! - response.output_item.added / done - Output item lifecycle
//! - response.function_call_arguments.delta / done - Tool argument streaming
//! - response.audio.delta - Audio chunk
//! - response.done - Response complete
//!
//! Payload structs carry a flattened extra map so that fields the relay does
//! not model survive a deserialize/modify/serialize round trip.

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration carried by `session.update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum response output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxTokens>,

    /// Whether audio output is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_audio: Option<bool>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Tool definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,

    /// Tool choice strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,

    /// Fields the relay does not model, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Maximum tokens configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    /// Specific number of tokens
    Number(i32),
    /// Infinite tokens ("inf")
    Infinite(String),
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

impl TurnDetection {
    /// Server VAD with endpoint defaults.
    pub fn server_vad() -> Self {
        TurnDetection::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters JSON schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item as it appears in created/added/done events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type (message, function_call, function_call_output)
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Item role (user, assistant, system)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Call ID for function call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Function name for function call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function arguments for function call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Function output for function call result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Unmodelled fields (content parts and friends)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationItem {
    /// Build a function_call_output item closing out the given call.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        ConversationItem {
            item_type: "function_call_output".to_string(),
            call_id: Some(call_id.into()),
            output: Some(output.into()),
            ..Default::default()
        }
    }

    /// Whether this item is a function call.
    pub fn is_function_call(&self) -> bool {
        self.item_type == "function_call"
    }

    /// Whether this item is a function call output record.
    pub fn is_function_call_output(&self) -> bool {
        self.item_type == "function_call_output"
    }
}

// =============================================================================
// Events Sent to the Model
// =============================================================================

/// Events the relay sends to the model endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
        /// Optional event identifier
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Request a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Audio append event from an already base64-encoded payload.
    pub fn audio_append(audio: impl Into<String>) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: audio.into(),
            event_id: None,
        }
    }

    /// Audio append event from raw bytes.
    pub fn audio_append_bytes(data: &[u8]) -> Self {
        Self::audio_append(BASE64_STANDARD.encode(data))
    }
}

// =============================================================================
// Events Received from the Model
// =============================================================================

/// Model events the relay dispatches on. Anything else passes through raw.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Session announcement
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session payload
        session: Session,
    },

    /// Speech detected in the input buffer (barge-in)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        #[serde(default)]
        audio_start_ms: Option<u64>,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Conversation item created
    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated {
        /// Previous item ID
        #[serde(default)]
        previous_item_id: Option<String>,
        /// Created item
        item: ConversationItem,
    },

    /// Output item added to the response
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        /// Item
        item: ConversationItem,
    },

    /// Output item complete
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        /// Item
        item: ConversationItem,
    },

    /// Function call arguments streaming
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {},

    /// Function call arguments complete
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {},

    /// Audio chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded audio delta
        delta: String,
    },

    /// Response complete
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response payload
        response: Response,
    },
}

// =============================================================================
// Supporting Payloads
// =============================================================================

/// Session payload of `session.created`.
///
/// The sanitized fields are modelled explicitly and always serialized (null
/// when absent, matching the wire behavior of the sanitizer); everything else
/// rides in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// System instructions
    pub instructions: Option<String>,
    /// Voice for audio output
    pub voice: Option<String>,
    /// Advertised tools
    #[serde(default)]
    pub tools: Vec<ToolDef>,
    /// Tool choice strategy
    pub tool_choice: Option<String>,
    /// Maximum response output tokens
    pub max_response_output_tokens: Option<Value>,
    /// Unmodelled fields, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response payload of `response.done`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// Output items
    #[serde(default)]
    pub output: Vec<ConversationItem>,
    /// Unmodelled fields, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Tests
// =============================================================================
