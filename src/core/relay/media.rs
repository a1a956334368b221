//! Telephony-side media protocol frames.
//!
//! The media-streaming peer speaks JSON frames over the accepted WebSocket.
//! Inbound frames use camelCase keys (`{"kind":"AudioData","audioData":{...}}`),
//! outbound frames use PascalCase keys with explicit nulls for the unused
//! payload slot (`{"Kind":"AudioData","AudioData":{...},"StopAudio":null}`).

use serde::{Deserialize, Serialize};

// =============================================================================
// Inbound Frames (media peer -> relay)
// =============================================================================

/// Frames received from the media-streaming peer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum InboundMediaFrame {
    /// Encoded audio payload (the hot path)
    #[serde(rename = "AudioData")]
    AudioData {
        /// Audio payload
        #[serde(rename = "audioData")]
        audio_data: InboundAudioPayload,
    },

    /// Stream metadata announcement; logged, not forwarded
    #[serde(rename = "AudioMetadata")]
    AudioMetadata {},

    /// DTMF tone event; logged, not forwarded
    #[serde(rename = "DtmfData")]
    DtmfData {},

    /// Playback stop acknowledgment; logged, not forwarded
    #[serde(rename = "StopAudio")]
    StopAudio {},
}

/// Inbound audio payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundAudioPayload {
    /// Base64-encoded audio data
    pub data: String,
}

// =============================================================================
// Outbound Frames (relay -> media peer)
// =============================================================================

/// Frames sent to the media-streaming peer.
///
/// Serialized as a struct rather than a tagged enum so both payload slots are
/// always present on the wire, null when unused.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMediaFrame {
    /// Frame kind ("AudioData" or "StopAudio")
    #[serde(rename = "Kind")]
    pub kind: &'static str,
    /// Audio payload for AudioData frames
    #[serde(rename = "AudioData")]
    pub audio_data: Option<OutboundAudioPayload>,
    /// Empty marker object for StopAudio frames
    #[serde(rename = "StopAudio")]
    pub stop_audio: Option<StopAudioPayload>,
}

/// Outbound audio payload.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundAudioPayload {
    /// Base64-encoded audio data
    #[serde(rename = "Data")]
    pub data: String,
}

/// Empty StopAudio marker.
#[derive(Debug, Clone, Serialize)]
pub struct StopAudioPayload {}

impl OutboundMediaFrame {
    /// Audio frame carrying a base64 payload.
    pub fn audio(data: impl Into<String>) -> Self {
        OutboundMediaFrame {
            kind: "AudioData",
            audio_data: Some(OutboundAudioPayload { data: data.into() }),
            stop_audio: None,
        }
    }

    /// Stop-audio control frame halting in-flight playback.
    pub fn stop_audio() -> Self {
        OutboundMediaFrame {
            kind: "StopAudio",
            audio_data: None,
            stop_audio: Some(StopAudioPayload {}),
        }
    }
}

// =============================================================================
// Tool-Response Extension
// =============================================================================

/// Out-of-band delivery of a client-addressed tool result.
///
/// Consumers that do not recognize this kind are expected to ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponseExtension {
    /// Message type, always `extension.middle_tier_tool_response`
    #[serde(rename = "type")]
    pub message_type: String,
    /// Conversation item that preceded the triggering tool call
    pub previous_item_id: Option<String>,
    /// Tool name
    pub tool_name: String,
    /// Result text
    pub tool_result: String,
}

impl ToolResponseExtension {
    /// Build the extension message for one tool result.
    pub fn new(
        previous_item_id: Option<String>,
        tool_name: impl Into<String>,
        tool_result: impl Into<String>,
    ) -> Self {
        ToolResponseExtension {
            message_type: "extension.middle_tier_tool_response".to_string(),
            previous_item_id,
            tool_name: tool_name.into(),
            tool_result: tool_result.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
