//! Server-authoritative session policy.
//!
//! The relay, not the media peer, decides the conversation parameters that
//! matter: instructions, sampling, token budget, audio, voice and the tool
//! set. Policy is applied identically to any session-configuration message
//! crossing the boundary in either direction, and to the announcement the
//! model sends back so the peer never learns what was configured.

use serde::Deserialize;

use super::messages::{MaxTokens, Session, SessionConfig};
use super::tools::ToolRegistry;

/// Server-side overrides for session configuration.
///
/// Each present field unconditionally replaces the corresponding field of a
/// session-update message; absent fields leave the supplied value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionPolicy {
    /// Conversation instructions (system message)
    #[serde(default)]
    pub instructions: Option<String>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Maximum response output tokens
    #[serde(default)]
    pub max_output_tokens: Option<i32>,
    /// Whether audio output is enabled
    #[serde(default)]
    pub audio_enabled: Option<bool>,
    /// Voice selection
    #[serde(default)]
    pub voice: Option<String>,
}

impl SessionPolicy {
    /// Apply the policy to a session-update payload.
    ///
    /// The advertised tool list is always replaced with the registry's
    /// schemas (never unioned), and tool_choice is recomputed from registry
    /// emptiness regardless of the supplied value.
    pub fn apply(&self, session: &mut SessionConfig, registry: &ToolRegistry) {
        if let Some(ref instructions) = self.instructions {
            session.instructions = Some(instructions.clone());
        }
        if let Some(temperature) = self.temperature {
            session.temperature = Some(temperature);
        }
        if let Some(max_tokens) = self.max_output_tokens {
            session.max_response_output_tokens = Some(MaxTokens::Number(max_tokens));
        }
        if let Some(audio_enabled) = self.audio_enabled {
            session.disable_audio = Some(!audio_enabled);
        }
        if let Some(ref voice) = self.voice {
            session.voice = Some(voice.clone());
        }
        session.tool_choice = Some(registry.tool_choice().to_string());
        session.tools = Some(registry.schemas());
    }

    /// Sanitize a `session.created` announcement before it reaches the peer.
    ///
    /// Instructions, tools, tool_choice and the token budget are server
    /// concerns the peer should never see; the voice is pinned to the policy
    /// choice.
    pub fn sanitize_created(&self, session: &mut Session) {
        session.instructions = Some(String::new());
        session.tools = Vec::new();
        session.voice = self.voice.clone();
        session.tool_choice = Some("none".to_string());
        session.max_response_output_tokens = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
