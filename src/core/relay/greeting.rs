//! Greeting-on-connect audio.
//!
//! A pre-recorded PCM clip is loaded once at startup and appended to the
//! model's input audio buffer right after session creation, so the model
//! opens the conversation instead of waiting for the caller to speak.

use std::path::Path;

use base64::prelude::*;
use bytes::Bytes;

use super::messages::ClientEvent;

/// Event identifier attached to the greeting append.
const GREETING_EVENT_ID: &str = "greeting";

/// Pre-encoded greeting audio, ready to append per call.
#[derive(Debug, Clone)]
pub struct Greeting {
    encoded: String,
}

impl Greeting {
    /// Load and encode a PCM file. Errors bubble to the caller, who decides
    /// whether a missing greeting is fatal.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let pcm = std::fs::read(path)?;
        Ok(Self::from_pcm(Bytes::from(pcm)))
    }

    /// Build from raw PCM bytes.
    pub fn from_pcm(pcm: Bytes) -> Self {
        Greeting {
            encoded: BASE64_STANDARD.encode(&pcm),
        }
    }

    /// The append event enqueueing the greeting into the input buffer.
    pub fn append_event(&self) -> ClientEvent {
        ClientEvent::InputAudioBufferAppend {
            audio: self.encoded.clone(),
            event_id: Some(GREETING_EVENT_ID.to_string()),
        }
    }
}
