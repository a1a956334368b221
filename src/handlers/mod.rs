//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `api` - Health check endpoint
//! - `callbacks` - Call-automation lifecycle event acknowledgment
//! - `media` - Telephony media-streaming WebSocket

pub mod api;
pub mod callbacks;
pub mod media;

// Re-export commonly used handlers for convenient access
pub use callbacks::callbacks_handler;
pub use media::media_handler;
