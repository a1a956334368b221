//! Route configuration.

pub mod api;
pub mod media;

pub use api::create_api_router;
pub use media::create_media_router;
