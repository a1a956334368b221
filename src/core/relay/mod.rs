//! Realtime relay core.
//!
//! Bridges an accepted telephony media-streaming WebSocket and the model's
//! realtime WebSocket, enforcing server-side session policy, routing tool
//! calls, and translating between the two wire protocols.

pub mod bridge;
pub mod greeting;
pub mod media;
pub mod messages;
pub mod policy;
pub mod tools;
pub mod transform;
pub mod upstream;

pub use bridge::{CallContext, RelayConfig, run_call};
pub use greeting::Greeting;
pub use media::{InboundMediaFrame, OutboundMediaFrame, ToolResponseExtension};
pub use messages::{ClientEvent, ConversationItem, ServerEvent, SessionConfig, ToolDef};
pub use policy::SessionPolicy;
pub use tools::{PendingToolCall, Tool, ToolDestination, ToolRegistry, ToolResult};
pub use transform::{OutboundTransformer, RelayAction, process_inbound};
pub use upstream::{
    StaticTokenProvider, TokenProvider, UpstreamConfig, UpstreamCredentials,
};
