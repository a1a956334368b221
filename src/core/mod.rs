pub mod relay;

// Re-export commonly used types for convenience
pub use relay::{
    CallContext, ClientEvent, Greeting, OutboundTransformer, RelayAction, RelayConfig,
    ServerEvent, SessionPolicy, Tool, ToolDestination, ToolRegistry, ToolResult,
    UpstreamConfig, UpstreamCredentials, run_call,
};
