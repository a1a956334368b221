//! Tool registry and tool-call bookkeeping.
//!
//! Tools are server-side only: the model sees their schemas through policy
//! enforcement, invokes them by name, and the media peer never sees the
//! machinery unless a result is explicitly addressed to it.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use super::messages::ToolDef;

/// Where a tool result is delivered.
///
/// Exactly one delivery happens per result: either the text becomes the
/// model's next turn input, or it is surfaced to the media peer as an
/// out-of-band extension message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDestination {
    /// Result feeds back into the model conversation
    ToModel,
    /// Result is surfaced to the client, hidden from the model
    ToClient,
}

/// Result of a tool invocation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    text: String,
    /// Delivery destination
    pub destination: ToolDestination,
}

impl ToolResult {
    /// Text result.
    pub fn text(text: impl Into<String>, destination: ToolDestination) -> Self {
        ToolResult {
            text: text.into(),
            destination,
        }
    }

    /// Structured result, serialized to text for delivery.
    pub fn json(value: &Value, destination: ToolDestination) -> Self {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ToolResult { text, destination }
    }

    /// The textual payload delivered to whichever side the destination names.
    pub fn to_text(&self) -> &str {
        &self.text
    }
}

/// Async tool action: parsed arguments in, result out.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<ToolResult>> + Send + Sync>;

/// A named tool: schema advertised to the model plus the invocable action.
#[derive(Clone)]
pub struct Tool {
    /// Calling convention advertised through session configuration
    pub schema: ToolDef,
    handler: ToolHandler,
}

impl Tool {
    /// Create a tool from its advertised schema and handler.
    pub fn new(schema: ToolDef, handler: ToolHandler) -> Self {
        Tool { schema, handler }
    }

    /// Invoke the tool with parsed arguments.
    pub async fn invoke(&self, arguments: Value) -> anyhow::Result<ToolResult> {
        (self.handler)(arguments).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.schema.name)
            .finish_non_exhaustive()
    }
}

/// Static name -> tool mapping, built at startup and shared read-only.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its schema name. Replaces any previous entry.
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.schema.name.clone(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Whether any tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Schemas advertised in place of any client-declared tool list.
    pub fn schemas(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.schema.clone()).collect()
    }

    /// Derived tool-choice value: "auto" when tools exist, "none" otherwise.
    pub fn tool_choice(&self) -> &'static str {
        if self.tools.is_empty() { "none" } else { "auto" }
    }
}

/// An outstanding model-initiated tool call awaiting its final arguments.
#[derive(Debug, Clone)]
pub struct PendingToolCall {
    /// Opaque call identifier, unique per outstanding call
    pub call_id: String,
    /// Conversation item that preceded the call, used for client correlation
    pub previous_item_id: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
