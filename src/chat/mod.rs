//! Chat module — message normalization and client-tool handling
//!
//! The widget owns the thread; this module only turns its items into
//! renderable messages and answers the client tools it invokes.

pub mod adapter;
pub mod tools;
pub mod types;

pub use adapter::adapt_messages;
pub use tools::{
    handle_client_tool, ConversationContext, FactSink, LoggingFactSink, ToolOutcome,
};
pub use types::{ColorScheme, FactAction, Role, ToolInvocation, ToolResponse, UiMessage};
