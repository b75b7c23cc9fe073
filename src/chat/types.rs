//! Chat types — normalized messages and client-tool payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a rendered message. Anything else the widget reports is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A message ready for rendering. Derived from the widget thread, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
}

/// Color scheme requested by the host or by the `switch_theme` tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(ColorScheme::Light),
            "dark" => Some(ColorScheme::Dark),
            _ => None,
        }
    }
}

/// A client-side tool call issued by the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Reply returned to the widget for a client tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
}

impl ToolResponse {
    pub const OK: ToolResponse = ToolResponse { success: true };
    pub const FAILED: ToolResponse = ToolResponse { success: false };
}

/// A fact the assistant asked the client to record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FactAction {
    Save { fact_id: String, fact_text: String },
}
