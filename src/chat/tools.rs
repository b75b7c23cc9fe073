//! Client tools the widget may invoke during a response
//!
//! - `switch_theme {theme}` — asks the host to change color scheme
//! - `record_fact {fact_id, fact_text}` — saves a fact once per thread
//!
//! Fact ids are deduplicated through the `ConversationContext`, which is
//! cleared whenever the widget switches threads.

use async_trait::async_trait;
use lru::LruCache;
use regex::Regex;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::types::{ColorScheme, FactAction, ToolInvocation, ToolResponse};

/// Upper bound on remembered fact ids per thread
pub const DEFAULT_FACT_CAPACITY: usize = 512;

pub const TOOL_SWITCH_THEME: &str = "switch_theme";
pub const TOOL_RECORD_FACT: &str = "record_fact";

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern is valid"));

// ============================================================================
// Conversation context
// ============================================================================

/// Per-thread state owned by one panel instance.
pub struct ConversationContext {
    thread_id: Option<String>,
    processed_facts: LruCache<String, ()>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FACT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            thread_id: None,
            processed_facts: LruCache::new(capacity),
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Switch to `thread_id`, forgetting every processed fact.
    pub fn on_thread_change(&mut self, thread_id: Option<String>) {
        debug!(
            from = ?self.thread_id,
            to = ?thread_id,
            forgotten = self.processed_facts.len(),
            "Thread changed"
        );
        self.thread_id = thread_id;
        self.processed_facts.clear();
    }

    pub fn has_processed(&self, fact_id: &str) -> bool {
        self.processed_facts.contains(fact_id)
    }

    pub fn processed_count(&self) -> usize {
        self.processed_facts.len()
    }

    /// Mark `fact_id` as handled. Returns false when it was already known.
    fn admit(&mut self, fact_id: &str) -> bool {
        if self.processed_facts.contains(fact_id) {
            return false;
        }
        self.processed_facts.put(fact_id.to_string(), ());
        true
    }

    /// Undo `admit` so a failed save can be retried.
    fn forget(&mut self, fact_id: &str) {
        self.processed_facts.pop(fact_id);
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Downstream sink
// ============================================================================

/// Destination for recorded facts (CRM, database, log…)
#[async_trait]
pub trait FactSink: Send + Sync {
    async fn save(&self, action: FactAction) -> anyhow::Result<()>;
}

/// Sink that only logs the fact.
#[derive(Debug, Default, Clone)]
pub struct LoggingFactSink;

#[async_trait]
impl FactSink for LoggingFactSink {
    async fn save(&self, action: FactAction) -> anyhow::Result<()> {
        info!(action = ?action, "Fact recorded");
        Ok(())
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Result of handling one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub response: ToolResponse,
    /// Set when the call asked the host to change color scheme
    pub theme: Option<ColorScheme>,
}

impl ToolOutcome {
    fn reply(response: ToolResponse) -> Self {
        Self {
            response,
            theme: None,
        }
    }
}

/// Handle one client tool call against the current conversation.
pub async fn handle_client_tool(
    ctx: &mut ConversationContext,
    sink: &dyn FactSink,
    invocation: &ToolInvocation,
) -> ToolOutcome {
    match invocation.name.as_str() {
        TOOL_SWITCH_THEME => {
            let requested = invocation
                .params
                .get("theme")
                .and_then(Value::as_str)
                .and_then(ColorScheme::parse);
            match requested {
                Some(scheme) => ToolOutcome {
                    response: ToolResponse::OK,
                    theme: Some(scheme),
                },
                None => ToolOutcome::reply(ToolResponse::FAILED),
            }
        }
        TOOL_RECORD_FACT => {
            let fact_id = param_string(invocation, "fact_id");
            if fact_id.is_empty() || !ctx.admit(&fact_id) {
                return ToolOutcome::reply(ToolResponse::OK);
            }
            let fact_text = normalize_whitespace(&param_string(invocation, "fact_text"));
            if let Err(e) = sink
                .save(FactAction::Save {
                    fact_id: fact_id.clone(),
                    fact_text,
                })
                .await
            {
                warn!(fact_id = %fact_id, "Failed to save fact: {}", e);
                ctx.forget(&fact_id);
                return ToolOutcome::reply(ToolResponse::FAILED);
            }
            ToolOutcome::reply(ToolResponse::OK)
        }
        other => {
            debug!(tool = %other, "Unknown client tool");
            ToolOutcome::reply(ToolResponse::FAILED)
        }
    }
}

/// Stringify a param the way the widget would: strings verbatim, missing/null
/// as empty, anything else as its JSON text.
fn param_string(invocation: &ToolInvocation, key: &str) -> String {
    match invocation.params.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}
