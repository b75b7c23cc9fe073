//! Widget module — seams to the hosted chat-widget SDK
//!
//! The widget itself (rendering, streaming, tool protocol) is external. This
//! module defines what the panel needs from it:
//! - `WidgetHost` — registration check, signal channel, session initialization
//! - `ChatSession` — the initialized thread: items, streaming flag, send
//! - `HostSignal` — events the host raises (script load, errors, tool calls…),
//!   delivered as `HostEvent`s tagged with the widget generation
//!
//! `local` provides an in-process implementation used by the `chat` command
//! and in tests.

pub mod local;
pub mod options;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::chat::{ToolInvocation, ToolResponse};
use crate::error::PanelError;

pub use local::{LocalHost, LocalSession};
pub use options::WidgetOptions;

/// Name under which the widget implementation registers itself
pub const WIDGET_ELEMENT: &str = "openai-chatkit";
/// Event raised by the host once the widget implementation is available
pub const SCRIPT_LOADED_EVENT: &str = "chatkit-script-loaded";
/// Event raised by the host when the widget implementation failed to load
pub const SCRIPT_ERROR_EVENT: &str = "chatkit-script-error";

/// Signals raised by the widget host
#[derive(Debug)]
pub enum HostSignal {
    /// `chatkit-script-loaded`
    ScriptLoaded,
    /// `chatkit-script-error`
    ScriptError(String),
    /// The widget's own error channel
    WidgetError(String),
    ResponseStarted,
    ResponseEnded,
    ThreadChanged(Option<String>),
    ClientTool {
        invocation: ToolInvocation,
        reply: oneshot::Sender<ToolResponse>,
    },
    /// The widget needs a (new) client secret, e.g. after expiry
    CredentialRequested {
        current: Option<String>,
        reply: oneshot::Sender<Result<String, PanelError>>,
    },
}

impl HostSignal {
    /// Name of the host event this signal mirrors, if any.
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            HostSignal::ScriptLoaded => Some(SCRIPT_LOADED_EVENT),
            HostSignal::ScriptError(_) => Some(SCRIPT_ERROR_EVENT),
            _ => None,
        }
    }
}

/// A signal plus the widget generation that raised it.
///
/// Signals raised by an initialized widget carry the generation it was
/// initialized under. Host-level signals (script load, page errors) carry
/// none and apply to whatever generation is current when they arrive.
#[derive(Debug)]
pub struct HostEvent {
    pub generation: Option<u64>,
    pub signal: HostSignal,
}

impl HostEvent {
    pub fn host(signal: HostSignal) -> Self {
        Self {
            generation: None,
            signal,
        }
    }

    pub fn widget(generation: u64, signal: HostSignal) -> Self {
        Self {
            generation: Some(generation),
            signal,
        }
    }
}

/// The environment hosting the widget implementation
#[async_trait]
pub trait WidgetHost: Send + Sync {
    /// Whether the widget implementation is already registered.
    fn is_registered(&self) -> bool;

    /// Hand over the host's signal receiver. Yields `Some` once.
    fn take_signals(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>>;

    /// Initialize the widget with a fresh credential and return its session.
    /// Every signal the session raises is tagged with `generation`.
    async fn initialize(
        &self,
        generation: u64,
        credential: String,
        options: WidgetOptions,
    ) -> Result<Arc<dyn ChatSession>, PanelError>;
}

/// An initialized widget session
#[async_trait]
pub trait ChatSession: Send + Sync {
    fn thread_id(&self) -> Option<String>;

    /// Raw thread items, oldest first.
    fn items(&self) -> Vec<Value>;

    fn is_streaming(&self) -> bool;

    async fn send(&self, text: &str) -> Result<(), PanelError>;
}
