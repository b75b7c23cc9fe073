//! In-process widget host.
//!
//! Keeps the thread in memory and optionally echoes user messages back as
//! assistant replies (`chat --echo`). Used by the `chat` command and by tests
//! that need a host without the hosted SDK.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::{ChatSession, HostEvent, HostSignal, WidgetHost, WidgetOptions, WIDGET_ELEMENT};
use crate::error::PanelError;

pub struct LocalHost {
    registered: AtomicBool,
    echo: bool,
    signals_tx: mpsc::UnboundedSender<HostEvent>,
    signals_rx: Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>,
    initialized_with: Mutex<Vec<String>>,
    reject_with: Mutex<Option<String>>,
}

impl LocalHost {
    /// A host whose widget implementation has not registered yet.
    pub fn new() -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Self {
            registered: AtomicBool::new(false),
            echo: false,
            signals_tx,
            signals_rx: Mutex::new(Some(signals_rx)),
            initialized_with: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
        }
    }

    /// A host that already reports the widget as registered.
    pub fn registered() -> Self {
        let host = Self::new();
        host.registered.store(true, Ordering::SeqCst);
        host
    }

    /// Echo every user message back as an assistant reply.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Raise a host-level signal.
    pub fn signal(&self, signal: HostSignal) {
        let _ = self.signals_tx.send(HostEvent::host(signal));
    }

    /// Raise a signal as the widget initialized under `generation` would.
    pub fn signal_from(&self, generation: u64, signal: HostSignal) {
        let _ = self.signals_tx.send(HostEvent::widget(generation, signal));
    }

    /// Register the widget implementation and raise `chatkit-script-loaded`.
    pub fn announce_loaded(&self) {
        self.registered.store(true, Ordering::SeqCst);
        debug!(element = WIDGET_ELEMENT, "Widget implementation registered");
        self.signal(HostSignal::ScriptLoaded);
    }

    /// Make the next `initialize` calls fail with an integration error.
    pub fn reject_initialize(&self, detail: Option<&str>) {
        *self.reject_with.lock().unwrap_or_else(PoisonError::into_inner) =
            detail.map(str::to_string);
    }

    /// Credentials passed to `initialize`, in call order.
    pub fn initialized_with(&self) -> Vec<String> {
        self.initialized_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WidgetHost for LocalHost {
    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    fn take_signals(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>> {
        self.signals_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    async fn initialize(
        &self,
        generation: u64,
        credential: String,
        options: WidgetOptions,
    ) -> Result<Arc<dyn ChatSession>, PanelError> {
        self.initialized_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(credential);

        if let Some(detail) = self
            .reject_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(PanelError::Integration(detail));
        }

        let session = Arc::new(LocalSession::new(
            generation,
            self.echo,
            self.signals_tx.clone(),
        ));
        debug!(
            generation,
            thread_id = %session.thread_id,
            greeting = %options.start_screen.greeting,
            "Local widget initialized"
        );
        self.signal_from(
            generation,
            HostSignal::ThreadChanged(Some(session.thread_id.clone())),
        );
        Ok(session)
    }
}

/// In-memory thread behind a `LocalHost`
pub struct LocalSession {
    generation: u64,
    thread_id: String,
    items: Mutex<Vec<Value>>,
    streaming: AtomicBool,
    echo: bool,
    signals: mpsc::UnboundedSender<HostEvent>,
}

impl LocalSession {
    fn new(generation: u64, echo: bool, signals: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self {
            generation,
            thread_id: format!("thr_{}", Uuid::new_v4().simple()),
            items: Mutex::new(Vec::new()),
            streaming: AtomicBool::new(false),
            echo,
            signals,
        }
    }

    fn raise(&self, signal: HostSignal) {
        let _ = self.signals.send(HostEvent::widget(self.generation, signal));
    }

    fn push(&self, role: &str, text: &str) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(json!({
                "id": format!("msg_{}", Uuid::new_v4().simple()),
                "role": role,
                "content": [{"type": "text", "text": text}],
            }));
    }
}

#[async_trait]
impl ChatSession for LocalSession {
    fn thread_id(&self) -> Option<String> {
        Some(self.thread_id.clone())
    }

    fn items(&self) -> Vec<Value> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    async fn send(&self, text: &str) -> Result<(), PanelError> {
        if text.trim().is_empty() {
            return Err(PanelError::Integration("Cannot send an empty message".into()));
        }
        self.push("user", text);

        self.raise(HostSignal::ResponseStarted);
        self.streaming.store(true, Ordering::SeqCst);
        if self.echo {
            self.push("assistant", text);
        }
        self.streaming.store(false, Ordering::SeqCst);
        self.raise(HostSignal::ResponseEnded);
        Ok(())
    }
}
