//! PanelController — drives the state machine from async work and host signals
//!
//! Each mount generation owns a `CancellationToken`. The credential request
//! and the script wait spawned for a generation are abandoned when the token
//! is cancelled, and anything they still manage to report is tagged with
//! their generation and dropped by `PanelState::apply`.
//!
//! Host signals get the same treatment: a widget initialized under one
//! generation tags everything it raises with it, and `reset` discards what
//! the replaced widget left queued.
//!
//! The controller is driven from the UI loop: `pump` drains whatever is ready
//! without blocking, `step` waits for the next update.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{PanelEvent, PanelState, ScriptStatus};
use super::PanelConfig;
use crate::chat::{
    adapt_messages, handle_client_tool, ColorScheme, ConversationContext, FactSink, ToolResponse,
    UiMessage,
};
use crate::error::PanelError;
use crate::session::SessionClient;
use crate::widget::{ChatSession, HostEvent, HostSignal, WidgetHost, WidgetOptions};

/// Output of a spawned attempt, tagged with the generation that spawned it
#[derive(Debug)]
struct Tagged {
    generation: u64,
    update: AttemptUpdate,
}

#[derive(Debug)]
enum AttemptUpdate {
    Event(PanelEvent),
    Credential(String),
}

const REPLACED_WIDGET: &str = "The chat widget was restarted";

enum Incoming {
    Attempt(Tagged),
    Host(HostEvent),
}

pub struct PanelController {
    state: PanelState,
    config: PanelConfig,
    client: SessionClient,
    host: Arc<dyn WidgetHost>,
    sink: Arc<dyn FactSink>,
    ctx: ConversationContext,
    color_scheme: ColorScheme,
    credential: Option<String>,
    session: Option<Arc<dyn ChatSession>>,
    cancel: CancellationToken,
    updates_tx: mpsc::UnboundedSender<Tagged>,
    updates_rx: mpsc::UnboundedReceiver<Tagged>,
    signals: Option<mpsc::UnboundedReceiver<HostEvent>>,
}

impl PanelController {
    pub fn new(
        config: PanelConfig,
        client: SessionClient,
        host: Arc<dyn WidgetHost>,
        sink: Arc<dyn FactSink>,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let signals = host.take_signals();
        if signals.is_none() {
            warn!("Widget host signals already taken; host events will not reach the panel");
        }

        Self {
            state: PanelState::new(host.is_registered()),
            color_scheme: config.color_scheme,
            config,
            client,
            host,
            sink,
            ctx: ConversationContext::new(),
            credential: None,
            session: None,
            cancel: CancellationToken::new(),
            updates_tx,
            updates_rx,
            signals,
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    pub fn conversation(&self) -> &ConversationContext {
        &self.ctx
    }

    pub fn session(&self) -> Option<Arc<dyn ChatSession>> {
        self.session.clone()
    }

    /// Messages of the live session, normalized for rendering.
    pub fn messages(&self) -> Vec<UiMessage> {
        self.session
            .as_ref()
            .map(|s| adapt_messages(&s.items()))
            .unwrap_or_default()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.is_responding() || self.session.as_ref().is_some_and(|s| s.is_streaming())
    }

    /// Record a failed send from the composer as an integration error.
    pub fn report_send_error(&mut self, err: PanelError) {
        let generation = self.state.generation();
        warn!(generation, "Send failed: {}", err);
        self.state
            .apply(generation, PanelEvent::WidgetError(err.detail().to_string()));
    }

    /// Start the current generation: script wait and credential request.
    pub fn mount(&mut self) {
        let generation = self.state.generation();
        info!(
            generation,
            workflow_id = %self.config.workflow_id,
            "Mounting chat panel"
        );

        if self.state.script() == ScriptStatus::Pending {
            let token = self.cancel.clone();
            let tx = self.updates_tx.clone();
            let timeout = self.config.script_timeout;
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        let _ = tx.send(Tagged {
                            generation,
                            update: AttemptUpdate::Event(PanelEvent::ScriptTimedOut),
                        });
                    }
                }
            });
        }

        let token = self.cancel.clone();
        let tx = self.updates_tx.clone();
        let client = self.client.clone();
        let workflow_id = self.config.workflow_id.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    debug!(generation, "Credential request abandoned");
                    return;
                }
                result = client.obtain_credential(&workflow_id, None) => result,
            };
            let update = match result {
                Ok(secret) => AttemptUpdate::Credential(secret),
                Err(e) => AttemptUpdate::Event(PanelEvent::CredentialFailed(e)),
            };
            let _ = tx.send(Tagged { generation, update });
        });
    }

    /// User-triggered retry. Abandons in-flight work, clears every error
    /// slot and remounts under a new generation.
    pub fn reset(&mut self) -> u64 {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.discard_queued_signals();
        self.credential = None;
        self.session = None;
        self.ctx.on_thread_change(None);

        let generation = self.state.reset(self.host.is_registered());
        self.mount();
        generation
    }

    /// Apply everything already queued. Returns true if anything was applied.
    pub async fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(tagged) = self.updates_rx.try_recv() {
            self.apply_update(tagged).await;
            changed = true;
        }
        loop {
            let next = self.signals.as_mut().and_then(|rx| rx.try_recv().ok());
            let Some(event) = next else { break };
            self.handle_signal(event).await;
            changed = true;
        }
        changed
    }

    /// Wait for the next update or host signal and apply it.
    pub async fn step(&mut self) {
        let incoming = match self.signals.as_mut() {
            Some(signals) => tokio::select! {
                Some(tagged) = self.updates_rx.recv() => Incoming::Attempt(tagged),
                Some(event) = signals.recv() => Incoming::Host(event),
                else => return,
            },
            None => match self.updates_rx.recv().await {
                Some(tagged) => Incoming::Attempt(tagged),
                None => return,
            },
        };

        match incoming {
            Incoming::Attempt(tagged) => self.apply_update(tagged).await,
            Incoming::Host(event) => self.handle_signal(event).await,
        }
    }

    /// Step until `done` holds or `limit` elapses. Returns whether `done` held.
    pub async fn settle<F>(&mut self, limit: Duration, mut done: F) -> bool
    where
        F: FnMut(&PanelController) -> bool,
    {
        let deadline = tokio::time::Instant::now() + limit;
        while !done(self) {
            if tokio::time::timeout_at(deadline, self.step()).await.is_err() {
                return done(self);
            }
        }
        true
    }

    async fn apply_update(&mut self, tagged: Tagged) {
        let Tagged { generation, update } = tagged;
        match update {
            AttemptUpdate::Event(event) => {
                self.state.apply(generation, event);
            }
            AttemptUpdate::Credential(secret) => {
                if self.state.apply(generation, PanelEvent::CredentialObtained) {
                    self.credential = Some(secret);
                    self.initialize_widget().await;
                }
            }
        }
    }

    /// Drop everything queued by the widget being replaced.
    fn discard_queued_signals(&mut self) {
        let Some(signals) = self.signals.as_mut() else {
            return;
        };
        let mut discarded = 0usize;
        while let Ok(event) = signals.try_recv() {
            decline(event.signal);
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "Discarded signals queued before reset");
        }
    }

    async fn handle_signal(&mut self, event: HostEvent) {
        let HostEvent { generation, signal } = event;
        let current = self.state.generation();
        let generation = generation.unwrap_or(current);
        if generation != current {
            debug!(
                signal = ?signal,
                signal_generation = generation,
                current_generation = current,
                "Ignoring signal from a replaced widget"
            );
            decline(signal);
            return;
        }
        if let Some(name) = signal.event_name() {
            debug!(generation, event = name, "Host event");
        }

        match signal {
            HostSignal::ScriptLoaded => {
                self.state.apply(generation, PanelEvent::ScriptLoaded);
                self.initialize_widget().await;
            }
            HostSignal::ScriptError(detail) => {
                self.state.apply(generation, PanelEvent::ScriptFailed(detail));
            }
            HostSignal::WidgetError(detail) => {
                self.state.apply(generation, PanelEvent::WidgetError(detail));
            }
            HostSignal::ResponseStarted => {
                self.state.apply(generation, PanelEvent::ResponseStarted);
            }
            HostSignal::ResponseEnded => {
                self.state.apply(generation, PanelEvent::ResponseEnded);
                debug!(generation, "Response ended");
            }
            HostSignal::ThreadChanged(thread_id) => {
                self.ctx.on_thread_change(thread_id);
            }
            HostSignal::ClientTool { invocation, reply } => {
                let outcome = handle_client_tool(&mut self.ctx, self.sink.as_ref(), &invocation).await;
                if let Some(scheme) = outcome.theme {
                    info!(scheme = ?scheme, "Theme change requested by assistant");
                    self.color_scheme = scheme;
                }
                let _ = reply.send(outcome.response);
            }
            HostSignal::CredentialRequested { current, reply } => {
                let token = self.cancel.clone();
                let tx = self.updates_tx.clone();
                let client = self.client.clone();
                let workflow_id = self.config.workflow_id.clone();
                tokio::spawn(async move {
                    let result = tokio::select! {
                        _ = token.cancelled() => return,
                        result = client.obtain_credential(&workflow_id, current.as_deref()) => result,
                    };
                    if let Err(e) = &result {
                        let _ = tx.send(Tagged {
                            generation,
                            update: AttemptUpdate::Event(PanelEvent::CredentialFailed(e.clone())),
                        });
                    }
                    let _ = reply.send(result);
                });
            }
        }
    }

    /// Hand the held credential to the widget once its script is ready.
    /// The credential is consumed by this call whatever the outcome.
    async fn initialize_widget(&mut self) {
        if self.session.is_some() || self.state.script() != ScriptStatus::Ready {
            return;
        }
        let Some(credential) = self.credential.take() else {
            return;
        };

        let generation = self.state.generation();
        let options = WidgetOptions::new(self.color_scheme, self.config.file_upload_enabled);
        match self.host.initialize(generation, credential, options).await {
            Ok(session) => {
                info!(generation, thread_id = ?session.thread_id(), "Chat widget ready");
                self.session = Some(session);
                self.state.apply(generation, PanelEvent::WidgetReady);
            }
            Err(e) => {
                self.state
                    .apply(generation, PanelEvent::WidgetError(e.detail().to_string()));
            }
        }
    }
}

/// Answer the reply channel of a signal that will not be handled.
fn decline(signal: HostSignal) {
    match signal {
        HostSignal::ClientTool { reply, .. } => {
            let _ = reply.send(ToolResponse::FAILED);
        }
        HostSignal::CredentialRequested { reply, .. } => {
            let _ = reply.send(Err(PanelError::Integration(REPLACED_WIDGET.into())));
        }
        _ => {}
    }
}

impl Drop for PanelController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
