//! Panel state machine
//!
//! Tracks three independent axes — widget script, session and integration —
//! plus the error slots that block the live surface. Every event is tagged
//! with the mount generation it was produced for; events from an older
//! generation are ignored, so a failed attempt can never poison the retry
//! that replaced it.

use tracing::{debug, info, warn};

use crate::error::{ErrorKind, PanelError};

/// Script shown when the widget never registered
pub const SCRIPT_LOAD_FAILED: &str =
    "Chat widget failed to load. Please check your network connection and reload.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    Pending,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Ready,
    Error,
}

// ============================================================================
// Error state
// ============================================================================

/// Independent failure slots. Any non-empty slot blocks the live surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    pub script: Option<String>,
    pub session: Option<String>,
    pub integration: Option<String>,
    /// Whether the highest-priority error can be cleared by a retry
    pub retryable: bool,
    session_retryable: bool,
}

/// The error currently shown over the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ErrorState {
    pub fn is_blocking(&self) -> bool {
        self.script.is_some() || self.session.is_some() || self.integration.is_some()
    }

    /// Highest-priority error: script, then session, then integration.
    pub fn blocking(&self) -> Option<BlockingError> {
        let (kind, message) = if let Some(msg) = &self.script {
            (ErrorKind::Script, msg)
        } else if let Some(msg) = &self.session {
            let kind = if self.session_retryable {
                ErrorKind::Session
            } else {
                ErrorKind::Configuration
            };
            (kind, msg)
        } else if let Some(msg) = &self.integration {
            (ErrorKind::Integration, msg)
        } else {
            return None;
        };
        Some(BlockingError {
            kind,
            message: message.clone(),
            retryable: self.retryable,
        })
    }

    pub fn clear(&mut self) {
        *self = ErrorState::default();
    }

    fn set_script(&mut self, message: impl Into<String>) {
        self.script = Some(message.into());
        self.refresh_retryable();
    }

    fn set_session(&mut self, err: &PanelError) {
        self.session = Some(err.detail().to_string());
        self.session_retryable = err.is_retryable();
        self.refresh_retryable();
    }

    fn set_integration(&mut self, message: impl Into<String>) {
        self.integration = Some(message.into());
        self.refresh_retryable();
    }

    fn clear_integration(&mut self) {
        self.integration = None;
        self.refresh_retryable();
    }

    fn refresh_retryable(&mut self) {
        self.retryable = if self.script.is_some() {
            false
        } else if self.session.is_some() {
            self.session_retryable
        } else {
            self.integration.is_some()
        };
    }
}

// ============================================================================
// Events
// ============================================================================

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    ScriptLoaded,
    ScriptFailed(String),
    /// The bounded script wait elapsed
    ScriptTimedOut,
    CredentialObtained,
    CredentialFailed(PanelError),
    /// The widget reports a usable control and thread
    WidgetReady,
    WidgetError(String),
    ResponseStarted,
    ResponseEnded,
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone)]
pub struct PanelState {
    script: ScriptStatus,
    session: SessionStatus,
    errors: ErrorState,
    generation: u64,
    credential_obtained: bool,
    widget_ready: bool,
    responding: bool,
}

impl PanelState {
    /// Initial state. The script starts ready when the host already reports
    /// the widget implementation registered.
    pub fn new(widget_registered: bool) -> Self {
        Self {
            script: initial_script(widget_registered),
            session: SessionStatus::Initializing,
            errors: ErrorState::default(),
            generation: 0,
            credential_obtained: false,
            widget_ready: false,
            responding: false,
        }
    }

    pub fn script(&self) -> ScriptStatus {
        self.script
    }

    pub fn session(&self) -> SessionStatus {
        self.session
    }

    pub fn errors(&self) -> &ErrorState {
        &self.errors
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_initializing_session(&self) -> bool {
        self.session == SessionStatus::Initializing
    }

    pub fn is_responding(&self) -> bool {
        self.responding
    }

    /// The live surface is shown only when nothing blocks it and the session is up.
    pub fn is_live(&self) -> bool {
        !self.errors.is_blocking()
            && self.script == ScriptStatus::Ready
            && self.session == SessionStatus::Ready
    }

    pub fn blocking_error(&self) -> Option<BlockingError> {
        self.errors.blocking()
    }

    /// Apply `event` produced for `generation`. Returns false when the event
    /// was stale and ignored.
    pub fn apply(&mut self, generation: u64, event: PanelEvent) -> bool {
        if generation != self.generation {
            debug!(
                event = ?event,
                event_generation = generation,
                current_generation = self.generation,
                "Ignoring stale panel event"
            );
            return false;
        }

        match event {
            PanelEvent::ScriptLoaded => {
                self.script = ScriptStatus::Ready;
                if self.errors.script.take().is_some() {
                    self.errors.refresh_retryable();
                }
            }
            PanelEvent::ScriptFailed(detail) => {
                warn!(detail = %detail, "Widget script failed to load");
                self.script = ScriptStatus::Error;
                self.errors.set_script(detail);
            }
            PanelEvent::ScriptTimedOut => {
                if self.script == ScriptStatus::Pending {
                    warn!(generation, "Widget script did not register in time");
                    self.script = ScriptStatus::Error;
                    self.errors.set_script(SCRIPT_LOAD_FAILED);
                }
            }
            PanelEvent::CredentialObtained => {
                self.credential_obtained = true;
                self.promote_session();
            }
            PanelEvent::CredentialFailed(err) => {
                warn!(error = %err, retryable = err.is_retryable(), "Session initialization failed");
                self.session = SessionStatus::Error;
                self.errors.set_session(&err);
            }
            PanelEvent::WidgetReady => {
                self.widget_ready = true;
                self.promote_session();
            }
            PanelEvent::WidgetError(detail) => {
                warn!(detail = %detail, "Widget reported an error");
                self.errors.set_integration(detail);
            }
            PanelEvent::ResponseStarted => {
                self.responding = true;
                self.errors.clear_integration();
            }
            PanelEvent::ResponseEnded => {
                self.responding = false;
            }
        }
        true
    }

    /// Retry: clear every slot, re-check the script, restart the session and
    /// advance the generation. Returns the new generation.
    pub fn reset(&mut self, widget_registered: bool) -> u64 {
        self.generation += 1;
        self.script = initial_script(widget_registered);
        self.session = SessionStatus::Initializing;
        self.errors.clear();
        self.credential_obtained = false;
        self.widget_ready = false;
        self.responding = false;
        info!(generation = self.generation, "Panel reset");
        self.generation
    }

    fn promote_session(&mut self) {
        if self.credential_obtained && self.widget_ready && self.session != SessionStatus::Error {
            self.session = SessionStatus::Ready;
        }
    }
}

fn initial_script(widget_registered: bool) -> ScriptStatus {
    if widget_registered {
        ScriptStatus::Ready
    } else {
        ScriptStatus::Pending
    }
}
