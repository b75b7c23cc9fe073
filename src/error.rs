//! Panel error taxonomy
//!
//! Every fault the panel can observe is caught where it happens and stored
//! into the panel's `ErrorState`; nothing here is meant to bubble up to the
//! render surface as an unhandled failure.

use thiserror::Error;

/// Failure classes surfaced by the panel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    /// Workflow id missing or still set to the placeholder value.
    #[error("{0}")]
    Configuration(String),
    /// The session-token exchange failed.
    #[error("{detail}")]
    Session { detail: String },
    /// The widget implementation never registered.
    #[error("{0}")]
    Script(String),
    /// Runtime error reported by the widget during a response cycle.
    #[error("{0}")]
    Integration(String),
}

/// Error slot a `PanelError` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Session,
    Script,
    Integration,
}

impl PanelError {
    pub fn session(detail: impl Into<String>) -> Self {
        PanelError::Session {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PanelError::Configuration(_) => ErrorKind::Configuration,
            PanelError::Session { .. } => ErrorKind::Session,
            PanelError::Script(_) => ErrorKind::Script,
            PanelError::Integration(_) => ErrorKind::Integration,
        }
    }

    /// Configuration and script failures need a redeploy, not a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PanelError::Session { .. } | PanelError::Integration(_)
        )
    }

    /// Human-readable detail without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            PanelError::Configuration(d)
            | PanelError::Script(d)
            | PanelError::Integration(d) => d,
            PanelError::Session { detail } => detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(PanelError::session("boom").is_retryable());
        assert!(PanelError::Integration("stream dropped".into()).is_retryable());
        assert!(!PanelError::Configuration("missing".into()).is_retryable());
        assert!(!PanelError::Script("not loaded".into()).is_retryable());
    }

    #[test]
    fn test_display_is_detail() {
        let err = PanelError::session("Invalid workflow");
        assert_eq!(err.to_string(), "Invalid workflow");
        assert_eq!(err.detail(), "Invalid workflow");
        assert_eq!(err.kind(), ErrorKind::Session);
    }
}
