//! Panel module — session/error/retry state machine and its async driver
//!
//! - `state` — pure state machine with generation-tagged events
//! - `controller` — spawns credential requests and script waits, feeds host
//!   signals and client tools through the state machine

pub mod controller;
pub mod state;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chat::ColorScheme;

pub use controller::PanelController;
pub use state::{
    BlockingError, ErrorState, PanelEvent, PanelState, ScriptStatus, SessionStatus,
};

/// Default bounded wait for the widget implementation to register
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bubble layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleLayout {
    /// User bubbles on the right, assistant bubbles on the left
    #[default]
    Ltr,
    /// Every bubble on the right
    Rtl,
}

impl BubbleLayout {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ltr" => Some(BubbleLayout::Ltr),
            "rtl" => Some(BubbleLayout::Rtl),
            _ => None,
        }
    }
}

/// Settings for one panel instance
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub workflow_id: String,
    pub script_timeout: Duration,
    pub file_upload_enabled: bool,
    pub color_scheme: ColorScheme,
    pub layout: BubbleLayout,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            workflow_id: String::new(),
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
            file_upload_enabled: true,
            color_scheme: ColorScheme::Light,
            layout: BubbleLayout::default(),
        }
    }
}
