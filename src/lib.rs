//! ChatKit Panel
//!
//! A thin chat panel over a hosted chat-widget SDK:
//! - Session exchange with the backend for short-lived widget credentials
//! - Script/session/integration state machine with generation-guarded retry
//! - Message normalization and RTL-aware bubble rendering in the terminal
//! - Client tools (theme switch, fact recording) and lead webhook forwarding

pub mod chat;
pub mod direction;
pub mod error;
pub mod lead;
pub mod panel;
pub mod session;
pub mod ui;
pub mod widget;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use chat::ColorScheme;
use panel::{BubbleLayout, PanelConfig, DEFAULT_SCRIPT_TIMEOUT};
use session::{SessionClient, CREATE_SESSION_PATH};

pub use error::{ErrorKind, PanelError};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub session: SessionYamlConfig,
    pub panel: PanelYamlConfig,
    pub lead: LeadYamlConfig,
}

/// Session backend section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionYamlConfig {
    pub base_url: String,
    pub workflow_id: String,
    pub endpoint_path: String,
    pub file_upload_enabled: bool,
}

impl Default for SessionYamlConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            workflow_id: String::new(),
            endpoint_path: CREATE_SESSION_PATH.into(),
            file_upload_enabled: true,
        }
    }
}

/// Panel presentation section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanelYamlConfig {
    pub script_timeout_ms: u64,
    pub layout: BubbleLayout,
    pub color_scheme: ColorScheme,
}

impl Default for PanelYamlConfig {
    fn default() -> Self {
        Self {
            script_timeout_ms: DEFAULT_SCRIPT_TIMEOUT.as_millis() as u64,
            layout: BubbleLayout::default(),
            color_scheme: ColorScheme::default(),
        }
    }
}

/// Lead webhook section. No URL means leads are not forwarded.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LeadYamlConfig {
    pub webhook_url: Option<String>,
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub endpoint_path: String,
    pub workflow_id: String,
    pub file_upload_enabled: bool,
    pub script_timeout: Duration,
    pub layout: BubbleLayout,
    pub color_scheme: ColorScheme,
    pub lead_webhook_url: Option<String>,
}

impl Config {
    /// Equivalent to `from_yaml_and_env(None)`.
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. A missing or
    /// unparsable file falls back to env vars and defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            base_url: std::env::var("CHATKIT_BASE_URL").unwrap_or(yaml.session.base_url),
            endpoint_path: yaml.session.endpoint_path,
            workflow_id: std::env::var("CHATKIT_WORKFLOW_ID")
                .unwrap_or(yaml.session.workflow_id)
                .trim()
                .to_string(),
            file_upload_enabled: yaml.session.file_upload_enabled,
            script_timeout: Duration::from_millis(
                std::env::var("CHATKIT_SCRIPT_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(yaml.panel.script_timeout_ms),
            ),
            layout: std::env::var("CHATKIT_LAYOUT")
                .ok()
                .and_then(|s| BubbleLayout::parse(s.trim()))
                .unwrap_or(yaml.panel.layout),
            color_scheme: std::env::var("CHATKIT_COLOR_SCHEME")
                .ok()
                .and_then(|s| ColorScheme::parse(s.trim()))
                .unwrap_or(yaml.panel.color_scheme),
            lead_webhook_url: std::env::var("CHATKIT_LEAD_WEBHOOK_URL")
                .ok()
                .or(yaml.lead.webhook_url)
                .filter(|url| !url.trim().is_empty()),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    pub fn panel_config(&self) -> PanelConfig {
        PanelConfig {
            workflow_id: self.workflow_id.clone(),
            script_timeout: self.script_timeout,
            file_upload_enabled: self.file_upload_enabled,
            color_scheme: self.color_scheme,
            layout: self.layout,
        }
    }

    pub fn session_client(&self) -> SessionClient {
        SessionClient::with_endpoint(&self.base_url, &self.endpoint_path)
            .file_upload(self.file_upload_enabled)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
session:
  base_url: https://chat.example.com
  workflow_id: wf_abc123
  file_upload_enabled: false

panel:
  script_timeout_ms: 2500
  layout: rtl
  color_scheme: dark

lead:
  webhook_url: https://hook.example.com/lead
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.session.base_url, "https://chat.example.com");
        assert_eq!(config.session.workflow_id, "wf_abc123");
        assert_eq!(config.session.endpoint_path, "/api/create-session");
        assert!(!config.session.file_upload_enabled);
        assert_eq!(config.panel.script_timeout_ms, 2500);
        assert_eq!(config.panel.layout, BubbleLayout::Rtl);
        assert_eq!(config.panel.color_scheme, ColorScheme::Dark);
        assert_eq!(
            config.lead.webhook_url.as_deref(),
            Some("https://hook.example.com/lead")
        );
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.session.base_url, "http://localhost:3000");
        assert!(config.session.workflow_id.is_empty());
        assert!(config.session.file_upload_enabled);
        assert_eq!(config.panel.script_timeout_ms, 5000);
        assert_eq!(config.panel.layout, BubbleLayout::Ltr);
        assert_eq!(config.panel.color_scheme, ColorScheme::Light);
        assert!(config.lead.webhook_url.is_none());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let yaml = r#"
panel:
  layout: rtl
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.panel.layout, BubbleLayout::Rtl);
        assert_eq!(config.panel.script_timeout_ms, 5000);
        assert_eq!(config.session.endpoint_path, "/api/create-session");
    }

    #[test]
    fn test_unknown_layout_rejected() {
        let yaml = r#"
panel:
  layout: diagonal
"#;
        assert!(serde_yaml::from_str::<YamlConfig>(yaml).is_err());
    }

    /// Combined test for YAML file loading, env var overrides, and fallbacks.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "CHATKIT_BASE_URL",
                "CHATKIT_WORKFLOW_ID",
                "CHATKIT_SCRIPT_TIMEOUT_MS",
                "CHATKIT_LEAD_WEBHOOK_URL",
                "CHATKIT_COLOR_SCHEME",
                "CHATKIT_LAYOUT",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
session:
  base_url: http://yaml-host:4000
  workflow_id: wf_yaml
panel:
  script_timeout_ms: 1500
  color_scheme: dark
lead:
  webhook_url: http://yaml-hook/lead
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.base_url, "http://yaml-host:4000");
        assert_eq!(config.workflow_id, "wf_yaml");
        assert_eq!(config.script_timeout, Duration::from_millis(1500));
        assert_eq!(config.color_scheme, ColorScheme::Dark);
        assert_eq!(
            config.lead_webhook_url.as_deref(),
            Some("http://yaml-hook/lead")
        );
        assert_eq!(
            config.session_client().endpoint(),
            "http://yaml-host:4000/api/create-session"
        );

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("CHATKIT_WORKFLOW_ID", "  wf_env  ");
        std::env::set_var("CHATKIT_SCRIPT_TIMEOUT_MS", "900");
        std::env::set_var("CHATKIT_COLOR_SCHEME", "light");
        std::env::set_var("CHATKIT_LAYOUT", "rtl");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.workflow_id, "wf_env");
        assert_eq!(config.script_timeout, Duration::from_millis(900));
        assert_eq!(config.color_scheme, ColorScheme::Light);
        assert_eq!(config.layout, BubbleLayout::Rtl);
        // YAML value still used where no env override
        assert_eq!(config.base_url, "http://yaml-host:4000");

        let panel = config.panel_config();
        assert_eq!(panel.workflow_id, "wf_env");
        assert_eq!(panel.script_timeout, Duration::from_millis(900));

        // --- Phase 3: Unparsable env values fall back to YAML ---
        std::env::set_var("CHATKIT_SCRIPT_TIMEOUT_MS", "soon");
        std::env::set_var("CHATKIT_COLOR_SCHEME", "sepia");
        std::env::set_var("CHATKIT_LAYOUT", "diagonal");
        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.script_timeout, Duration::from_millis(1500));
        assert_eq!(config.color_scheme, ColorScheme::Dark);
        assert_eq!(config.layout, BubbleLayout::Ltr);

        clear_env();

        // --- Phase 4: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-chatkit-config-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.workflow_id.is_empty());
        assert_eq!(config.script_timeout, DEFAULT_SCRIPT_TIMEOUT);
        assert!(config.lead_webhook_url.is_none());
    }
}
