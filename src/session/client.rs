//! Session-token exchange against the backend `create-session` endpoint.
//!
//! Sends one POST per call with the workflow id and the attachment flag, and
//! turns every failure (transport, status, body) into a `PanelError::Session`
//! carrying the most specific detail the response offers.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PanelError;

/// Path of the session endpoint, relative to the backend base URL
pub const CREATE_SESSION_PATH: &str = "/api/create-session";

/// Workflow ids starting with this prefix are the deployment template's placeholder
pub const WORKFLOW_PLACEHOLDER_PREFIX: &str = "wf_replace";

const MISSING_SECRET_DETAIL: &str = "Missing client secret in response";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    workflow: WorkflowRef<'a>,
    chatkit_configuration: ChatkitConfiguration,
}

#[derive(Debug, Serialize)]
struct WorkflowRef<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatkitConfiguration {
    file_upload: FileUpload,
}

#[derive(Debug, Serialize)]
struct FileUpload {
    enabled: bool,
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the session-token exchange
#[derive(Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    endpoint: String,
    file_upload_enabled: bool,
}

impl SessionClient {
    /// Create a client targeting `{base_url}/api/create-session`.
    pub fn new(base_url: &str) -> Self {
        Self::with_endpoint(base_url, CREATE_SESSION_PATH)
    }

    /// Create a client with an explicit endpoint path.
    pub fn with_endpoint(base_url: &str, path: &str) -> Self {
        let endpoint = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Self {
            http: reqwest::Client::new(),
            endpoint,
            file_upload_enabled: true,
        }
    }

    pub fn file_upload(mut self, enabled: bool) -> Self {
        self.file_upload_enabled = enabled;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a request made while holding `current` should put the panel
    /// into its loading state. Refreshes of an existing credential do not.
    pub fn is_initial_request(current: Option<&str>) -> bool {
        current.is_none()
    }

    /// Request a fresh client secret for `workflow_id`.
    ///
    /// `current` is the credential held so far, if any; it is only logged and
    /// never sent. No retries are made here.
    pub async fn obtain_credential(
        &self,
        workflow_id: &str,
        current: Option<&str>,
    ) -> Result<String, PanelError> {
        let workflow_id = validate_workflow_id(workflow_id)?;

        info!(
            workflow_id = %workflow_id,
            initial = Self::is_initial_request(current),
            endpoint = %self.endpoint,
            "Requesting chat session"
        );

        let body = CreateSessionRequest {
            workflow: WorkflowRef { id: workflow_id },
            chatkit_configuration: ChatkitConfiguration {
                file_upload: FileUpload {
                    enabled: self.file_upload_enabled,
                },
            },
        };

        let response = match self.http.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %self.endpoint, "Session request failed: {}", e);
                return Err(PanelError::session(e.to_string()));
            }
        };

        let status = response.status();
        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Failed to read session response body: {}", e);
                String::new()
            }
        };
        let payload = parse_body(&raw);

        if !status.is_success() {
            let detail = payload
                .as_ref()
                .and_then(extract_error_detail)
                .unwrap_or_else(|| status_text(status));
            warn!(status = status.as_u16(), detail = %detail, "Create session request failed");
            return Err(PanelError::session(detail));
        }

        match payload
            .as_ref()
            .and_then(|p| p.get("client_secret"))
            .and_then(Value::as_str)
        {
            Some(secret) => {
                debug!(workflow_id = %workflow_id, "Chat session created");
                Ok(secret.to_string())
            }
            None => {
                warn!(status = status.as_u16(), "Session response has no client secret");
                Err(PanelError::session(MISSING_SECRET_DETAIL))
            }
        }
    }
}

/// Reject empty and placeholder workflow ids before touching the network.
pub fn validate_workflow_id(workflow_id: &str) -> Result<&str, PanelError> {
    let trimmed = workflow_id.trim();
    if trimmed.is_empty() || trimmed.starts_with(WORKFLOW_PLACEHOLDER_PREFIX) {
        return Err(PanelError::Configuration(
            "Set CHATKIT_WORKFLOW_ID in your deployment configuration.".to_string(),
        ));
    }
    Ok(trimmed)
}

fn parse_body(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw).ok()
}

/// Pull a human-readable detail out of an error body.
///
/// Priority: `error` (string), `error.message`, `message`.
pub fn extract_error_detail(payload: &Value) -> Option<String> {
    let error = payload.get("error");
    if let Some(text) = error.and_then(Value::as_str) {
        return Some(text.to_string());
    }
    if let Some(text) = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(text.to_string());
    }
    payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
