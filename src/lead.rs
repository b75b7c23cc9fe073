//! Lead webhook — forwards captured leads to an automation endpoint
//!
//! Fire-and-forget: the POST runs on a spawned task, failures are logged and
//! never surfaced to the user or retried.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Value of `source` on every forwarded lead
pub const LEAD_SOURCE: &str = "Website AI Chat";

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Contact details captured during a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadPayload {
    pub name: String,
    pub phone: String,
    pub specialty: String,
}

#[derive(Debug, Serialize)]
struct LeadBody<'a> {
    #[serde(flatten)]
    lead: &'a LeadPayload,
    source: &'static str,
}

/// HTTP client posting leads to a fixed webhook URL
#[derive(Clone)]
pub struct LeadNotifier {
    client: reqwest::Client,
    url: String,
}

impl LeadNotifier {
    pub fn new(url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: url.trim().to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post `lead` in the background. The handle may be awaited or dropped.
    pub fn send(&self, lead: LeadPayload) -> JoinHandle<()> {
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            let body = LeadBody {
                lead: &lead,
                source: LEAD_SOURCE,
            };
            let result = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(_) => info!(
                    name = %lead.name,
                    specialty = %lead.specialty,
                    "Lead pushed to webhook"
                ),
                Err(e) => error!(url = %url, "Lead webhook failed: {}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lead() -> LeadPayload {
        LeadPayload {
            name: "Dana".into(),
            phone: "050-0000000".into(),
            specialty: "Dermatology".into(),
        }
    }

    #[test]
    fn test_new_trims_url() {
        let notifier = LeadNotifier::new("  https://hook.example.com/abc \n");
        assert_eq!(notifier.url(), "https://hook.example.com/abc");
    }

    #[tokio::test]
    async fn test_send_posts_lead_with_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "name": "Dana",
                "phone": "050-0000000",
                "specialty": "Dermatology",
                "source": "Website AI Chat"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = LeadNotifier::new(&format!("{}/hook", server.uri()));
        tokio_test::assert_ok!(notifier.send(lead()).await);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = LeadNotifier::new(&server.uri());
        // The task completes normally even though the webhook failed
        tokio_test::assert_ok!(notifier.send(lead()).await);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_no_panic() {
        // Port 1 — nothing listening
        let notifier = LeadNotifier::new("http://127.0.0.1:1/hook");
        tokio_test::assert_ok!(notifier.send(lead()).await);
    }
}
