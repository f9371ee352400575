//! Discord-style webhook notification adapter.
//!
//! Posts an embed per notification. Delivery failures are logged and
//! swallowed; a missing webhook URL turns the adapter into a logger.

use crate::ports::notify_port::{NotifyPort, Severity};
use async_trait::async_trait;
use serde_json::json;

const COLOR_INFO: u32 = 0x3498db;
const COLOR_WARNING: u32 = 0xf39c12;
const COLOR_CRITICAL: u32 = 0xe74c3c;

pub struct WebhookNotifyAdapter {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifyAdapter {
    pub fn new(url: Option<String>) -> Self {
        WebhookNotifyAdapter {
            url,
            client: reqwest::Client::new(),
        }
    }

    fn color(severity: Severity) -> u32 {
        match severity {
            Severity::Info => COLOR_INFO,
            Severity::Warning => COLOR_WARNING,
            Severity::Critical => COLOR_CRITICAL,
        }
    }
}

#[async_trait]
impl NotifyPort for WebhookNotifyAdapter {
    async fn send(&self, title: &str, description: &str, severity: Severity) {
        let Some(url) = &self.url else {
            tracing::info!(title, description, ?severity, "notification (no webhook configured)");
            return;
        };
        let payload = json!({
            "embeds": [{
                "title": title,
                "description": description,
                "color": Self::color(severity),
            }]
        });
        match self.client.post(url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(status = %response.status(), "webhook rejected notification");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "webhook delivery failed");
            }
        }
    }
}
