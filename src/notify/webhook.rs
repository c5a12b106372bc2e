//! Feishu-style webhooks: a bot endpoint for text and a table endpoint for rows.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::Notifier;
use crate::config::NotifyConfig;

pub struct WebhookNotifier {
    bot_webhook: Option<String>,
    table_webhook: Option<String>,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Webhook client fell back to defaults");
                Client::new()
            });
        Self {
            bot_webhook: clean_url(config.bot_webhook.as_deref()),
            table_webhook: clean_url(config.table_webhook.as_deref()),
            client,
        }
    }

    /// Notifier with no endpoints; every push returns `false`.
    pub fn disabled() -> Self {
        Self::new(&NotifyConfig::default())
    }

    async fn post_json(&self, url: &str, payload: &serde_json::Value) -> bool {
        let result = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());
        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Webhook push failed");
                false
            }
        }
    }
}

fn clean_url(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// Bot message body.
pub fn text_payload(text: &str) -> serde_json::Value {
    json!({ "msg_type": "text", "content": { "text": text } })
}

/// Table append body.
pub fn rows_payload(rows: &[serde_json::Value]) -> serde_json::Value {
    json!({ "rows": rows })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_text(&self, text: &str) -> bool {
        let Some(url) = &self.bot_webhook else {
            debug!("Bot webhook not configured, skipping text push");
            return false;
        };
        self.post_json(url, &text_payload(text)).await
    }

    async fn append_rows(&self, rows: &[serde_json::Value]) -> bool {
        let Some(url) = &self.table_webhook else {
            debug!("Table webhook not configured, skipping row push");
            return false;
        };
        self.post_json(url, &rows_payload(rows)).await
    }

    fn has_text_channel(&self) -> bool {
        self.bot_webhook.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn payload_shapes() {
        assert_eq!(
            text_payload("hello"),
            json!({"msg_type": "text", "content": {"text": "hello"}})
        );
        assert_eq!(
            rows_payload(&[json!({"a": 1})]),
            json!({"rows": [{"a": 1}]})
        );
    }

    #[tokio::test]
    async fn unconfigured_pushes_return_false() {
        let notifier = WebhookNotifier::disabled();
        assert!(!notifier.has_text_channel());
        assert!(!notifier.send_text("hi").await);
        assert!(!notifier.append_rows(&[json!({})]).await);
    }

    #[test]
    fn blank_urls_count_as_unconfigured() {
        let notifier = WebhookNotifier::new(&NotifyConfig {
            bot_webhook: Some("   ".into()),
            table_webhook: None,
            push_on_run: true,
            timeout: Duration::from_secs(1),
        });
        assert!(!notifier.has_text_channel());
    }

    #[tokio::test]
    async fn unreachable_endpoint_returns_false() {
        let notifier = WebhookNotifier::new(&NotifyConfig {
            bot_webhook: Some("http://127.0.0.1:9/hook".into()),
            table_webhook: None,
            push_on_run: false,
            timeout: Duration::from_secs(2),
        });
        assert!(!notifier.send_text("hi").await);
    }
}
