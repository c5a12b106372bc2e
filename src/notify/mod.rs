//! Notification collaborator: best-effort pushes to chat and table webhooks.
//!
//! Both operations report success as a `bool` and never fail the caller.

pub mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a plain-text message. `false` when unconfigured or on any failure.
    async fn send_text(&self, text: &str) -> bool;

    /// Append structured rows to the external table. Same contract as `send_text`.
    async fn append_rows(&self, rows: &[serde_json::Value]) -> bool;

    /// Whether `send_text` has anywhere to go.
    fn has_text_channel(&self) -> bool;
}
