//! Mail transport: IMAP for inbound, SMTP via lettre for outbound.
//!
//! [`MailTransport`] is blocking; async callers run it inside
//! `tokio::task::spawn_blocking`.

pub mod imap;

pub use imap::ImapSmtpTransport;

use std::sync::{Arc, Mutex};

use crate::error::MailError;
use crate::pipeline::types::InboundEmail;

/// Mailbox access used by the pipeline and the manual send path.
pub trait MailTransport: Send {
    /// Open and authenticate the inbound session.
    fn connect(&mut self) -> Result<(), MailError>;

    /// Messages from the inbox, oldest first. Does not change read state.
    fn fetch(&mut self, unread_only: bool) -> Result<Vec<InboundEmail>, MailError>;

    /// Clear the unread marker of a message returned by `fetch`.
    fn mark_as_read(&mut self, id: &str) -> Result<(), MailError>;

    /// Close the inbound session. Never fails; errors are logged.
    fn disconnect(&mut self);

    /// Send one plain-text message.
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Transport shared between the async orchestrator and blocking workers.
pub type SharedTransport = Arc<Mutex<dyn MailTransport>>;

/// `Re: <subject>` unless the subject already carries a reply prefix.
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.to_lowercase().starts_with("re:") {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}

/// Fixed batch used when no mailbox is configured.
pub fn demo_batch() -> Vec<InboundEmail> {
    vec![
        InboundEmail::new(
            "demo-1",
            "customer1@example.com",
            "Login error",
            "I cannot log in to my account. The app keeps showing an error.",
            "2026-02-06 09:15",
        ),
        InboundEmail::new(
            "demo-2",
            "customer2@example.com",
            "Invoice request",
            "Could you send me a copy of last month's invoice?",
            "2026-02-06 10:02",
        ),
        InboundEmail::new(
            "demo-3",
            "customer3@example.com",
            "Feature request: dark mode",
            "It would be great if the app had a dark mode option.",
            "2026-02-06 10:25",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_subject_prefixes_once() {
        assert_eq!(reply_subject("Login Error"), "Re: Login Error");
        assert_eq!(reply_subject("RE: Login Error"), "RE: Login Error");
        assert_eq!(reply_subject("re:x"), "re:x");
        assert_eq!(reply_subject("Regarding invoice"), "Re: Regarding invoice");
    }

    #[test]
    fn demo_batch_is_fixed() {
        let batch = demo_batch();
        let ids: Vec<_> = batch.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["demo-1", "demo-2", "demo-3"]);
        assert_eq!(batch[2].subject, "Feature request: dark mode");
    }
}
