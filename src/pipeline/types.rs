//! Shared types for the triage pipeline.

use serde::{Deserialize, Serialize};

// ── Inbound message ─────────────────────────────────────────────────

/// Maximum inbound body length kept after acquisition, in characters.
pub const BODY_MAX_CHARS: usize = 1000;

/// A customer message as delivered by the mail transport.
///
/// Read-only input to the pipeline; never persisted as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEmail {
    /// Transport-native identifier (IMAP sequence number, demo id, ...).
    pub id: String,
    /// Sender address.
    pub from: String,
    pub subject: String,
    /// Body text, trimmed and bounded to [`BODY_MAX_CHARS`].
    pub body: String,
    /// Received timestamp as reported by the source.
    pub date: String,
}

impl InboundEmail {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body: &str,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            subject: subject.into(),
            body: truncate_chars(body.trim(), BODY_MAX_CHARS),
            date: date.into(),
        }
    }
}

/// First `max` characters of `s` (char-boundary safe).
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ── Category ────────────────────────────────────────────────────────

/// Closed set of support categories plus the `Other` overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Technical Issue")]
    TechnicalIssue,
    #[serde(rename = "Billing & Payment")]
    BillingPayment,
    #[serde(rename = "Product Inquiry")]
    ProductInquiry,
    #[serde(rename = "Feature Request")]
    FeatureRequest,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    /// Fixed enumeration order. Rule-based tie-breaks follow this order.
    pub const ALL: [Category; 5] = [
        Category::TechnicalIssue,
        Category::BillingPayment,
        Category::ProductInquiry,
        Category::FeatureRequest,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TechnicalIssue => "Technical Issue",
            Self::BillingPayment => "Billing & Payment",
            Self::ProductInquiry => "Product Inquiry",
            Self::FeatureRequest => "Feature Request",
            Self::Other => "Other",
        }
    }

    /// Exact label match; anything unrecognised is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label.trim())
    }

    /// Label match that folds unknown labels into `Other`.
    pub fn normalize(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub category: Category,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

// ── Run summary ─────────────────────────────────────────────────────

/// A record that needs a human before any reply goes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualItem {
    pub from: String,
    pub subject: String,
    pub category: String,
    pub confidence: f64,
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub auto_count: usize,
    pub manual_count: usize,
    pub marked_read_count: usize,
    pub export_path: Option<String>,
    pub manual_items: Vec<ManualItem>,
    pub table_pushed: bool,
    pub text_pushed: bool,
}

/// Prefix of the single machine-readable stdout line per run.
pub const RUN_SUMMARY_MARKER: &str = "RUN_SUMMARY_JSON:";

impl RunSummary {
    /// The marker line: `RUN_SUMMARY_JSON: {...}`, always a single line.
    pub fn marker_line(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("{RUN_SUMMARY_MARKER} {json}")
    }

    /// Parse the summary out of mixed log output.
    pub fn from_output(output: &str) -> Option<Self> {
        output
            .lines()
            .find_map(|line| line.strip_prefix(RUN_SUMMARY_MARKER))
            .and_then(|raw| serde_json::from_str(raw.trim()).ok())
    }

    /// Human-readable digest for the messaging collaborator.
    pub fn digest_text(&self) -> String {
        let mut text = format!(
            "Support pipeline run\nTotal: {}\nAuto drafted: {}\nNeed manual follow-up: {}\nMarked read: {}",
            self.total, self.auto_count, self.manual_count, self.marked_read_count
        );
        if let Some(ref path) = self.export_path {
            text.push_str(&format!("\nExport: {path}"));
        }
        for item in &self.manual_items {
            text.push_str(&format!(
                "\n- {} | {} | {} ({:.2})",
                item.from, item.subject, item.category, item.confidence
            ));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_label(c.label()), Some(c));
        }
    }

    #[test]
    fn unknown_label_normalizes_to_other() {
        assert_eq!(Category::normalize("Shipping"), Category::Other);
        assert_eq!(Category::normalize(" Feature Request "), Category::FeatureRequest);
        assert_eq!(Category::from_label("technical issue"), None);
    }

    #[test]
    fn category_serializes_as_label() {
        let json = serde_json::to_string(&Category::BillingPayment).unwrap();
        assert_eq!(json, "\"Billing & Payment\"");
    }

    #[test]
    fn inbound_body_is_trimmed_and_bounded() {
        let body = format!("  {}  ", "é".repeat(1500));
        let msg = InboundEmail::new("1", "a@b.c", "s", &body, "");
        assert_eq!(msg.body.chars().count(), BODY_MAX_CHARS);
        assert!(msg.body.starts_with('é'));
    }

    #[test]
    fn marker_line_is_single_line_and_parses_back() {
        let summary = RunSummary {
            total: 2,
            auto_count: 1,
            manual_count: 1,
            manual_items: vec![ManualItem {
                from: "x@y.z".into(),
                subject: "multi\nline".into(),
                category: "Other".into(),
                confidence: 0.3,
            }],
            ..Default::default()
        };
        let line = summary.marker_line();
        assert!(line.starts_with("RUN_SUMMARY_JSON: "));
        assert!(!line.contains('\n'));

        let output = format!("INFO something\n{line}\nINFO done");
        assert_eq!(RunSummary::from_output(&output), Some(summary));
    }

    #[test]
    fn digest_lists_manual_items() {
        let summary = RunSummary {
            total: 1,
            manual_count: 1,
            manual_items: vec![ManualItem {
                from: "c@x.com".into(),
                subject: "Help".into(),
                category: "Other".into(),
                confidence: 0.3,
            }],
            ..Default::default()
        };
        let text = summary.digest_text();
        assert!(text.contains("Need manual follow-up: 1"));
        assert!(text.contains("c@x.com | Help | Other (0.30)"));
    }
}
