//! `Database` trait: single async interface for ledger and library persistence.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::DatabaseError;

/// Lifecycle status of a review record.
///
/// The pipeline only ever writes `PendingReview`; the other states are set
/// by a human reviewer, in the export file or directly in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewStatus {
    #[default]
    PendingReview,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Case-insensitive parse; anything unrecognised is pending.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::PendingReview,
        }
    }
}

/// Whether a record must be looked at by a human before replying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFlag {
    Low,
    High,
}

impl RiskFlag {
    pub fn from_risky(risky: bool) -> Self {
        if risky { Self::High } else { Self::Low }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }

    /// Legacy rows may carry `true`/`1` instead of `high`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "true" | "1" => Self::High,
            _ => Self::Low,
        }
    }
}

/// A review record before it is written; the ledger assigns id and created_at.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub email_id: String,
    pub sender: String,
    pub subject: String,
    pub category: String,
    pub confidence: f64,
    pub original_body: String,
    pub suggested_reply: String,
    pub status: ReviewStatus,
    pub reviewer_notes: String,
    pub received_date: String,
    pub risk_flag: RiskFlag,
}

/// A persisted review record.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub id: i64,
    pub email_id: String,
    pub sender: String,
    pub subject: String,
    pub category: String,
    pub confidence: f64,
    pub original_body: String,
    pub suggested_reply: String,
    pub status: ReviewStatus,
    pub reviewer_notes: String,
    pub received_date: String,
    pub risk_flag: RiskFlag,
    /// RFC 3339 in the report timezone.
    pub created_at: String,
}

/// A built-in situation library entry.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioSeed {
    pub key: &'static str,
    pub tags: &'static str,
    pub language: &'static str,
    pub title: &'static str,
    pub reply_template: &'static str,
}

/// A persisted situation library entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTemplate {
    pub scenario_key: String,
    pub tags: String,
    pub language: String,
    pub title: String,
    pub reply_template: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Aggregates over a created_at window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodCounts {
    pub total: i64,
    /// Rows whose risk flag reads as high.
    pub risky: i64,
    /// `(category, count)`, highest count first.
    pub by_category: Vec<(String, i64)>,
}

/// Backend-agnostic persistence for the review ledger and situation library.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Review ledger ───────────────────────────────────────────────

    /// Append a batch atomically, stamping every row with the current time.
    async fn save_records(&self, records: &[NewReview]) -> Result<usize, DatabaseError>;

    /// Append a batch atomically with an explicit shared `created_at`.
    async fn save_records_at(
        &self,
        records: &[NewReview],
        created_at: DateTime<FixedOffset>,
    ) -> Result<usize, DatabaseError>;

    /// Most recent records first, up to `limit`.
    async fn list_reviews(&self, limit: usize) -> Result<Vec<ReviewRecord>, DatabaseError>;

    async fn count_reviews(&self) -> Result<i64, DatabaseError>;

    /// Totals for rows with `start <= created_at < end`.
    async fn period_counts(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<PeriodCounts, DatabaseError>;

    // ── Situation library ───────────────────────────────────────────

    /// Insert `seeds` only if the library is empty. Returns rows inserted.
    async fn seed_situation_library_if_empty(
        &self,
        seeds: &[ScenarioSeed],
    ) -> Result<usize, DatabaseError>;

    /// Insert or overwrite the template for `key`.
    async fn upsert_template(
        &self,
        key: &str,
        tags: &str,
        language: &str,
        title: &str,
        reply_template: &str,
    ) -> Result<(), DatabaseError>;

    async fn get_template(&self, key: &str) -> Result<Option<ScenarioTemplate>, DatabaseError>;

    /// All templates ordered by key.
    async fn list_templates(&self) -> Result<Vec<ScenarioTemplate>, DatabaseError>;

    async fn count_templates(&self) -> Result<i64, DatabaseError>;
}
