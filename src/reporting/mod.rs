//! Period reports over the review ledger, plus dated archiving.
//!
//! A period is a trailing window `[now - N days, now)` evaluated in the
//! configured timezone. Reports are plain text meant for people; nothing
//! parses them back.

pub mod archive;

pub use archive::archive_report;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::ReportError;
use crate::store::Database;

/// Label used for rows with an empty category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Header of the composed daily digest.
pub const DIGEST_HEADER: &str = "After-sales daily report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Daily, Period::Weekly, Period::Monthly, Period::Yearly];

    pub fn days(&self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Yearly => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(ReportError::UnknownPeriod(other.to_string())),
        }
    }
}

/// Aggregates for one period window.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReport {
    pub period: Period,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub total: i64,
    pub manual: i64,
    pub auto: i64,
    /// Highest count first.
    pub by_category: Vec<(String, i64)>,
}

impl fmt::Display for PeriodReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} ~ {}",
            self.period,
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )?;
        writeln!(f, "Total: {}", self.total)?;
        writeln!(f, "LLM/auto handled: {}", self.auto)?;
        writeln!(f, "Need manual follow-up: {}", self.manual)?;
        write!(f, "Category breakdown:")?;
        for (category, count) in &self.by_category {
            let label = if category.trim().is_empty() {
                UNCATEGORIZED
            } else {
                category.as_str()
            };
            write!(f, "\n- {label}: {count}")?;
        }
        Ok(())
    }
}

/// Builds period reports from the ledger.
pub struct Reporter {
    db: Arc<dyn Database>,
    tz: Tz,
}

impl Reporter {
    pub fn new(db: Arc<dyn Database>, tz: Tz) -> Self {
        Self { db, tz }
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    pub async fn generate(&self, period: Period) -> Result<PeriodReport, ReportError> {
        self.generate_at(period, self.now()).await
    }

    /// Report for the window ending at `now`.
    pub async fn generate_at(
        &self,
        period: Period,
        now: DateTime<Tz>,
    ) -> Result<PeriodReport, ReportError> {
        let end = now;
        let start = end - Duration::days(period.days());
        let counts = self
            .db
            .period_counts(start.fixed_offset(), end.fixed_offset())
            .await?;

        tracing::debug!(
            period = %period,
            total = counts.total,
            risky = counts.risky,
            "Period report generated"
        );

        Ok(PeriodReport {
            period,
            start,
            end,
            total: counts.total,
            manual: counts.risky,
            auto: counts.total - counts.risky,
            by_category: counts.by_category,
        })
    }

    /// Daily report followed by the weekly trend, ready to push.
    pub async fn daily_digest(&self) -> Result<String, ReportError> {
        self.daily_digest_at(self.now()).await
    }

    pub async fn daily_digest_at(&self, now: DateTime<Tz>) -> Result<String, ReportError> {
        let daily = self.generate_at(Period::Daily, now).await?;
        let weekly = self.generate_at(Period::Weekly, now).await?;
        Ok(format!(
            "{DIGEST_HEADER}\n\n{daily}\n\n---\n\nWeekly trend\n{weekly}"
        ))
    }
}
