//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Timestamps are written as
//! RFC 3339 with an explicit offset in the configured timezone, and window
//! queries compare through `julianday()` so rows written under different
//! offsets still order correctly.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use chrono_tz::Tz;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{
    Database, NewReview, PeriodCounts, ReviewRecord, ReviewStatus, RiskFlag, ScenarioSeed,
    ScenarioTemplate,
};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    tz: Tz,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            tz: Tz::UTC,
        })
    }

    /// Zone used to stamp `created_at`/`updated_at`.
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz).fixed_offset()
    }
}

// ── Helper functions ────────────────────────────────────────────────

fn timestamp(at: DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// NULL-tolerant text column (legacy rows may leave fields unset).
fn text(row: &libsql::Row, idx: i32) -> String {
    row.get::<String>(idx).unwrap_or_default()
}

async fn scalar_i64(
    conn: &Connection,
    sql: &str,
    params: impl libsql::params::IntoParams,
    what: &str,
) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(sql, params)
        .await
        .map_err(|e| DatabaseError::Query(format!("{what}: {e}")))?;
    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("{what}: {e}")))?;
    match row {
        Some(row) => row
            .get::<i64>(0)
            .map_err(|e| DatabaseError::Query(format!("{what}: {e}"))),
        None => Ok(0),
    }
}

const REVIEW_COLUMNS: &str = "id, email_id, sender, subject, category, confidence, \
     original_body, suggested_reply, status, reviewer_notes, received_date, risk_flag, created_at";

/// Column order matches `REVIEW_COLUMNS`.
fn row_to_review(row: &libsql::Row) -> Result<ReviewRecord, libsql::Error> {
    Ok(ReviewRecord {
        id: row.get(0)?,
        email_id: text(row, 1),
        sender: text(row, 2),
        subject: text(row, 3),
        category: text(row, 4),
        confidence: row.get::<f64>(5).unwrap_or(0.0),
        original_body: text(row, 6),
        suggested_reply: text(row, 7),
        status: ReviewStatus::parse(&text(row, 8)),
        reviewer_notes: text(row, 9),
        received_date: text(row, 10),
        risk_flag: RiskFlag::parse(&text(row, 11)),
        created_at: text(row, 12),
    })
}

const TEMPLATE_COLUMNS: &str =
    "scenario_key, tags, language, title, reply_template, created_at, updated_at";

fn row_to_template(row: &libsql::Row) -> Result<ScenarioTemplate, libsql::Error> {
    Ok(ScenarioTemplate {
        scenario_key: row.get(0)?,
        tags: text(row, 1),
        language: text(row, 2),
        title: text(row, 3),
        reply_template: text(row, 4),
        created_at: text(row, 5),
        updated_at: text(row, 6),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Review ledger ───────────────────────────────────────────────

    async fn save_records(&self, records: &[NewReview]) -> Result<usize, DatabaseError> {
        self.save_records_at(records, self.now()).await
    }

    async fn save_records_at(
        &self,
        records: &[NewReview],
        created_at: DateTime<FixedOffset>,
    ) -> Result<usize, DatabaseError> {
        if records.is_empty() {
            return Ok(0);
        }
        let created_at = timestamp(created_at);

        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("save_records: begin: {e}")))?;

        for record in records {
            tx.execute(
                "INSERT INTO email_reviews (
                    email_id, sender, subject, category, confidence, original_body,
                    suggested_reply, status, reviewer_notes, received_date, risk_flag, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.email_id.as_str(),
                    record.sender.as_str(),
                    record.subject.as_str(),
                    record.category.as_str(),
                    record.confidence,
                    record.original_body.as_str(),
                    record.suggested_reply.as_str(),
                    record.status.as_str(),
                    record.reviewer_notes.as_str(),
                    record.received_date.as_str(),
                    record.risk_flag.as_str(),
                    created_at.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_records: {e}")))?;
        }

        // Dropping an uncommitted transaction rolls it back.
        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("save_records: commit: {e}")))?;

        debug!(count = records.len(), created_at = %created_at, "Review records saved");
        Ok(records.len())
    }

    async fn list_reviews(&self, limit: usize) -> Result<Vec<ReviewRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {REVIEW_COLUMNS} FROM email_reviews ORDER BY id DESC LIMIT ?1"),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_reviews: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_reviews: {e}")))?
        {
            records.push(
                row_to_review(&row)
                    .map_err(|e| DatabaseError::Query(format!("list_reviews: {e}")))?,
            );
        }
        Ok(records)
    }

    async fn count_reviews(&self) -> Result<i64, DatabaseError> {
        scalar_i64(
            self.conn(),
            "SELECT COUNT(*) FROM email_reviews",
            (),
            "count_reviews",
        )
        .await
    }

    async fn period_counts(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<PeriodCounts, DatabaseError> {
        let start = timestamp(start);
        let end = timestamp(end);
        const WINDOW: &str =
            "julianday(created_at) >= julianday(?1) AND julianday(created_at) < julianday(?2)";

        let total = scalar_i64(
            self.conn(),
            &format!("SELECT COUNT(*) FROM email_reviews WHERE {WINDOW}"),
            params![start.as_str(), end.as_str()],
            "period_counts: total",
        )
        .await?;

        let risky = scalar_i64(
            self.conn(),
            &format!(
                "SELECT COUNT(*) FROM email_reviews WHERE {WINDOW} \
                 AND lower(risk_flag) IN ('high', 'true', '1')"
            ),
            params![start.as_str(), end.as_str()],
            "period_counts: risky",
        )
        .await?;

        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT COALESCE(category, '') AS cat, COUNT(*) AS c FROM email_reviews \
                     WHERE {WINDOW} GROUP BY cat ORDER BY c DESC, MIN(id) ASC"
                ),
                params![start.as_str(), end.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("period_counts: categories: {e}")))?;

        let mut by_category = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("period_counts: categories: {e}")))?
        {
            let count: i64 = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("period_counts: categories: {e}")))?;
            by_category.push((text(&row, 0), count));
        }

        Ok(PeriodCounts {
            total,
            risky,
            by_category,
        })
    }

    // ── Situation library ───────────────────────────────────────────

    async fn seed_situation_library_if_empty(
        &self,
        seeds: &[ScenarioSeed],
    ) -> Result<usize, DatabaseError> {
        if self.count_templates().await? > 0 {
            return Ok(0);
        }
        let now = timestamp(self.now());

        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("seed_situation_library: begin: {e}")))?;

        let mut inserted = 0;
        for seed in seeds {
            inserted += tx
                .execute(
                    "INSERT OR IGNORE INTO scenario_templates
                        (scenario_key, tags, language, title, reply_template, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![
                        seed.key,
                        seed.tags,
                        seed.language,
                        seed.title,
                        seed.reply_template,
                        now.as_str(),
                    ],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("seed_situation_library: {e}")))?
                as usize;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("seed_situation_library: commit: {e}")))?;

        info!(inserted, "Situation library seeded");
        Ok(inserted)
    }

    async fn upsert_template(
        &self,
        key: &str,
        tags: &str,
        language: &str,
        title: &str,
        reply_template: &str,
    ) -> Result<(), DatabaseError> {
        let now = timestamp(self.now());
        self.conn()
            .execute(
                "INSERT INTO scenario_templates
                    (scenario_key, tags, language, title, reply_template, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(scenario_key) DO UPDATE SET
                    tags = excluded.tags,
                    language = excluded.language,
                    title = excluded.title,
                    reply_template = excluded.reply_template,
                    updated_at = excluded.updated_at",
                params![key, tags, language, title, reply_template, now.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_template: {e}")))?;
        Ok(())
    }

    async fn get_template(&self, key: &str) -> Result<Option<ScenarioTemplate>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM scenario_templates WHERE scenario_key = ?1"),
                params![key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_template: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_template: {e}")))?
        {
            Some(row) => Ok(Some(
                row_to_template(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_template: {e}")))?,
            )),
            None => Ok(None),
        }
    }

    async fn list_templates(&self) -> Result<Vec<ScenarioTemplate>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM scenario_templates ORDER BY scenario_key"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_templates: {e}")))?;

        let mut templates = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_templates: {e}")))?
        {
            templates.push(
                row_to_template(&row)
                    .map_err(|e| DatabaseError::Query(format!("list_templates: {e}")))?,
            );
        }
        Ok(templates)
    }

    async fn count_templates(&self) -> Result<i64, DatabaseError> {
        scalar_i64(
            self.conn(),
            "SELECT COUNT(*) FROM scenario_templates",
            (),
            "count_templates",
        )
        .await
    }
}
