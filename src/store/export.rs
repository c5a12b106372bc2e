//! Export view: reviewable CSV files rendered from ledger records.
//!
//! Two layouts share one column set:
//! - per run: `email_review_<YYYY-MM-DD_HHMMSS>.csv`, written in one go
//! - per day: `email_review_<YYYY-MM-DD>.csv`, rows appended across runs
//!
//! Reviewers edit `status` (and `reviewer_notes`) in place; `approved_rows`
//! reads those decisions back.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;
use crate::pipeline::types::truncate_chars;
use crate::store::traits::{NewReview, ReviewStatus};

/// Body prefix kept in the export, in characters.
pub const EXPORT_BODY_CHARS: usize = 500;

/// One row of the review export. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub email_id: String,
    #[serde(rename = "from")]
    pub sender: String,
    pub subject: String,
    pub category: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub confidence: Option<f64>,
    pub original_body: String,
    pub suggested_reply: String,
    pub status: String,
    #[serde(default)]
    pub reviewer_notes: String,
    #[serde(default)]
    pub received_date: String,
    #[serde(default)]
    pub risk_flag: String,
}

impl From<&NewReview> for ExportRow {
    fn from(record: &NewReview) -> Self {
        Self {
            email_id: record.email_id.clone(),
            sender: record.sender.clone(),
            subject: record.subject.clone(),
            category: record.category.clone(),
            confidence: Some(record.confidence),
            original_body: truncate_chars(&record.original_body, EXPORT_BODY_CHARS),
            suggested_reply: record.suggested_reply.clone(),
            status: record.status.as_str().to_string(),
            reviewer_notes: record.reviewer_notes.clone(),
            received_date: record.received_date.clone(),
            risk_flag: record.risk_flag.as_str().to_string(),
        }
    }
}

impl ExportRow {
    pub fn is_approved(&self) -> bool {
        ReviewStatus::parse(&self.status) == ReviewStatus::Approved
    }
}

/// Writes export files under one directory, naming them in `tz`.
#[derive(Debug, Clone)]
pub struct ReviewExporter {
    dir: PathBuf,
    tz: Tz,
}

impl ReviewExporter {
    pub fn new(dir: impl Into<PathBuf>, tz: Tz) -> Self {
        Self { dir: dir.into(), tz }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    fn ensure_dir(&self) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir).map_err(|e| ExportError::Write {
            path: self.dir.clone(),
            reason: e.to_string(),
        })
    }

    /// Write all `rows` to a new timestamped file.
    pub fn generate_export(&self, rows: &[ExportRow]) -> Result<PathBuf, ExportError> {
        self.generate_export_at(rows, self.now())
    }

    /// Same-second runs never overwrite each other; later files get a `_<n>` suffix.
    pub fn generate_export_at(
        &self,
        rows: &[ExportRow],
        at: DateTime<Tz>,
    ) -> Result<PathBuf, ExportError> {
        self.ensure_dir()?;
        let stem = format!("email_review_{}", at.format("%Y-%m-%d_%H%M%S"));
        let (path, file) = self.create_unique(&stem)?;

        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = rows.len(), "Review export written");
        Ok(path)
    }

    /// Open `<stem>.csv`, or the first free `<stem>_<n>.csv`.
    fn create_unique(&self, stem: &str) -> Result<(PathBuf, File), ExportError> {
        let mut n = 0u32;
        loop {
            let name = match n {
                0 => format!("{stem}.csv"),
                n => format!("{stem}_{n}.csv"),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => {
                    return Err(ExportError::Write {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Append one row to today's running file, writing the header only when
    /// the file is new.
    pub fn append_export_row(&self, row: &ExportRow) -> Result<PathBuf, ExportError> {
        self.append_export_rows_at(std::slice::from_ref(row), self.now())
    }

    pub fn append_export_row_at(
        &self,
        row: &ExportRow,
        at: DateTime<Tz>,
    ) -> Result<PathBuf, ExportError> {
        self.append_export_rows_at(std::slice::from_ref(row), at)
    }

    /// Append a whole batch to the day file for a single clock reading.
    pub fn append_export_rows(&self, rows: &[ExportRow]) -> Result<PathBuf, ExportError> {
        self.append_export_rows_at(rows, self.now())
    }

    pub fn append_export_rows_at(
        &self,
        rows: &[ExportRow],
        at: DateTime<Tz>,
    ) -> Result<PathBuf, ExportError> {
        self.ensure_dir()?;
        let path = self
            .dir
            .join(format!("email_review_{}.csv", at.format("%Y-%m-%d")));

        let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(path)
    }
}

/// Parse an export file back into rows.
pub fn read_export(path: &Path) -> Result<Vec<ExportRow>, ExportError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ExportError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<ExportRow>, csv::Error>>()?;
    info!(path = %path.display(), rows = rows.len(), "Review export read");
    Ok(rows)
}

/// Rows a reviewer marked `approved` (case-insensitive).
pub fn approved_rows(path: &Path) -> Result<Vec<ExportRow>, ExportError> {
    let rows = read_export(path)?;
    let total = rows.len();
    let approved: Vec<_> = rows.into_iter().filter(ExportRow::is_approved).collect();
    info!(approved = approved.len(), total, "Approved replies found");
    Ok(approved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::traits::RiskFlag;
    use chrono::TimeZone;

    fn shanghai(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        chrono_tz::Asia::Shanghai
            .with_ymd_and_hms(2026, 2, 6, h, m, s)
            .unwrap()
    }

    fn record(id: &str, body: &str) -> NewReview {
        NewReview {
            email_id: id.into(),
            sender: "c@example.com".into(),
            subject: "Invoice, \"urgent\"".into(),
            category: "Billing & Payment".into(),
            confidence: 0.2,
            original_body: body.into(),
            suggested_reply: "Line one\nLine two".into(),
            status: ReviewStatus::PendingReview,
            reviewer_notes: String::new(),
            received_date: "2026-02-06 10:02".into(),
            risk_flag: RiskFlag::High,
        }
    }

    #[test]
    fn per_run_file_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReviewExporter::new(dir.path(), chrono_tz::Asia::Shanghai);
        let rows = vec![ExportRow::from(&record("1", "b1")), ExportRow::from(&record("2", "b2"))];

        let path = exporter.generate_export_at(&rows, shanghai(9, 0, 5)).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "email_review_2026-02-06_090005.csv"
        );

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(
            "email_id,from,subject,category,confidence,original_body,suggested_reply,status,reviewer_notes,received_date,risk_flag\n"
        ));

        let back = read_export(&path).unwrap();
        assert_eq!(back, rows);
        assert_eq!(back[0].status, "pending_review");
        assert_eq!(back[0].risk_flag, "high");
    }

    #[test]
    fn same_second_exports_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReviewExporter::new(dir.path(), chrono_tz::Asia::Shanghai);
        let at = shanghai(9, 0, 5);
        let one = vec![ExportRow::from(&record("1", "a"))];
        let two = vec![ExportRow::from(&record("2", "b")), ExportRow::from(&record("3", "c"))];

        let first = exporter.generate_export_at(&one, at).unwrap();
        let second = exporter.generate_export_at(&two, at).unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("email_review_2026-02-06_090005_1.csv"));
        assert_eq!(read_export(&first).unwrap().len(), 1);
        assert_eq!(read_export(&second).unwrap().len(), 2);
    }

    #[test]
    fn batch_append_lands_in_one_day_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReviewExporter::new(dir.path(), chrono_tz::Asia::Shanghai);
        let rows = vec![ExportRow::from(&record("1", "a")), ExportRow::from(&record("2", "b"))];

        let path = exporter
            .append_export_rows_at(&rows, shanghai(23, 59, 59))
            .unwrap();
        assert!(path.ends_with("email_review_2026-02-06.csv"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(read_export(&path).unwrap(), rows);
    }

    #[test]
    fn body_is_bounded() {
        let row = ExportRow::from(&record("1", &"x".repeat(900)));
        assert_eq!(row.original_body.chars().count(), EXPORT_BODY_CHARS);
    }

    #[test]
    fn daily_file_accumulates_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReviewExporter::new(dir.path().join("out"), chrono_tz::Asia::Shanghai);

        let first = exporter
            .append_export_row_at(&ExportRow::from(&record("1", "a")), shanghai(9, 0, 0))
            .unwrap();
        let second = exporter
            .append_export_row_at(&ExportRow::from(&record("2", "b")), shanghai(18, 30, 0))
            .unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with("email_review_2026-02-06.csv"));

        let content = fs::read_to_string(&first).unwrap();
        assert_eq!(content.matches("email_id,from").count(), 1);
        assert_eq!(read_export(&first).unwrap().len(), 2);
    }

    #[test]
    fn approved_rows_filters_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviewed.csv");
        fs::write(
            &path,
            "email_id,from,subject,category,confidence,original_body,suggested_reply,status,reviewer_notes,received_date,risk_flag\n\
             1,a@x.com,S1,Other,0.3,b,r1,Approved,ok,d,high\n\
             2,b@x.com,S2,Other,,b,r2,rejected,,d,high\n\
             3,c@x.com,S3,Other,0.9,b,r3,APPROVED,,d,low\n",
        )
        .unwrap();

        let approved = approved_rows(&path).unwrap();
        let ids: Vec<_> = approved.iter().map(|r| r.email_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(approved[0].reviewer_notes, "ok");
    }

    #[test]
    fn blank_confidence_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        fs::write(
            &path,
            "email_id,from,subject,category,confidence,original_body,suggested_reply,status\n\
             1,a@x.com,S,Other,,b,r,pending_review\n",
        )
        .unwrap();
        let rows = read_export(&path).unwrap();
        assert_eq!(rows[0].confidence, None);
        assert_eq!(rows[0].risk_flag, "");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = read_export(Path::new("/nonexistent/export.csv")).unwrap_err();
        assert!(matches!(err, ExportError::Read { .. }));
    }
}
