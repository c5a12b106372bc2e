//! Pipeline orchestrator: one batch from mailbox to reviewable drafts.
//!
//! Stages run strictly in order and never re-enter:
//! 1. acquire (mailbox, or the demo batch when none is configured)
//! 2. stop early on an empty batch
//! 3. classify, draft and risk-flag each message in arrival order
//! 4. persist the whole batch in one ledger call, then write the export
//! 5. push rows and (optionally) a text digest
//!
//! Only acquisition and persistence failures abort a run. Everything after
//! persistence is best-effort and reported as flags on the summary.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::config::{AppConfig, ExportMode, PipelineConfig};
use crate::error::{Error, MailError, PipelineError};
use crate::llm::optional_provider;
use crate::mail::{ImapSmtpTransport, MailTransport, SharedTransport, demo_batch};
use crate::notify::{Notifier, WebhookNotifier};
use crate::pipeline::classifier::Classifier;
use crate::pipeline::reply::ReplyDrafter;
use crate::pipeline::risk::is_risky;
use crate::pipeline::types::{InboundEmail, ManualItem, RunSummary};
use crate::reporting::{Period, Reporter, archive_report};
use crate::store::{Database, ExportRow, NewReview, ReviewExporter, ReviewStatus, RiskFlag};

pub struct Orchestrator {
    pipeline: PipelineConfig,
    push_on_run: bool,
    db: Arc<dyn Database>,
    transport: Option<SharedTransport>,
    classifier: Classifier,
    drafter: ReplyDrafter,
    exporter: ReviewExporter,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        db: Arc<dyn Database>,
        transport: Option<SharedTransport>,
        classifier: Classifier,
        drafter: ReplyDrafter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pipeline: config.pipeline.clone(),
            push_on_run: config.notify.push_on_run,
            db,
            transport,
            classifier,
            drafter,
            exporter: ReviewExporter::new(&config.paths.export_dir, config.timezone),
            notifier,
        }
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(config: &AppConfig, db: Arc<dyn Database>) -> Self {
        let llm = optional_provider(config.llm.as_ref());
        let transport = config.mail.clone().map(|mail| {
            Arc::new(Mutex::new(ImapSmtpTransport::new(mail))) as SharedTransport
        });
        Self::new(
            config,
            db,
            transport,
            Classifier::new(llm.clone()),
            ReplyDrafter::new(llm, config.reply.clone()),
            Arc::new(WebhookNotifier::new(&config.notify)),
        )
    }

    /// Run one batch and print the summary marker line to stdout.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let span = info_span!("pipeline_run", run_id = %Uuid::new_v4());
        async {
            let summary = self.run_stages().await?;
            println!("{}", summary.marker_line());
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self) -> Result<RunSummary, PipelineError> {
        // 1. Acquire
        let (batch, marked_read_count) = self.acquire().await?;

        // 2. Guard empty
        if batch.is_empty() {
            info!("No messages to process");
            return Ok(RunSummary {
                marked_read_count,
                ..RunSummary::default()
            });
        }
        info!(count = batch.len(), "Processing batch");

        // 3. Per-message transform
        let mut records = Vec::with_capacity(batch.len());
        for message in &batch {
            records.push(self.transform(message).await);
        }

        // 4. Persist, then export
        self.db.save_records(&records).await?;
        let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();
        let export_path = self.export(&rows);

        // 5. Summary and notifications
        let manual_items: Vec<ManualItem> = records
            .iter()
            .filter(|r| r.risk_flag == RiskFlag::High)
            .map(|r| ManualItem {
                from: r.sender.clone(),
                subject: r.subject.clone(),
                category: r.category.clone(),
                confidence: r.confidence,
            })
            .collect();

        let mut summary = RunSummary {
            total: records.len(),
            auto_count: records.len() - manual_items.len(),
            manual_count: manual_items.len(),
            marked_read_count,
            export_path: export_path.map(|p| p.display().to_string()),
            manual_items,
            table_pushed: false,
            text_pushed: false,
        };

        let table_rows: Vec<serde_json::Value> = rows
            .iter()
            .filter_map(|row| serde_json::to_value(row).ok())
            .collect();
        summary.table_pushed = self.notifier.append_rows(&table_rows).await;

        if self.push_on_run && self.notifier.has_text_channel() {
            summary.text_pushed = self.notifier.send_text(&summary.digest_text()).await;
        }

        info!(
            total = summary.total,
            auto = summary.auto_count,
            manual = summary.manual_count,
            marked_read = summary.marked_read_count,
            table_pushed = summary.table_pushed,
            text_pushed = summary.text_pushed,
            "Pipeline run complete"
        );
        Ok(summary)
    }

    async fn acquire(&self) -> Result<(Vec<InboundEmail>, usize), PipelineError> {
        let Some(transport) = self.transport.clone() else {
            info!("Mail transport not configured, using demo batch");
            return Ok((demo_batch(), 0));
        };
        let unread_only = self.pipeline.unread_only;
        let mark_as_read = self.pipeline.mark_as_read;

        let acquired = tokio::task::spawn_blocking(move || {
            let mut transport = transport
                .lock()
                .map_err(|_| MailError::Protocol("mail transport lock poisoned".into()))?;
            transport.connect()?;
            let result = fetch_and_mark(&mut *transport, unread_only, mark_as_read);
            transport.disconnect();
            result
        })
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))??;

        Ok(acquired)
    }

    async fn transform(&self, message: &InboundEmail) -> NewReview {
        let classification = self.classifier.classify(&message.subject, &message.body).await;
        let reply = self
            .drafter
            .generate_reply(
                message,
                classification.category,
                self.pipeline.use_generative_replies,
            )
            .await;
        let risky = is_risky(classification.category, Some(classification.confidence));

        info!(
            id = %message.id,
            from = %message.from,
            category = %classification.category,
            confidence = classification.confidence,
            risky,
            "Message triaged"
        );

        NewReview {
            email_id: message.id.clone(),
            sender: message.from.clone(),
            subject: message.subject.clone(),
            category: classification.category.label().to_string(),
            confidence: classification.confidence,
            original_body: message.body.clone(),
            suggested_reply: reply,
            status: ReviewStatus::PendingReview,
            reviewer_notes: String::new(),
            received_date: message.date.clone(),
            risk_flag: RiskFlag::from_risky(risky),
        }
    }

    /// Best-effort export; `None` on any failure.
    fn export(&self, rows: &[ExportRow]) -> Option<PathBuf> {
        let result = match self.pipeline.export_mode {
            ExportMode::PerRun => self.exporter.generate_export(rows),
            ExportMode::Daily => self.exporter.append_export_rows(rows),
        };
        match result {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Export failed");
                None
            }
        }
    }

    /// Scheduled job: one run, every period report archived, digest pushed.
    ///
    /// Report and archive failures are logged; only the run itself can fail
    /// the cycle.
    pub async fn run_cycle(
        &self,
        reporter: &Reporter,
        archive_dir: &Path,
    ) -> Result<RunSummary, Error> {
        let summary = self.run().await?;

        let now = reporter.now();
        for period in Period::ALL {
            let archived = match reporter.generate_at(period, now).await {
                Ok(report) => archive_report(archive_dir, period, &report.to_string(), now),
                Err(e) => Err(e),
            };
            if let Err(e) = archived {
                warn!(period = %period, error = %e, "Period report not archived");
            }
        }

        if self.notifier.has_text_channel() {
            match reporter.daily_digest_at(now).await {
                Ok(digest) => {
                    if !self.notifier.send_text(&digest).await {
                        warn!("Daily digest push failed");
                    }
                }
                Err(e) => warn!(error = %e, "Daily digest not built"),
            }
        }

        Ok(summary)
    }
}

/// Fetch and optionally clear unread markers. Returns the batch and how many
/// markers were cleared.
fn fetch_and_mark(
    transport: &mut dyn MailTransport,
    unread_only: bool,
    mark_as_read: bool,
) -> Result<(Vec<InboundEmail>, usize), MailError> {
    let batch = transport.fetch(unread_only)?;
    let mut marked = 0;
    if mark_as_read {
        for message in &batch {
            match transport.mark_as_read(&message.id) {
                Ok(()) => marked += 1,
                Err(e) => warn!(id = %message.id, error = %e, "Failed to mark message read"),
            }
        }
    }
    Ok((batch, marked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::pipeline::types::Category;
    use crate::store::LibSqlBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Mocks ───────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingNotifier {
        texts: Mutex<Vec<String>>,
        row_batches: AtomicUsize,
        has_bot: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_text(&self, text: &str) -> bool {
            self.texts.lock().unwrap().push(text.to_string());
            self.has_bot
        }

        async fn append_rows(&self, _rows: &[serde_json::Value]) -> bool {
            self.row_batches.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn has_text_channel(&self) -> bool {
            self.has_bot
        }
    }

    struct FakeMailbox {
        messages: Vec<InboundEmail>,
        fail_connect: bool,
        marked: Vec<String>,
        disconnected: bool,
    }

    impl FakeMailbox {
        fn with(messages: Vec<InboundEmail>) -> Self {
            Self {
                messages,
                fail_connect: false,
                marked: Vec::new(),
                disconnected: false,
            }
        }
    }

    impl MailTransport for FakeMailbox {
        fn connect(&mut self) -> Result<(), MailError> {
            if self.fail_connect {
                return Err(MailError::Login {
                    user: "support@test.com".into(),
                    reason: "bad password".into(),
                });
            }
            Ok(())
        }

        fn fetch(&mut self, _unread_only: bool) -> Result<Vec<InboundEmail>, MailError> {
            Ok(self.messages.clone())
        }

        fn mark_as_read(&mut self, id: &str) -> Result<(), MailError> {
            self.marked.push(id.to_string());
            Ok(())
        }

        fn disconnect(&mut self) {
            self.disconnected = true;
        }

        fn send(&mut self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        config: AppConfig,
        db: Arc<LibSqlBackend>,
        notifier: Arc<RecordingNotifier>,
    }

    async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::offline(PathsConfig {
            db_path: dir.path().join("ledger.db"),
            export_dir: dir.path().join("exports"),
            archive_dir: dir.path().join("archive"),
            log_dir: None,
        });
        config.pipeline.use_generative_replies = false;
        Harness {
            _dir: dir,
            config,
            db: Arc::new(LibSqlBackend::new_memory().await.unwrap()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn orchestrator(h: &Harness, transport: Option<SharedTransport>) -> Orchestrator {
        Orchestrator::new(
            &h.config,
            h.db.clone(),
            transport,
            Classifier::rule_based(),
            ReplyDrafter::new(None, h.config.reply.clone()),
            h.notifier.clone(),
        )
    }

    fn shared(mailbox: FakeMailbox) -> (Arc<Mutex<FakeMailbox>>, SharedTransport) {
        let concrete = Arc::new(Mutex::new(mailbox));
        let shared: SharedTransport = concrete.clone();
        (concrete, shared)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn demo_batch_without_transport() {
        let h = harness().await;
        let summary = orchestrator(&h, None).run().await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.total, summary.auto_count + summary.manual_count);
        assert_eq!(h.db.count_reviews().await.unwrap(), 3);
        assert!(summary.export_path.is_some());
        assert!(summary.table_pushed);
        assert!(!summary.text_pushed);

        let rows = h.db.list_reviews(10).await.unwrap();
        let demo3 = rows.iter().find(|r| r.email_id == "demo-3").unwrap();
        assert_eq!(demo3.category, Category::FeatureRequest.label());
    }

    #[tokio::test]
    async fn empty_batch_has_no_side_effects() {
        let h = harness().await;
        let (_, transport) = shared(FakeMailbox::with(vec![]));
        let summary = orchestrator(&h, Some(transport)).run().await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(h.db.count_reviews().await.unwrap(), 0);
        assert!(!h.config.paths.export_dir.exists());
        assert_eq!(h.notifier.row_batches.load(Ordering::SeqCst), 0);
        assert!(h.notifier.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_failure_aborts_run() {
        let h = harness().await;
        let mut mailbox = FakeMailbox::with(vec![]);
        mailbox.fail_connect = true;
        let (_, transport) = shared(mailbox);

        let err = orchestrator(&h, Some(transport)).run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Acquire(MailError::Login { .. })));
        assert_eq!(h.db.count_reviews().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_as_read_is_counted_and_session_closed() {
        let mut h = harness().await;
        h.config.pipeline.mark_as_read = true;
        let (concrete, transport) = shared(FakeMailbox::with(vec![
            InboundEmail::new("11", "a@x.com", "Payment failed", "my payment bounced", ""),
            InboundEmail::new("12", "b@x.com", "Hello", "just saying hi", ""),
        ]));

        let summary = orchestrator(&h, Some(transport)).run().await.unwrap();
        assert_eq!(summary.marked_read_count, 2);

        let mailbox = concrete.lock().unwrap();
        assert_eq!(mailbox.marked, vec!["11", "12"]);
        assert!(mailbox.disconnected);
    }

    #[tokio::test]
    async fn risky_records_become_manual_items() {
        let h = harness().await;
        let (_, transport) = shared(FakeMailbox::with(vec![InboundEmail::new(
            "21",
            "c@x.com",
            "Hello",
            "nothing to see",
            "",
        )]));

        let summary = orchestrator(&h, Some(transport)).run().await.unwrap();
        assert_eq!(summary.manual_count, 1);
        assert_eq!(summary.manual_items[0].category, "Other");
        assert_eq!(summary.manual_items[0].confidence, 0.3);

        let row = &h.db.list_reviews(1).await.unwrap()[0];
        assert_eq!(row.risk_flag, RiskFlag::High);
        assert_eq!(row.status, ReviewStatus::PendingReview);
    }

    #[tokio::test]
    async fn push_on_run_sends_digest() {
        let mut h = harness().await;
        h.config.notify.push_on_run = true;
        h.notifier = Arc::new(RecordingNotifier {
            has_bot: true,
            ..Default::default()
        });

        let summary = orchestrator(&h, None).run().await.unwrap();
        assert!(summary.text_pushed);
        let texts = h.notifier.texts.lock().unwrap();
        assert!(texts[0].contains("Total: 3"));
    }

    #[tokio::test]
    async fn daily_export_mode_appends_to_one_file() {
        let mut h = harness().await;
        h.config.pipeline.export_mode = ExportMode::Daily;
        let orch = orchestrator(&h, None);

        let first = orch.run().await.unwrap();
        let second = orch.run().await.unwrap();
        assert_eq!(first.export_path, second.export_path);

        let path = PathBuf::from(first.export_path.unwrap());
        assert_eq!(crate::store::read_export(&path).unwrap().len(), 6);
    }

    #[tokio::test]
    async fn cycle_archives_all_periods_and_pushes_digest() {
        let mut h = harness().await;
        h.notifier = Arc::new(RecordingNotifier {
            has_bot: true,
            ..Default::default()
        });
        let orch = orchestrator(&h, None);
        let reporter = Reporter::new(h.db.clone(), h.config.timezone);

        orch.run_cycle(&reporter, &h.config.paths.archive_dir)
            .await
            .unwrap();

        let archived: Vec<_> = walk(&h.config.paths.archive_dir);
        assert_eq!(archived.len(), 4);
        let texts = h.notifier.texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Weekly trend"));
    }

    fn walk(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                files.extend(walk(&path));
            } else {
                files.push(path);
            }
        }
        files
    }
}
