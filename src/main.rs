use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use support_triage::config::AppConfig;
use support_triage::library;
use support_triage::llm::{ChatMessage, CompletionRequest, optional_provider};
use support_triage::mail::{ImapSmtpTransport, MailTransport, reply_subject};
use support_triage::pipeline::Orchestrator;
use support_triage::reporting::{Period, Reporter, archive_report};
use support_triage::scheduler::Scheduler;
use support_triage::store::{Database, LibSqlBackend, approved_rows};

#[derive(Debug, Parser)]
#[command(name = "support-triage", version, about = "Customer support email triage")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process one batch and print the run summary marker.
    Run,
    /// Run the daily cycle (batch + report archive + digest) until Ctrl-C.
    Schedule,
    /// Print a period report.
    Report {
        /// daily, weekly, monthly or yearly
        period: String,
        /// Also write the report into the archive.
        #[arg(long)]
        archive: bool,
    },
    /// Load the built-in situation library if it is empty.
    Seed,
    /// Send the suggested reply of every approved row in an export file.
    SendApproved { path: PathBuf },
    /// Check mailbox and LLM connectivity.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(config.paths.log_dir.as_deref());

    let db = open_database(&config).await?;
    let seeded = library::ensure_seeded(db.as_ref()).await?;

    match cli.command {
        Command::Run => {
            Orchestrator::from_config(&config, db).run().await?;
        }
        Command::Schedule => {
            let orchestrator = Orchestrator::from_config(&config, Arc::clone(&db));
            let reporter = Reporter::new(db, config.timezone);
            let archive_dir = config.paths.archive_dir.as_path();
            let (orchestrator, reporter) = (&orchestrator, &reporter);

            let mut scheduler = Scheduler::new(config.schedule.clone(), config.timezone);
            scheduler
                .run_forever(move || async move {
                    orchestrator
                        .run_cycle(reporter, archive_dir)
                        .await
                        .map(|_| ())
                })
                .await;
        }
        Command::Report { period, archive } => {
            let period: Period = period.parse()?;
            let reporter = Reporter::new(db, config.timezone);
            let now = reporter.now();
            let text = reporter.generate_at(period, now).await?.to_string();
            println!("{text}");
            if archive {
                let path = archive_report(&config.paths.archive_dir, period, &text, now)?;
                eprintln!("Archived to {}", path.display());
            }
        }
        Command::Seed => {
            let total = db.count_templates().await?;
            println!("Seeded {seeded} scenarios ({total} in library)");
        }
        Command::SendApproved { path } => send_approved(&config, &path).await?,
        Command::Check => check(&config).await,
    }

    Ok(())
}

/// Stderr logging, plus a daily-rolling file when a log directory is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "support-triage.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file_layer)
        .init();
    guard
}

async fn open_database(config: &AppConfig) -> anyhow::Result<Arc<dyn Database>> {
    let path = &config.paths.db_path;
    let backend = LibSqlBackend::new_local(path)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))?
        .with_timezone(config.timezone);
    tracing::debug!(path = %path.display(), "Ledger opened");
    Ok(Arc::new(backend))
}

async fn send_approved(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let mail = config
        .require_mail()
        .context("send-approved needs IMAP_SERVER, EMAIL_ADDRESS and EMAIL_APP_PASSWORD")?
        .clone();
    let rows = approved_rows(path)?;
    if rows.is_empty() {
        println!("No approved rows in {}", path.display());
        return Ok(());
    }

    let (sent, failed) = tokio::task::spawn_blocking(move || {
        let mut transport = ImapSmtpTransport::new(mail);
        let (mut sent, mut failed) = (0usize, 0usize);
        for row in &rows {
            match transport.send(&row.sender, &reply_subject(&row.subject), &row.suggested_reply) {
                Ok(()) => {
                    tracing::info!(to = %row.sender, email_id = %row.email_id, "Reply sent");
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!(to = %row.sender, error = %e, "Reply not sent");
                    failed += 1;
                }
            }
        }
        (sent, failed)
    })
    .await?;

    println!("Sent: {sent}, failed: {failed}");
    Ok(())
}

/// Report mailbox and LLM reachability independently.
async fn check(config: &AppConfig) {
    match config.mail.clone() {
        Some(mail) => {
            let result = tokio::task::spawn_blocking(move || {
                let mut transport = ImapSmtpTransport::new(mail);
                transport.connect()?;
                transport.disconnect();
                Ok::<(), support_triage::error::MailError>(())
            })
            .await;
            match result {
                Ok(Ok(())) => println!("Mailbox: ok"),
                Ok(Err(e)) => println!("Mailbox: failed ({e})"),
                Err(e) => println!("Mailbox: failed ({e})"),
            }
        }
        None => println!("Mailbox: not configured"),
    }

    match optional_provider(config.llm.as_ref()) {
        Some(llm) => {
            let request = CompletionRequest::new(vec![ChatMessage::user(
                "Reply with the single word: pong",
            )])
            .with_max_tokens(5);
            match llm.complete(request).await {
                Ok(resp) => println!("LLM ({}): ok, replied {:?}", llm.model_name(), resp.content.trim()),
                Err(e) => println!("LLM ({}): failed ({e})", llm.model_name()),
            }
        }
        None => println!("LLM: not configured"),
    }
}
