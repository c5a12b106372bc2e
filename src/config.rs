//! Configuration types.
//!
//! Everything is read once from the environment at start-up into an
//! [`AppConfig`] and handed to components by reference. Nothing below
//! consults the environment after that.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use secrecy::SecretString;

use crate::error::{ConfigError, MailError};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for classification and drafting.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Mailbox configuration (IMAP inbound, SMTP outbound).
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub imap_use_ssl: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_use_tls: bool,
    pub address: String,
    pub password: SecretString,
}

impl MailConfig {
    /// Returns `None` unless server, address and password are all set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let imap_host = env_string("IMAP_SERVER").unwrap_or_default();
        let address = env_string("EMAIL_ADDRESS").unwrap_or_default();
        let password = env_string("EMAIL_APP_PASSWORD").unwrap_or_default();
        if imap_host.is_empty() || address.is_empty() || password.is_empty() {
            return Ok(None);
        }

        let smtp_host =
            env_string("SMTP_SERVER").unwrap_or_else(|| imap_host.replace("imap", "smtp"));

        Ok(Some(Self {
            imap_port: env_parse("IMAP_PORT", 993)?,
            imap_use_ssl: env_bool("IMAP_USE_SSL", true),
            smtp_host,
            smtp_port: env_parse("SMTP_PORT", 587)?,
            smtp_use_tls: env_bool("SMTP_USE_TLS", true),
            imap_host,
            address,
            password: SecretString::from(password),
        }))
    }
}

/// Generative completion configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Returns `None` when no API key is configured.
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let api_key = env_string("OPENAI_API_KEY")?;
        Some(Self {
            api_key: SecretString::from(api_key),
            base_url: env_string("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout,
        })
    }
}

/// Reply drafting configuration.
#[derive(Debug, Clone)]
pub struct ReplyConfig {
    /// User-supplied reply template with `{placeholder}` fields.
    pub template: Option<String>,
    pub tone: String,
    pub signature: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            template: None,
            tone: "professional, friendly, patient".to_string(),
            signature: "Customer Support Team".to_string(),
        }
    }
}

impl ReplyConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            template: env_string("REPLY_TEMPLATE"),
            tone: env_string("TONE_GUIDANCE").unwrap_or(defaults.tone),
            signature: env_string("DEFAULT_SIGNATURE").unwrap_or(defaults.signature),
        }
    }
}

/// Webhook endpoints for the notification collaborator.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub bot_webhook: Option<String>,
    pub table_webhook: Option<String>,
    /// Push a text digest after every orchestrator run.
    pub push_on_run: bool,
    pub timeout: Duration,
}

impl NotifyConfig {
    pub fn from_env(timeout: Duration) -> Self {
        Self {
            bot_webhook: env_string("FEISHU_BOT_WEBHOOK"),
            table_webhook: env_string("FEISHU_TABLE_WEBHOOK"),
            push_on_run: env_bool("PUSH_ON_RUN", false),
            timeout,
        }
    }
}

/// How the export view is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// One timestamped file per run.
    #[default]
    PerRun,
    /// One running file per calendar day, rows appended.
    Daily,
}

impl std::str::FromStr for ExportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_run" | "run" => Ok(Self::PerRun),
            "daily" | "day" => Ok(Self::Daily),
            other => Err(ConfigError::InvalidValue {
                key: "EXPORT_MODE".into(),
                message: format!("expected per_run or daily, got '{other}'"),
            }),
        }
    }
}

/// Orchestrator behaviour switches.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub unread_only: bool,
    pub mark_as_read: bool,
    pub use_generative_replies: bool,
    pub export_mode: ExportMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unread_only: true,
            mark_as_read: false,
            use_generative_replies: true,
            export_mode: ExportMode::PerRun,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/aftersale.db"),
            export_dir: PathBuf::from("review_output"),
            archive_dir: PathBuf::from("archive"),
            log_dir: None,
        }
    }
}

/// Daily trigger configuration.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
    pub poll_interval: Duration,
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: 9,
            minute: 0,
            poll_interval: Duration::from_secs(20),
            run_on_start: false,
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mail: Option<MailConfig>,
    pub llm: Option<LlmConfig>,
    pub reply: ReplyConfig,
    pub notify: NotifyConfig,
    pub pipeline: PipelineConfig,
    pub paths: PathsConfig,
    pub schedule: ScheduleConfig,
    /// Named zone used for report windows, archive paths and the scheduler.
    pub timezone: Tz,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_timeout = Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", 20u64)?);

        let timezone = match env_string("REPORT_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
                key: "REPORT_TIMEZONE".into(),
                message: e.to_string(),
            })?,
            None => chrono_tz::Asia::Shanghai,
        };

        let hour: u32 = env_parse("SCHEDULE_HOUR", 9)?;
        let minute: u32 = env_parse("SCHEDULE_MINUTE", 0)?;
        if hour > 23 || minute > 59 {
            return Err(ConfigError::InvalidValue {
                key: "SCHEDULE_HOUR/SCHEDULE_MINUTE".into(),
                message: format!("{hour:02}:{minute:02} is not a time of day"),
            });
        }

        let export_mode = match env_string("EXPORT_MODE") {
            Some(s) => s.parse()?,
            None => ExportMode::default(),
        };

        let path_defaults = PathsConfig::default();

        Ok(Self {
            mail: MailConfig::from_env()?,
            llm: LlmConfig::from_env(http_timeout),
            reply: ReplyConfig::from_env(),
            notify: NotifyConfig::from_env(http_timeout),
            pipeline: PipelineConfig {
                unread_only: env_bool("PROCESS_UNSEEN_ONLY", true),
                mark_as_read: env_bool("MARK_AS_READ", false),
                use_generative_replies: env_bool("USE_LLM_REPLIES", true),
                export_mode,
            },
            paths: PathsConfig {
                db_path: env_string("SQLITE_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(path_defaults.db_path),
                export_dir: env_string("CSV_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(path_defaults.export_dir),
                archive_dir: env_string("ARCHIVE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(path_defaults.archive_dir),
                log_dir: env_string("SUPPORT_TRIAGE_LOG_DIR").map(PathBuf::from),
            },
            schedule: ScheduleConfig {
                hour,
                minute,
                poll_interval: Duration::from_secs(env_parse("SCHEDULE_POLL_SECS", 20u64)?.max(1)),
                run_on_start: env_bool("AUTO_RUN_ON_START", false),
            },
            timezone,
        })
    }

    /// Configuration suitable for tests: demo batch, rule-based only, no webhooks.
    pub fn offline(paths: PathsConfig) -> Self {
        Self {
            mail: None,
            llm: None,
            reply: ReplyConfig::default(),
            notify: NotifyConfig::default(),
            pipeline: PipelineConfig::default(),
            paths,
            schedule: ScheduleConfig::default(),
            timezone: chrono_tz::Asia::Shanghai,
        }
    }

    /// Mail settings, or `MailError::NotConfigured` for paths that must talk to a mailbox.
    pub fn require_mail(&self) -> Result<&MailConfig, MailError> {
        self.mail.as_ref().ok_or(MailError::NotConfigured)
    }
}

// ── Env helpers ─────────────────────────────────────────────────────

/// Non-empty, trimmed environment value.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env_string(key).map_or(default, |v| parse_bool(&v))
}

/// Truthy values: `1`, `true`, `yes`, `y`, `on` (case-insensitive).
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_config_has_no_mailbox() {
        let config = AppConfig::offline(PathsConfig::default());
        assert!(matches!(config.require_mail(), Err(MailError::NotConfigured)));
    }

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "TRUE", "yes", "Y", "on", " on "] {
            assert!(parse_bool(v), "{v} should be truthy");
        }
        for v in ["0", "false", "no", "off", "", "maybe"] {
            assert!(!parse_bool(v), "{v} should be falsy");
        }
    }

    #[test]
    fn export_mode_parsing() {
        assert_eq!("per_run".parse::<ExportMode>().unwrap(), ExportMode::PerRun);
        assert_eq!("Daily".parse::<ExportMode>().unwrap(), ExportMode::Daily);
        assert!("hourly".parse::<ExportMode>().is_err());
    }

    #[test]
    fn offline_config_has_no_collaborators() {
        let config = AppConfig::offline(PathsConfig::default());
        assert!(config.mail.is_none());
        assert!(config.llm.is_none());
        assert!(config.notify.bot_webhook.is_none());
        assert_eq!(config.schedule.hour, 9);
        assert_eq!(config.timezone, chrono_tz::Asia::Shanghai);
    }

    #[test]
    fn reply_defaults() {
        let reply = ReplyConfig::default();
        assert!(reply.template.is_none());
        assert_eq!(reply.signature, "Customer Support Team");
    }
}
