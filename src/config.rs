use std::env;
use std::fs;
use std::path::Path;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub imap: ImapConfig,

    /// Optional SMTP settings for the daily summary mail.
    pub smtp: Option<SmtpConfig>,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ImapConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub use_ssl: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_mailbox_name")]
    pub mailbox: String,
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_imap_port(),
            username: String::new(),
            password: String::new(),
            use_ssl: true,
            timeout_secs: default_timeout_secs(),
            mailbox: default_mailbox_name(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScheduleConfig {
    /// Daily evaluation deadline, local to `utc_offset`. Also the end of the
    /// acceptance window.
    #[serde(default = "default_evaluation_time")]
    pub evaluation_time: NaiveTime,

    /// Start of the day's acceptance window, local to `utc_offset`.
    #[serde(default = "default_window_start")]
    pub window_start: NaiveTime,

    /// Fixed UTC offset, e.g. "+02:00". DST transitions are not tracked.
    #[serde(
        default = "default_utc_offset",
        deserialize_with = "deserialize_offset"
    )]
    pub utc_offset: FixedOffset,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            evaluation_time: default_evaluation_time(),
            window_start: default_window_start(),
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite:backupwatch.db?mode=rwc".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_mailbox_name() -> String {
    "INBOX".to_string()
}

fn default_evaluation_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid time of day")
}

fn default_window_start() -> NaiveTime {
    NaiveTime::MIN
}

fn default_utc_offset() -> FixedOffset {
    Utc.fix()
}

fn deserialize_offset<'de, D>(deserializer: D) -> Result<FixedOffset, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse()
        .map_err(|e| serde::de::Error::custom(format!("invalid utc offset {raw:?}: {e}")))
}

impl AppConfig {
    /// Loads the TOML config file (if given), applies environment overrides,
    /// and validates the result. Environment always wins over the file.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config: AppConfig = match config_path {
            Some(path_str) => {
                let path = Path::new(path_str);
                let contents = fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => toml::from_str("")?,
        };

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(addr) = env::var("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(password) = env::var("IMAP_PASSWORD") {
            config.imap.password = password;
        }
        if let Ok(password) = env::var("SMTP_PASSWORD") {
            if let Some(smtp) = config.smtp.as_mut() {
                smtp.password = password;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.imap.host.is_empty() {
            return Err(ConfigError::Invalid("imap.host is required".to_string()));
        }
        if self.imap.username.is_empty() || self.imap.password.is_empty() {
            return Err(ConfigError::Invalid(
                "imap.username and imap.password are required".to_string(),
            ));
        }
        if let Some(smtp) = &self.smtp {
            if smtp.to.is_empty() {
                return Err(ConfigError::Invalid(
                    "smtp.to must list at least one recipient".to_string(),
                ));
            }
        }
        if self.schedule.window_start >= self.schedule.evaluation_time {
            return Err(ConfigError::Invalid(
                "schedule.window_start must be before schedule.evaluation_time".to_string(),
            ));
        }
        Ok(())
    }
}
