/// Configuration management for Kindred
use crate::error::{KindredError, KindredResult};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default push gateway (Expo push API, speaks `{to, title, body, data}`)
pub const DEFAULT_PUSH_GATEWAY_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub reminders: ReminderConfig,
    pub digest: DigestConfig,
    pub events: EventConfig,
    pub push: PushConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
}

/// Reminder scheduling and processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between due-reminder passes
    pub interval_secs: u64,
    /// Max reminders handled per pass
    pub batch_size: u32,
    /// Local hour-of-day celebration reminders fire at
    pub hour: u32,
    /// Offsets (days before) used when a celebration supplies none
    pub default_offsets: Vec<i64>,
}

/// Weekly digest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub interval_secs: u64,
    pub weekday: Weekday,
    pub window_days: i64,
}

/// Event invite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub invite_ttl_days: i64,
}

/// Push gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub gateway_url: String,
    pub access_token: Option<String>,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            batch_size: 100,
            hour: 9,
            default_offsets: vec![7, 1, 0],
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            interval_secs: 86400,
            weekday: Weekday::Mon,
            window_days: 7,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { invite_ttl_days: 30 }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_PUSH_GATEWAY_URL.to_string(),
            access_token: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 3000,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                database_path: PathBuf::from("./data/kindred.sqlite"),
                max_connections: 10,
            },
            reminders: ReminderConfig::default(),
            digest: DigestConfig::default(),
            events: EventConfig::default(),
            push: PushConfig::default(),
            email: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> KindredResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("KINDRED_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("KINDRED_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| KindredError::Validation("Invalid port number".to_string()))?;
        let version = env::var("KINDRED_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let database_path = env::var("KINDRED_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/kindred.sqlite"));
        let max_connections = env_parse("KINDRED_DB_MAX_CONNECTIONS", 10);

        let reminder_defaults = ReminderConfig::default();
        let default_offsets = match env::var("KINDRED_DEFAULT_OFFSETS") {
            Ok(raw) => parse_offsets(&raw)?,
            Err(_) => reminder_defaults.default_offsets,
        };
        let reminders = ReminderConfig {
            interval_secs: env_parse("KINDRED_REMINDER_INTERVAL_SECS", reminder_defaults.interval_secs),
            batch_size: env_parse("KINDRED_REMINDER_BATCH_SIZE", reminder_defaults.batch_size),
            hour: env_parse("KINDRED_REMINDER_HOUR", reminder_defaults.hour),
            default_offsets,
        };

        let digest_defaults = DigestConfig::default();
        let weekday = match env::var("KINDRED_DIGEST_WEEKDAY") {
            Ok(raw) => raw
                .parse::<Weekday>()
                .map_err(|_| KindredError::Validation(format!("Invalid digest weekday: {}", raw)))?,
            Err(_) => digest_defaults.weekday,
        };
        let digest = DigestConfig {
            interval_secs: env_parse("KINDRED_DIGEST_INTERVAL_SECS", digest_defaults.interval_secs),
            weekday,
            window_days: env_parse("KINDRED_DIGEST_WINDOW_DAYS", digest_defaults.window_days),
        };

        let events = EventConfig {
            invite_ttl_days: env_parse("KINDRED_INVITE_TTL_DAYS", EventConfig::default().invite_ttl_days),
        };

        let push = PushConfig {
            gateway_url: env::var("KINDRED_PUSH_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_PUSH_GATEWAY_URL.to_string()),
            access_token: env::var("KINDRED_PUSH_ACCESS_TOKEN").ok(),
        };

        let email = if let Ok(smtp_url) = env::var("KINDRED_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("KINDRED_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let logging = LoggingConfig {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                database_path,
                max_connections,
            },
            reminders,
            digest,
            events,
            push,
            email,
            logging,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> KindredResult<()> {
        if self.service.hostname.is_empty() {
            return Err(KindredError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.service.port == 0 {
            return Err(KindredError::Validation("Port cannot be 0".to_string()));
        }

        if self.reminders.batch_size == 0 {
            return Err(KindredError::Validation(
                "Reminder batch size must be positive".to_string(),
            ));
        }

        if self.reminders.hour > 23 {
            return Err(KindredError::Validation(format!(
                "Reminder hour must be 0-23, got {}",
                self.reminders.hour
            )));
        }

        if let Some(bad) = self
            .reminders
            .default_offsets
            .iter()
            .find(|o| !(0..=365).contains(*o))
        {
            return Err(KindredError::Validation(format!(
                "Reminder offset out of range: {}",
                bad
            )));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated offset list such as `7,1,0`
pub fn parse_offsets(raw: &str) -> KindredResult<Vec<i64>> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| KindredError::Validation(format!("Invalid reminder offset: {}", s)))
        })
        .collect()
}
