//! Configuration model loaded from `config.toml`.
//!
//! Every section and field has a default so a missing or partial file still
//! yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FormdeskError, Result};
use crate::form::DEFAULT_BACK_SIDE_MARKER;
use crate::identity::{AllowList, UserId};

/// Notifications longer than this fall back to the short form.
pub const DEFAULT_NOTIFICATION_LIMIT: usize = 4000;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RootConfig {
    pub bot: BotConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

impl RootConfig {
    /// Rejects values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.bot.back_side_marker.trim().is_empty() {
            return Err(FormdeskError::config("bot.back_side_marker must not be empty"));
        }
        if self.client.worker_threads == 0 {
            return Err(FormdeskError::config("client.worker_threads must be at least 1"));
        }
        Ok(())
    }
}

/// Settings of the form-collection bot.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    /// Identities allowed to triage forms.
    pub admin_ids: Vec<i64>,
    /// SQLite database file. Relative paths resolve against the data directory.
    pub database_path: PathBuf,
    /// Citizenship substring that requires the passport back side.
    pub back_side_marker: String,
    /// Maximum length of the full-form admin notification.
    pub notification_limit: usize,
}

impl BotConfig {
    pub fn allow_list(&self) -> AllowList {
        AllowList::new(self.admin_ids.iter().copied().map(UserId))
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            database_path: PathBuf::from("forms.db"),
            back_side_marker: DEFAULT_BACK_SIDE_MARKER.to_string(),
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
        }
    }
}

/// Settings of the messaging automation client.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Directory holding platform session files.
    pub sessions_dir: PathBuf,
    /// JSON file holding named profiles.
    pub profiles_file: PathBuf,
    /// Size of the background worker pool.
    pub worker_threads: usize,
    /// Upper bound for joining the async loop thread on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Pause between consecutive invitations.
    pub invite_delay_secs: u64,
    /// Wait limit for one network call made on behalf of a synchronous caller.
    pub blocking_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sessions_dir: PathBuf::from("sessions"),
            profiles_file: PathBuf::from("profiles.json"),
            worker_threads: 5,
            shutdown_timeout_secs: 5,
            invite_delay_secs: 2,
            blocking_timeout_secs: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rolling log files; unset means the default log directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: RootConfig = toml::from_str(
            r#"
            [bot]
            admin_ids = [100, 200]
            "#,
        )
        .unwrap();

        assert_eq!(config.bot.admin_ids, vec![100, 200]);
        assert_eq!(config.bot.back_side_marker, DEFAULT_BACK_SIDE_MARKER);
        assert_eq!(config.bot.notification_limit, 4000);
        assert_eq!(config.client.worker_threads, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.bot.allow_list().contains(UserId(200)));
    }

    #[test]
    fn test_blank_marker_is_rejected() {
        let config: RootConfig = toml::from_str(
            r#"
            [bot]
            back_side_marker = " "
            "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("back_side_marker"));
        assert!(RootConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let config = RootConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RootConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
