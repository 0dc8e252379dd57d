use db::types::ColumnStatusMap;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ConfigError;

pub const CURRENT_CONFIG_VERSION: &str = "v1";

const DEFAULT_SESSION_TTL_SECS: u64 = 2 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct DemoConfig {
    #[serde(alias = "sessionTtlSecs")]
    pub session_ttl_secs: u64,
    /// Period of the background expiry sweep; 0 leaves expiry to request traffic.
    #[serde(alias = "sweepIntervalSecs")]
    pub sweep_interval_secs: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(alias = "maxRetries")]
    pub max_retries: usize,
    #[serde(alias = "initialBackoffMs")]
    pub initial_backoff_ms: u64,
    #[serde(alias = "maxBackoffMs")]
    pub max_backoff_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_retries: db::retry::DEFAULT_MAX_RETRIES,
            initial_backoff_ms: db::retry::DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: db::retry::DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl DatabaseConfig {
    pub fn retry_policy(&self) -> db::RetryPolicy {
        db::RetryPolicy::new(
            self.max_retries,
            self.initial_backoff_ms,
            self.max_backoff_ms,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct UploadsConfig {
    #[serde(alias = "maxFileSizeBytes")]
    pub max_file_size_bytes: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the e-mail of the user authenticated by the fronting proxy.
    #[serde(alias = "userEmailHeader")]
    pub user_email_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_email_header: DEFAULT_USER_EMAIL_HEADER.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct BoardConfig {
    #[serde(alias = "columnStatuses")]
    pub column_statuses: ColumnStatusMap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "configVersion")]
    pub config_version: String,
    pub demo: DemoConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadsConfig,
    pub auth: AuthConfig,
    pub board: BoardConfig,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        if self.demo.session_ttl_secs == 0 {
            tracing::warn!("Demo session TTL of 0 seconds is not allowed, resetting to default");
            self.demo.session_ttl_secs = DEFAULT_SESSION_TTL_SECS;
        }

        if self.database.max_backoff_ms < self.database.initial_backoff_ms {
            tracing::warn!(
                "Max backoff {}ms is below initial backoff {}ms, raising it",
                self.database.max_backoff_ms,
                self.database.initial_backoff_ms
            );
            self.database.max_backoff_ms = self.database.initial_backoff_ms;
        }

        if matches!(
            self.database.url.as_deref(),
            Some(url) if url.trim().is_empty()
        ) {
            self.database.url = None;
        }

        if self.uploads.max_file_size_bytes == 0 {
            self.uploads.max_file_size_bytes = DEFAULT_MAX_FILE_SIZE_BYTES;
        }

        let header = self.auth.user_email_header.trim().to_ascii_lowercase();
        self.auth.user_email_header = if header.is_empty() {
            DEFAULT_USER_EMAIL_HEADER.to_string()
        } else {
            header
        };

        if self.board.column_statuses.is_empty() {
            tracing::warn!("Empty column status table, restoring the default columns");
            self.board.column_statuses = ColumnStatusMap::default();
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_header_name(&self.auth.user_email_header) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid auth header name '{}'",
                self.auth.user_email_header
            )));
        }
        Ok(())
    }
}

fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            demo: DemoConfig::default(),
            database: DatabaseConfig::default(),
            uploads: UploadsConfig::default(),
            auth: AuthConfig::default(),
            board: BoardConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use db::types::TaskStatus;

    use super::*;

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = Config::from_raw("{}");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.demo.session_ttl_secs, 7200);
        assert_eq!(config.demo.sweep_interval_secs, 300);
        assert_eq!(config.database.max_retries, 2);
        assert_eq!(config.database.initial_backoff_ms, 500);
        assert_eq!(config.database.max_backoff_ms, 4000);
        assert_eq!(config.uploads.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.auth.user_email_header, "x-user-email");
        assert_eq!(config.board.column_statuses.len(), 4);
    }

    #[test]
    fn invalid_json_falls_back_to_default() {
        let config = Config::from_raw("{invalid json");

        assert_eq!(config, Config::default());
    }

    #[test]
    fn aliases_and_normalization_are_applied() {
        let raw = r#"{
            "configVersion": "v0",
            "demo": { "sessionTtlSecs": 0, "sweepIntervalSecs": 0 },
            "database": { "url": "  ", "initialBackoffMs": 800, "maxBackoffMs": 100 },
            "auth": { "userEmailHeader": " X-Forwarded-Email " },
            "board": { "columnStatuses": { "Backlog": "TODO", "Shipped": "DONE" } }
        }"#;

        let config = Config::from_raw(raw);

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.demo.session_ttl_secs, 7200);
        assert_eq!(config.demo.sweep_interval_secs, 0);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.max_backoff_ms, 800);
        assert_eq!(config.auth.user_email_header, "x-forwarded-email");
        assert_eq!(
            config.board.column_statuses.status_for("Shipped"),
            TaskStatus::Done
        );
    }

    #[test]
    fn header_names_are_validated() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.auth.user_email_header = "bad header".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
