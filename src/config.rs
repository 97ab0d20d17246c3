use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::FailureAlertPolicy;
use crate::poller::CursorPolicy;

pub const PRACTICUM_TOKEN_VAR: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_retry_time_secs")]
    pub retry_time_secs: u64,
    #[serde(default)]
    pub cursor: CursorPolicy,
    #[serde(default)]
    pub failure_alerts: FailureAlertPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_file: Option<PathBuf>,
    pub retry_time_secs: Option<u64>,
    pub cursor: Option<CursorPolicy>,
    pub failure_alerts: Option<FailureAlertPolicy>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/homework-bot/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_file) = overrides.log_file {
            self.logging.file = log_file.display().to_string();
        }
        if let Some(retry_time_secs) = overrides.retry_time_secs {
            self.poll.retry_time_secs = retry_time_secs;
        }
        if let Some(cursor) = overrides.cursor {
            self.poll.cursor = cursor;
        }
        if let Some(failure_alerts) = overrides.failure_alerts {
            self.poll.failure_alerts = failure_alerts;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn retry_time(&self) -> Duration {
        self.poll.retry_time()
    }

    pub fn resolved_log_path(&self) -> PathBuf {
        expand_tilde(&self.logging.file)
    }

    pub fn default_template() -> String {
        let template = r#"# Secrets are read from the environment:
#   PRACTICUM_TOKEN, TELEGRAM_TOKEN, TELEGRAM_CHAT_ID
# A .env file in the working directory (or any parent) is loaded first;
# variables already set in the environment win.

[api]
endpoint = "https://practicum.yandex.ru/api/user_api/homework_statuses/"
request_timeout_secs = 30

[telegram]
api_url = "https://api.telegram.org"
request_timeout_secs = 30

[poll]
retry_time_secs = 600
# "advance" moves the cursor to the API's current_date after each poll,
# "fixed" keeps querying from the start time.
cursor = "advance"
# "always", "on_change" or "never"
failure_alerts = "always"

[logging]
file = "program.log"
level = "info"
"#;
        template.to_string()
    }
}

impl PollConfig {
    /// Never shorter than a second, so a zero setting cannot spin the loop.
    pub fn retry_time(&self) -> Duration {
        Duration::from_secs(self.retry_time_secs.max(1))
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl TelegramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_telegram_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            retry_time_secs: default_retry_time_secs(),
            cursor: CursorPolicy::default(),
            failure_alerts: FailureAlertPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_endpoint() -> String {
    "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_time_secs() -> u64 {
    600
}

fn default_log_file() -> String {
    "program.log".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// The three secrets the bot cannot run without.
#[derive(Clone)]
pub struct Credentials {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required environment variables: {}", .0.join(", "))]
pub struct CredentialsError(pub Vec<&'static str>);

impl Credentials {
    pub fn from_env() -> Result<Self, CredentialsError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CredentialsError> {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| {
            let value = lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };
        let practicum_token = read(PRACTICUM_TOKEN_VAR);
        let telegram_token = read(TELEGRAM_TOKEN_VAR);
        let telegram_chat_id = read(TELEGRAM_CHAT_ID_VAR);

        if !missing.is_empty() {
            return Err(CredentialsError(missing));
        }
        Ok(Self {
            practicum_token,
            telegram_token,
            telegram_chat_id,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::alert::FailureAlertPolicy;
    use crate::config::{Config, ConfigOverrides, Credentials, CredentialsError};
    use crate::poller::CursorPolicy;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn credentials_load_when_all_present() {
        let creds = Credentials::from_lookup(lookup(&[
            ("PRACTICUM_TOKEN", "y0_practicum"),
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", " 4242 "),
        ]))
        .expect("credentials");
        assert_eq!(creds.practicum_token, "y0_practicum");
        assert_eq!(creds.telegram_chat_id, "4242");
        assert!(!format!("{creds:?}").contains("y0_practicum"));
    }

    #[test]
    fn credentials_report_every_missing_variable() {
        let err = Credentials::from_lookup(lookup(&[
            ("PRACTICUM_TOKEN", "y0_practicum"),
            ("TELEGRAM_TOKEN", "   "),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            CredentialsError(vec!["TELEGRAM_TOKEN", "TELEGRAM_CHAT_ID"])
        );
        assert_eq!(
            err.to_string(),
            "missing required environment variables: TELEGRAM_TOKEN, TELEGRAM_CHAT_ID"
        );
    }

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("template");
        assert_eq!(parsed.poll.retry_time_secs, 600);
        assert_eq!(parsed.poll.cursor, CursorPolicy::Advance);
        assert_eq!(parsed.poll.failure_alerts, FailureAlertPolicy::Always);
        assert_eq!(parsed.api.endpoint, Config::default().api.endpoint);
        assert_eq!(parsed.logging.file, "program.log");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[poll]\ncursor = \"fixed\"\nfailure_alerts = \"on_change\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.poll.cursor, CursorPolicy::Fixed);
        assert_eq!(config.poll.failure_alerts, FailureAlertPolicy::OnChange);
        assert_eq!(config.poll.retry_time_secs, 600);
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
    }

    #[test]
    fn missing_file_yields_defaults_and_template_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let config = Config::load(Some(&path)).expect("defaults");
        assert_eq!(config.logging.level, "info");

        Config::write_template(&path).expect("write template");
        let loaded = Config::load(Some(&path)).expect("load template");
        assert_eq!(loaded.api.request_timeout_secs, 30);
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            log_file: Some(PathBuf::from("/tmp/bot.log")),
            retry_time_secs: Some(5),
            cursor: Some(CursorPolicy::Fixed),
            failure_alerts: None,
        });
        assert_eq!(config.logging.file, "/tmp/bot.log");
        assert_eq!(config.poll.cursor, CursorPolicy::Fixed);
        assert_eq!(config.poll.failure_alerts, FailureAlertPolicy::Always);
        assert_eq!(config.retry_time().as_secs(), 5);
    }

    #[test]
    fn zero_retry_time_is_clamped() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            retry_time_secs: Some(0),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.retry_time().as_secs(), 1);
    }

    #[test]
    fn credentials_load_from_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "PRACTICUM_TOKEN=y0_from_file\nTELEGRAM_TOKEN=\"123:abc\"\n# comment\nTELEGRAM_CHAT_ID=4242\n",
        )
        .unwrap();

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let creds = Credentials::from_lookup(|name: &str| vars.get(name).cloned())
            .expect("credentials");

        assert_eq!(creds.practicum_token, "y0_from_file");
        assert_eq!(creds.telegram_token, "123:abc");
        assert_eq!(creds.telegram_chat_id, "4242");
    }

    #[test]
    fn invalid_policy_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[poll]\ncursor = \"sideways\"\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed parsing TOML config"));
    }
}
