//! Configuration file parser for ~/.config/briefing/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde but logged as warnings, since they are
//! usually typos.
use chrono::Duration;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::archive::{ArchiveLimits, MAX_ARCHIVE_ARTICLES, MAX_ARCHIVE_SOURCES};
use crate::feed::HttpFeedConfig;
use crate::session::SessionSettings;
use crate::sync::{DEFAULT_COOLDOWN_MINUTES, DEFAULT_STALENESS_HOURS};

/// Environment variable that takes precedence over `api_key`.
pub const API_KEY_ENV: &str = "BRIEFING_API_KEY";

const KNOWN_KEYS: &[&str] = &[
    "feed_url",
    "api_key",
    "staleness_hours",
    "cooldown_minutes",
    "max_articles",
    "max_sources",
    "request_timeout_secs",
    "categories",
];

/// One year.
const MAX_STALENESS_HOURS: u64 = 24 * 365;

/// One week.
const MAX_COOLDOWN_MINUTES: u64 = 60 * 24 * 7;

const DEFAULT_CATEGORIES: &[&str] = &[
    "ALL",
    "RESEARCH",
    "MODELS",
    "TOOLS",
    "STARTUPS",
    "ENTERPRISE",
    "POLICY",
    "HARDWARE",
    "ROBOTICS",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for {key}: {value} (max {max})")]
    OutOfRange { key: &'static str, value: u64, max: u64 },
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be given.
/// `Debug` masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON endpoint for the feed. Unset means offline-only.
    pub feed_url: Option<String>,

    /// Bearer key for the feed endpoint. `BRIEFING_API_KEY` wins over this.
    pub api_key: Option<String>,

    /// Age after which a cached archive is refreshed at startup.
    pub staleness_hours: u64,

    /// Cooldown after a rate-limit failure.
    pub cooldown_minutes: u64,

    /// Archive article cap. 0 = default; larger values are clamped to 500.
    pub max_articles: usize,

    /// Archive source cap. 0 = default; larger values are clamped to 100.
    pub max_sources: usize,

    pub request_timeout_secs: u64,

    /// Category names offered by the reader, `ALL` first.
    pub categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: None,
            api_key: None,
            staleness_hours: DEFAULT_STALENESS_HOURS as u64,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES as u64,
            max_articles: MAX_ARCHIVE_ARTICLES,
            max_sources: MAX_ARCHIVE_SOURCES,
            request_timeout_secs: 30,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed_url", &self.feed_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("staleness_hours", &self.staleness_hours)
            .field("cooldown_minutes", &self.cooldown_minutes)
            .field("max_articles", &self.max_articles)
            .field("max_sources", &self.max_sources)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("categories", &self.categories)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range durations → `Err(ConfigError::OutOfRange)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse TOML text. Blank input yields the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        tracing::info!(
            feed_configured = config.feed_url.is_some(),
            staleness_hours = config.staleness_hours,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.staleness_hours > MAX_STALENESS_HOURS {
            return Err(ConfigError::OutOfRange {
                key: "staleness_hours",
                value: self.staleness_hours,
                max: MAX_STALENESS_HOURS,
            });
        }
        if self.cooldown_minutes > MAX_COOLDOWN_MINUTES {
            return Err(ConfigError::OutOfRange {
                key: "cooldown_minutes",
                value: self.cooldown_minutes,
                max: MAX_COOLDOWN_MINUTES,
            });
        }
        Ok(())
    }

    /// Effective API key: a non-empty `env_value` wins over the file.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Option<SecretString> {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .map(SecretString::from)
    }

    /// Archive caps. Never exceeds the 500 article / 100 source ceiling.
    pub fn archive_limits(&self) -> ArchiveLimits {
        ArchiveLimits {
            max_articles: capped_limit("max_articles", self.max_articles, MAX_ARCHIVE_ARTICLES),
            max_sources: capped_limit("max_sources", self.max_sources, MAX_ARCHIVE_SOURCES),
        }
    }

    /// Durations are bounded here as well, for configs built in code.
    pub fn session_settings(&self) -> SessionSettings {
        let staleness_hours = self.staleness_hours.min(MAX_STALENESS_HOURS) as i64;
        let cooldown_minutes = self.cooldown_minutes.min(MAX_COOLDOWN_MINUTES) as i64;
        SessionSettings {
            limits: self.archive_limits(),
            staleness: Duration::hours(staleness_hours),
            cooldown: Duration::minutes(cooldown_minutes),
        }
    }

    /// HTTP feed settings, or `None` when no `feed_url` is configured.
    pub fn feed_config(&self, api_key: Option<SecretString>) -> Option<HttpFeedConfig> {
        let endpoint = self.feed_url.as_deref()?.trim();
        if endpoint.is_empty() {
            return None;
        }
        let mut feed = HttpFeedConfig::new(endpoint);
        feed.api_key = api_key;
        feed.request_timeout = std::time::Duration::from_secs(self.request_timeout_secs.max(1));
        Some(feed)
    }

    /// Canonical (upper-cased) form of `name` if it is a configured category.
    pub fn find_category(&self, name: &str) -> Option<String> {
        let wanted = name.trim().to_uppercase();
        self.categories
            .iter()
            .map(|c| c.to_uppercase())
            .find(|c| *c == wanted)
    }
}

/// 0 means `ceiling`; anything above it is clamped.
fn capped_limit(key: &str, value: usize, ceiling: usize) -> usize {
    if value == 0 {
        return ceiling;
    }
    if value > ceiling {
        tracing::warn!(key, value, ceiling, "Archive limit above maximum, clamping");
        return ceiling;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.feed_url.is_none());
        assert!(config.api_key.is_none());
        assert_eq!(config.staleness_hours, 24);
        assert_eq!(config.cooldown_minutes, 60);
        assert_eq!(config.max_articles, 500);
        assert_eq!(config.max_sources, 100);
        assert_eq!(config.categories[0], "ALL");
        assert_eq!(config.categories.len(), 9);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/briefing_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.staleness_hours, 24);
    }

    #[test]
    fn test_empty_content_returns_default() {
        let config = Config::parse("   \n").unwrap();
        assert_eq!(config.cooldown_minutes, 60);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
feed_url = "https://news.example.com/api/briefing"
cooldown_minutes = 15
"#,
        )
        .unwrap();
        assert_eq!(
            config.feed_url.as_deref(),
            Some("https://news.example.com/api/briefing")
        );
        assert_eq!(config.cooldown_minutes, 15);
        assert_eq!(config.staleness_hours, 24);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::parse("feed_url = [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = Config::parse("staleness_hours = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("theme = \"dark\"\nmax_sources = 10").unwrap();
        assert_eq!(config.max_sources, 10);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join(format!("briefing_config_large_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let padding = "#".repeat((Config::MAX_FILE_SIZE + 1) as usize);
        std::fs::write(&path, padding).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            api_key: Some("super-secret".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_api_key_takes_precedence() {
        let config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };

        let key = config.resolve_api_key(Some("from-env".to_string())).unwrap();
        assert_eq!(key.expose_secret(), "from-env");

        let key = config.resolve_api_key(Some("  ".to_string())).unwrap();
        assert_eq!(key.expose_secret(), "from-file");

        assert!(Config::default().resolve_api_key(None).is_none());
    }

    #[test]
    fn test_zero_limits_fall_back_to_defaults() {
        let config = Config {
            max_articles: 0,
            max_sources: 0,
            ..Config::default()
        };
        let limits = config.archive_limits();
        assert_eq!(limits.max_articles, MAX_ARCHIVE_ARTICLES);
        assert_eq!(limits.max_sources, MAX_ARCHIVE_SOURCES);
    }

    #[test]
    fn test_limits_above_ceiling_are_clamped() {
        let config = Config::parse("max_articles = 5000\nmax_sources = 101").unwrap();
        let limits = config.session_settings().limits;
        assert_eq!(limits.max_articles, MAX_ARCHIVE_ARTICLES);
        assert_eq!(limits.max_sources, MAX_ARCHIVE_SOURCES);

        let config = Config::parse("max_articles = 50").unwrap();
        assert_eq!(config.archive_limits().max_articles, 50);
    }

    #[test]
    fn test_huge_durations_rejected() {
        let err = Config::parse("cooldown_minutes = 9223372036854775807").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                key: "cooldown_minutes",
                ..
            }
        ));

        let err = Config::parse("staleness_hours = 100000").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                key: "staleness_hours",
                ..
            }
        ));
    }

    #[test]
    fn test_session_settings_bounds_durations_built_in_code() {
        let config = Config {
            staleness_hours: u64::MAX,
            cooldown_minutes: u64::MAX,
            ..Config::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.staleness, Duration::hours(24 * 365));
        assert_eq!(settings.cooldown, Duration::minutes(60 * 24 * 7));
    }

    #[test]
    fn test_session_settings_durations() {
        let config = Config::parse("staleness_hours = 6\ncooldown_minutes = 5").unwrap();
        let settings = config.session_settings();
        assert_eq!(settings.staleness, Duration::hours(6));
        assert_eq!(settings.cooldown, Duration::minutes(5));
    }

    #[test]
    fn test_feed_config_requires_url() {
        assert!(Config::default().feed_config(None).is_none());

        let config = Config::parse(
            "feed_url = \"https://news.example.com/api\"\nrequest_timeout_secs = 5",
        )
        .unwrap();
        let feed = config.feed_config(None).unwrap();
        assert_eq!(feed.endpoint, "https://news.example.com/api");
        assert_eq!(feed.request_timeout, std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_find_category() {
        let config = Config::default();
        assert_eq!(config.find_category("policy").as_deref(), Some("POLICY"));
        assert_eq!(config.find_category(" all ").as_deref(), Some("ALL"));
        assert!(config.find_category("sports").is_none());
    }
}
