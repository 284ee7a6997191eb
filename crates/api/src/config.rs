//! Application configuration loaded from environment variables.

use domain::DEFAULT_MAX_METADATA_ENTRIES;
use orchestrator::OrchestratorConfig;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `json` or `pretty` (default: `pretty`)
/// - `DATABASE_URL` PostgreSQL connection string; in-memory stores when unset
/// - `MAX_METADATA_ENTRIES` policy limit on request metadata (default: `16`)
/// - `SUPPORTED_LOCALES` comma-separated locale allow-list (default: `en-US`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub max_metadata_entries: usize,
    pub supported_locales: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_metadata_entries: lookup("MAX_METADATA_ENTRIES")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_metadata_entries),
            supported_locales: lookup("SUPPORTED_LOCALES")
                .map(|list| parse_locales(&list))
                .filter(|locales| !locales.is_empty())
                .unwrap_or(defaults.supported_locales),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            supported_locales: self.supported_locales.clone(),
            max_metadata_entries: self.max_metadata_entries,
            ..OrchestratorConfig::default()
        }
    }
}

fn parse_locales(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|locale| !locale.is_empty())
        .map(String::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            max_metadata_entries: DEFAULT_MAX_METADATA_ENTRIES,
            supported_locales: vec!["en-US".to_string()],
        }
    }
}
