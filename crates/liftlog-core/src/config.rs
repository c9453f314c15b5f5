//! Centralized configuration for Liftlog.
//!
//! Constants for the relational store and the search backends, plus the
//! runtime [`Settings`] resolved from flags and environment variables.

use crate::error::{LiftlogError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const USER_AGENT: &'static str = "Liftlog/0.1";
    pub const DATABASE_PATH_ENV: &'static str = "DATABASE_PATH";
    pub const SEARCH_URL_ENV: &'static str = "ELASTICSEARCH_URL";
    pub const FAILURE_POLICY_ENV: &'static str = "SEARCH_FAILURE_POLICY";
}

/// Relational store configuration.
pub struct DatabaseConfig;

impl DatabaseConfig {
    pub const DEFAULT_FILENAME: &'static str = "liftlog.db";
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
    pub const USERNAME_MAX_LEN: usize = 80;
    pub const EMAIL_MAX_LEN: usize = 120;
    pub const NAME_MAX_LEN: usize = 128;
}

/// Search backend configuration.
pub struct SearchConfig;

impl SearchConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_PER_PAGE: usize = 25;
    pub const FTS5_TABLE_NAME: &'static str = "search_documents";
    pub const FTS5_TOKENIZER: &'static str = "unicode61 remove_diacritics 1";
    pub const FTS5_SCHEME: &'static str = "fts5:";
    pub const MEMORY_SCHEME: &'static str = "memory:";
}

/// What the synchronizer does when an index call fails after the relational
/// commit has already succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failing document, keep going, and report it in the
    /// [`SyncReport`](crate::sync::SyncReport).
    #[default]
    Isolate,
    /// Stop at the first failure and return it from `commit()`.
    Propagate,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Isolate => "isolate",
            FailurePolicy::Propagate => "propagate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "isolate" => Some(FailurePolicy::Isolate),
            "propagate" => Some(FailurePolicy::Propagate),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEndpoint {
    /// No backend configured; every index operation is a no-op.
    Unconfigured,
    /// Elasticsearch over HTTP(S).
    Elasticsearch(url::Url),
    /// SQLite FTS5 database at the given path.
    Fts5(PathBuf),
    /// In-process index that lives as long as the application.
    Memory,
}

impl SearchEndpoint {
    /// Parse an endpoint string. Empty or whitespace-only means unconfigured.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(SearchEndpoint::Unconfigured),
            Some(raw) => raw,
        };

        if let Some(path) = raw.strip_prefix(SearchConfig::FTS5_SCHEME) {
            if path.is_empty() {
                return Err(LiftlogError::Config {
                    message: "fts5 endpoint requires a database path".to_string(),
                });
            }
            return Ok(SearchEndpoint::Fts5(PathBuf::from(path)));
        }

        if raw == SearchConfig::MEMORY_SCHEME {
            return Ok(SearchEndpoint::Memory);
        }

        let url = url::Url::parse(raw).map_err(|e| LiftlogError::Config {
            message: format!("Invalid search endpoint {}: {}", raw, e),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(SearchEndpoint::Elasticsearch(url)),
            other => Err(LiftlogError::Config {
                message: format!("Unsupported search endpoint scheme: {}", other),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, SearchEndpoint::Unconfigured)
    }
}

/// Runtime settings for a Liftlog instance.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub search_url: Option<String>,
    pub failure_policy: FailurePolicy,
}

impl Settings {
    /// Resolve settings from `DATABASE_PATH`, `ELASTICSEARCH_URL` and
    /// `SEARCH_FAILURE_POLICY`.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`; unset or blank values fall back to
    /// defaults.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_path = var(AppConfig::DATABASE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DatabaseConfig::DEFAULT_FILENAME));
        let failure_policy = match var(AppConfig::FAILURE_POLICY_ENV) {
            Some(raw) => FailurePolicy::parse(raw.trim()).unwrap_or_else(|| {
                warn!("Unknown failure policy {:?}; using {}", raw, FailurePolicy::default());
                FailurePolicy::default()
            }),
            None => FailurePolicy::default(),
        };

        Self {
            database_path,
            search_url: var(AppConfig::SEARCH_URL_ENV),
            failure_policy,
        }
    }

    pub fn search_endpoint(&self) -> Result<SearchEndpoint> {
        SearchEndpoint::parse(self.search_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_unconfigured() {
        assert_eq!(SearchEndpoint::parse(None).unwrap(), SearchEndpoint::Unconfigured);
        assert_eq!(
            SearchEndpoint::parse(Some("   ")).unwrap(),
            SearchEndpoint::Unconfigured
        );
        assert!(!SearchEndpoint::Unconfigured.is_configured());
    }

    #[test]
    fn test_endpoint_schemes() {
        match SearchEndpoint::parse(Some("http://localhost:9200")).unwrap() {
            SearchEndpoint::Elasticsearch(url) => assert_eq!(url.port(), Some(9200)),
            other => panic!("unexpected endpoint: {:?}", other),
        }
        assert_eq!(
            SearchEndpoint::parse(Some("fts5:/tmp/search.db")).unwrap(),
            SearchEndpoint::Fts5(PathBuf::from("/tmp/search.db"))
        );
        assert_eq!(
            SearchEndpoint::parse(Some("memory:")).unwrap(),
            SearchEndpoint::Memory
        );
    }

    #[test]
    fn test_endpoint_rejects_unknown() {
        assert!(SearchEndpoint::parse(Some("ftp://example.com")).is_err());
        assert!(SearchEndpoint::parse(Some("fts5:")).is_err());
        assert!(SearchEndpoint::parse(Some("not a url")).is_err());
    }

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_settings_resolve() {

        let settings = Settings::resolve(env(&[]));
        assert_eq!(settings.database_path, PathBuf::from("liftlog.db"));
        assert_eq!(settings.search_url, None);
        assert_eq!(settings.failure_policy, FailurePolicy::Isolate);

        let settings = Settings::resolve(env(&[
            ("DATABASE_PATH", "/data/lift.db"),
            ("ELASTICSEARCH_URL", " "),
            ("SEARCH_FAILURE_POLICY", "Propagate"),
        ]));
        assert_eq!(settings.database_path, PathBuf::from("/data/lift.db"));
        assert_eq!(settings.search_url, None);
        assert_eq!(settings.failure_policy, FailurePolicy::Propagate);

        let settings = Settings::resolve(env(&[("SEARCH_FAILURE_POLICY", "retry")]));
        assert_eq!(settings.failure_policy, FailurePolicy::Isolate);
    }

    #[test]
    fn test_failure_policy_roundtrip() {
        for policy in [FailurePolicy::Isolate, FailurePolicy::Propagate] {
            assert_eq!(FailurePolicy::parse(policy.as_str()), Some(policy));
        }
        assert_eq!(FailurePolicy::default(), FailurePolicy::Isolate);
    }
}
