//! Configuration for the remote services, read once at startup.
//!
//! Every loader takes a variable lookup so tests never touch the process
//! environment; `from_env` wires it to `std::env::var`.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_POLICY_URL: &str = "https://api.osohq.com";
pub const DEFAULT_DECISIONS_URL: &str = "http://localhost:3001/decisions";
pub const DEFAULT_DATA_BINDINGS_PATH: &str = "facts.yaml";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Remote policy service settings.
#[derive(Clone)]
pub struct PolicyConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Contents of the local-filter data bindings file, shipped with
    /// `list_local` requests.
    pub data_bindings: Option<String>,
    pub timeout: Duration,
    pub filter_column: String,
    /// Root secret for minting actor-scoped tokens.
    pub actor_root_secret: Option<String>,
}

impl PolicyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            data_bindings: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            filter_column: gitclub_auth::DEFAULT_FILTER_COLUMN.to_string(),
            actor_root_secret: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bindings_path =
            var("OSO_DATA_BINDINGS").unwrap_or_else(|| DEFAULT_DATA_BINDINGS_PATH.to_string());
        let data_bindings = match std::fs::read_to_string(&bindings_path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %bindings_path, "no data bindings file; local filtering uses service defaults");
                None
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: bindings_path,
                    source,
                });
            }
        };

        Ok(Self {
            url: var("OSO_URL").unwrap_or_else(|| DEFAULT_POLICY_URL.to_string()),
            api_key: var("OSO_AUTH").filter(|k| !k.is_empty()),
            data_bindings,
            timeout: timeout_from(&var)?,
            filter_column: var("OSO_FILTER_COLUMN")
                .unwrap_or_else(|| gitclub_auth::DEFAULT_FILTER_COLUMN.to_string()),
            actor_root_secret: var("OSO_ACTOR_ROOT").filter(|k| !k.is_empty()),
        })
    }
}

impl core::fmt::Debug for PolicyConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PolicyConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("data_bindings", &self.data_bindings.as_ref().map(String::len))
            .field("timeout", &self.timeout)
            .field("filter_column", &self.filter_column)
            .field(
                "actor_root_secret",
                &self.actor_root_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Path-scoped decision service settings.
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    pub url: String,
    pub timeout: Duration,
}

impl DecisionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: var("DECISIONS_URL").unwrap_or_else(|| DEFAULT_DECISIONS_URL.to_string()),
            timeout: timeout_from(&var)?,
        })
    }
}

fn timeout_from(var: &impl Fn(&str) -> Option<String>) -> Result<Duration, ConfigError> {
    match var("OSO_TIMEOUT_MS") {
        None => Ok(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::Invalid {
                var: "OSO_TIMEOUT_MS",
                expected: "a whole number of milliseconds",
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn policy_defaults() {
        let cfg = PolicyConfig::from_vars(vars(&[("OSO_DATA_BINDINGS", "/nonexistent/facts.yaml")]))
            .unwrap();
        assert_eq!(cfg.url, DEFAULT_POLICY_URL);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.data_bindings, None);
        assert_eq!(cfg.timeout, Duration::from_millis(5000));
        assert_eq!(cfg.filter_column, "id::TEXT");
    }

    #[test]
    fn policy_overrides_and_redaction() {
        let cfg = PolicyConfig::from_vars(vars(&[
            ("OSO_URL", "http://localhost:8080"),
            ("OSO_AUTH", "e_secret"),
            ("OSO_DATA_BINDINGS", "/nonexistent/facts.yaml"),
            ("OSO_TIMEOUT_MS", "250"),
            ("OSO_FILTER_COLUMN", "issues.id::TEXT"),
        ]))
        .unwrap();
        assert_eq!(cfg.url, "http://localhost:8080");
        assert_eq!(cfg.api_key.as_deref(), Some("e_secret"));
        assert_eq!(cfg.timeout, Duration::from_millis(250));
        assert_eq!(cfg.filter_column, "issues.id::TEXT");
        assert!(!format!("{cfg:?}").contains("e_secret"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = DecisionConfig::from_vars(vars(&[("OSO_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "OSO_TIMEOUT_MS", .. }));
    }

    #[test]
    fn decision_defaults() {
        let cfg = DecisionConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(cfg.url, DEFAULT_DECISIONS_URL);
        assert_eq!(cfg.timeout, Duration::from_millis(5000));
    }
}
