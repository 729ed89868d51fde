//! Process-level configuration for the adaptor.
//!
//! Site definitions are loaded separately (see [`crate::site::SiteConfig`]);
//! this module only covers the knobs shared by every site: the fallback
//! user agent and the HTTP deadline. `AdaptorConfig::from_env` reads them from
//! environment variables with development defaults.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Environment variable names. Public so tests and binaries can refer to them.
pub const ENV_USER_AGENT: &str = "SITEADAPT_USER_AGENT";
pub const ENV_TIMEOUT_SECS: &str = "SITEADAPT_TIMEOUT_SECS";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptorConfig {
    default_user_agent: String,
    timeout: Duration,
}

impl AdaptorConfig {
    pub fn new(default_user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            default_user_agent: default_user_agent.into(),
            timeout,
        }
    }

    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_user_agent =
            env::var(ENV_USER_AGENT).unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        let timeout_secs = match env::var(ENV_TIMEOUT_SECS) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: ENV_TIMEOUT_SECS,
                    reason: format!("expected a positive number of seconds, got '{raw}'"),
                })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            default_user_agent,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// User agent sent when the caller does not supply one.
    pub fn default_user_agent(&self) -> &str {
        &self.default_user_agent
    }

    /// Deadline for a whole HTTP call, from connect to last body byte.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
    /// A site definition file could not be read.
    Io(std::io::Error),
    /// A site definition is not valid JSON or has the wrong shape, including
    /// unknown filter kinds.
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
            ConfigError::Io(e) => write!(f, "could not read site config: {}", e),
            ConfigError::Json(e) => write!(f, "invalid site config: {}", e),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::InvalidValue { .. } => None,
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}
