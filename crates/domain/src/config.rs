//! Configuration management

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_LOGIN_GRACE_PERIOD_SECS, DEFAULT_MAX_RELOGINS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_BUDGET, DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS,
};
use crate::errors::{CertGateError, Result};

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the issuance service (e.g., "https://certs.example.com/api/v1")
    pub base_url: String,
    /// Credentials for `POST /login`
    pub credentials: Credentials,
    /// Default per-call timeout, also applied to the transport
    pub timeout_secs: u64,
    /// Number of busy/in-progress retries allowed per call
    pub retry_budget: u32,
    /// Backoff unit; the n-th retry sleeps `n * retry_base_delay_ms`
    pub retry_base_delay_ms: u64,
    /// Window after a login during which further logins are skipped
    pub login_grace_period_secs: u64,
    /// Re-logins allowed within one call before the expiry is surfaced
    pub max_relogins: u32,
    /// Transport security settings
    pub tls: TlsConfig,
    /// Override for the `User-Agent` header
    pub user_agent: Option<String>,
}

/// Login credentials sent to `POST /login`
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password; never serialized
    #[serde(skip_serializing)]
    pub password: String,
}

/// Transport security settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Additional PEM root certificate to trust
    pub ca_cert_path: Option<PathBuf>,
    /// Disable certificate validation (development servers only)
    pub accept_invalid_certs: bool,
}

impl Credentials {
    /// Create credentials for `username`
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            login_grace_period_secs: DEFAULT_LOGIN_GRACE_PERIOD_SECS,
            max_relogins: DEFAULT_MAX_RELOGINS,
            tls: TlsConfig::default(),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `base_url` with default tuning
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self { base_url: base_url.into(), credentials, ..Self::default() }
    }

    /// Default per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff unit between retries
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Window during which a previous login satisfies a refresh
    pub fn login_grace_period(&self) -> Duration {
        Duration::from_secs(self.login_grace_period_secs)
    }

    /// Check the configuration before a client is built from it
    ///
    /// # Errors
    /// Returns `CertGateError::Config` if the base URL is not an absolute
    /// http(s) URL, the username is empty, the timeout is zero or longer
    /// than a day, or the backoff delay or login grace period is zero.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| CertGateError::Config(format!("Invalid base_url: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CertGateError::Config(format!(
                "Unsupported base_url scheme: {}",
                url.scheme()
            )));
        }

        if self.credentials.username.trim().is_empty() {
            return Err(CertGateError::Config("credentials.username is empty".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(CertGateError::Config("timeout_secs must be positive".to_string()));
        }

        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(CertGateError::Config(format!(
                "timeout_secs must not exceed {}",
                MAX_TIMEOUT_SECS
            )));
        }

        if self.retry_base_delay_ms == 0 {
            return Err(CertGateError::Config("retry_base_delay_ms must be positive".to_string()));
        }

        if self.login_grace_period_secs == 0 {
            return Err(CertGateError::Config(
                "login_grace_period_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
