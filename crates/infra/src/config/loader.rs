//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `CERTGATE_BASE_URL`: Service base URL
//! - `CERTGATE_USERNAME`: Login user
//! - `CERTGATE_PASSWORD`: Login password
//!
//! Optional (defaults from [`ClientConfig::default`]):
//! - `CERTGATE_TIMEOUT_SECS`: Default per-call timeout
//! - `CERTGATE_RETRY_BUDGET`: Busy/in-progress retries per call
//! - `CERTGATE_RETRY_BASE_DELAY_MS`: Backoff unit in milliseconds
//! - `CERTGATE_LOGIN_GRACE_PERIOD_SECS`: Login collapse window
//! - `CERTGATE_MAX_RELOGINS`: Re-logins allowed per call
//! - `CERTGATE_CA_CERT_PATH`: Additional PEM root certificate
//! - `CERTGATE_ACCEPT_INVALID_CERTS`: Disable TLS validation (true/false)
//! - `CERTGATE_USER_AGENT`: User-Agent override
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./certgate.json` or `./certgate.toml` (current working directory)
//! 2. `~/.config/certgate/config.{json,toml}`
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use certgate_domain::{CertGateError, ClientConfig, Credentials, Result, TlsConfig};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `CertGateError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<ClientConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `CertGateError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<ClientConfig> {
    let defaults = ClientConfig::default();

    let credentials = Credentials::new(env_var("CERTGATE_USERNAME")?, env_var("CERTGATE_PASSWORD")?);

    Ok(ClientConfig {
        base_url: env_var("CERTGATE_BASE_URL")?,
        credentials,
        timeout_secs: env_parse("CERTGATE_TIMEOUT_SECS", defaults.timeout_secs)?,
        retry_budget: env_parse("CERTGATE_RETRY_BUDGET", defaults.retry_budget)?,
        retry_base_delay_ms: env_parse("CERTGATE_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms)?,
        login_grace_period_secs: env_parse(
            "CERTGATE_LOGIN_GRACE_PERIOD_SECS",
            defaults.login_grace_period_secs,
        )?,
        max_relogins: env_parse("CERTGATE_MAX_RELOGINS", defaults.max_relogins)?,
        tls: TlsConfig {
            ca_cert_path: std::env::var("CERTGATE_CA_CERT_PATH").ok().map(PathBuf::from),
            accept_invalid_certs: env_bool("CERTGATE_ACCEPT_INVALID_CERTS", false),
        },
        user_agent: std::env::var("CERTGATE_USER_AGENT").ok(),
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CertGateError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CertGateError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CertGateError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CertGateError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CertGateError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CertGateError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CertGateError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([cwd.join("certgate.json"), cwd.join("certgate.toml")]);
    }

    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        let dir = home.join(".config").join("certgate");
        candidates.extend([dir.join("config.json"), dir.join("config.toml")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend([exe_dir.join("certgate.json"), exe_dir.join("certgate.toml")]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `CertGateError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CertGateError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional numeric environment variable
///
/// # Errors
/// Returns `CertGateError::Config` if the variable is set but invalid.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CertGateError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
