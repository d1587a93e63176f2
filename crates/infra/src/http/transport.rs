use std::path::PathBuf;
use std::time::Duration;

use certgate_domain::ClientConfig;
use reqwest::{Certificate, Client as ReqwestClient};
use tracing::{debug, warn};

use crate::api::errors::ApiError;

/// Builder for the shared `reqwest` transport.
///
/// The resulting client is cloned freely; its connection pool is safe for
/// concurrent use without further locking.
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    ca_cert_path: Option<PathBuf>,
    accept_invalid_certs: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            ca_cert_path: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpTransportBuilder {
    /// Seed the builder from client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            ca_cert_path: config.tls.ca_cert_path.clone(),
            accept_invalid_certs: config.tls.accept_invalid_certs,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Trust an additional PEM root certificate (private PKI, test servers).
    pub fn ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    pub fn build(self) -> Result<ReqwestClient, ApiError> {
        let agent = self
            .user_agent
            .unwrap_or_else(|| format!("certgate/{}", env!("CARGO_PKG_VERSION")));

        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).user_agent(agent).no_proxy();

        if let Some(path) = &self.ca_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                ApiError::Config(format!("Failed to read CA certificate {}: {}", path.display(), e))
            })?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| ApiError::Config(format!("Invalid CA certificate: {}", e)))?;
            debug!(path = %path.display(), "Trusting additional CA certificate");
            builder = builder.add_root_certificate(cert);
        }

        if self.accept_invalid_certs {
            warn!("TLS certificate validation is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))
    }
}
