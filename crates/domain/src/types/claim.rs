//! Domain claim models
//!
//! A claim proves control of a DNS domain before certificates naming it can
//! be issued.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CertGateError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub String);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClaimId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    #[default]
    Dns,
    Http,
    Email,
}

/// Body of `POST /claims`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainClaimRequest {
    pub domain: String,
    #[serde(default)]
    pub validation_method: ValidationMethod,
}

impl DomainClaimRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self { domain: domain.into(), validation_method: ValidationMethod::default() }
    }

    /// # Errors
    /// Returns `CertGateError::InvalidInput` for an empty domain or one
    /// containing whitespace or a scheme.
    pub fn validate(&self) -> Result<()> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(CertGateError::InvalidInput("domain is empty".to_string()));
        }
        if domain.contains(char::is_whitespace) || domain.contains("://") {
            return Err(CertGateError::InvalidInput(format!("not a domain name: {}", domain)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Validated,
    Failed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainClaim {
    pub id: ClaimId,
    pub domain: String,
    pub status: ClaimStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}
