//! Certificate request and certificate models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CertGateError, Result};

const CSR_PEM_HEADER: &str = "-----BEGIN CERTIFICATE REQUEST-----";

/// Identifier assigned by the service to a submitted certificate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(pub String);

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CertificateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Body of `POST /certificates`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    /// PEM-encoded PKCS#10 request
    pub csr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alt_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl CertificateRequest {
    pub fn new(csr: impl Into<String>) -> Self {
        Self {
            csr: csr.into(),
            policy_id: None,
            validity_days: None,
            subject_alt_names: Vec::new(),
            comment: None,
        }
    }

    /// Reject requests the service would refuse outright
    ///
    /// # Errors
    /// Returns `CertGateError::InvalidInput` when the CSR is not PEM armoured
    /// or the validity is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.csr.trim_start().starts_with(CSR_PEM_HEADER) {
            return Err(CertGateError::InvalidInput(
                "csr must be a PEM encoded certificate request".to_string(),
            ));
        }
        if self.validity_days == Some(0) {
            return Err(CertGateError::InvalidInput("validity_days must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Pending,
    Issued,
    Rejected,
    Revoked,
}

/// Certificate as reported by `GET /certificates/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: CertificateId,
    pub status: CertificateStatus,
    #[serde(default)]
    pub subject: String,
    pub serial_number: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

impl Certificate {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CertificateStatus::Issued
            && self.not_before.is_none_or(|start| start <= now)
            && self.not_after.is_none_or(|end| now < end)
    }
}

/// RFC 5280 revocation reasons accepted by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
}

/// Body of `POST /certificates/{id}/revoke`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationRequest {
    pub reason: RevocationReason,
}
