//! API-specific error types
//!
//! Provides classification of service responses for the dispatcher's
//! retry/re-login loop, plus the error type returned to callers.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use certgate_domain::constants::{
    OPERATION_IN_PROGRESS_DESCRIPTION, SERVICE_BUSY_DESCRIPTION, TOKEN_EXPIRED_DESCRIPTION,
};
use certgate_domain::CertGateError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Structured error reported by the issuance service
///
/// Compared by value: two errors are equal when both the status code and the
/// description match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceError {
    /// HTTP status of the failed response
    pub status_code: u16,
    /// Human-readable reason taken from the response body
    pub description: Cow<'static, str>,
}

impl ServiceError {
    /// 503 sent while the service sheds load
    pub const SERVICE_BUSY: Self =
        Self { status_code: 503, description: Cow::Borrowed(SERVICE_BUSY_DESCRIPTION) };

    /// 202 sent while the requested resource is still being produced
    pub const OPERATION_IN_PROGRESS: Self =
        Self { status_code: 202, description: Cow::Borrowed(OPERATION_IN_PROGRESS_DESCRIPTION) };

    /// Create an error from its status code and description
    ///
    /// # Arguments
    ///
    /// * `status_code` - HTTP status of the response
    /// * `description` - Reason reported by the service
    pub fn new(status_code: u16, description: impl Into<Cow<'static, str>>) -> Self {
        Self { status_code, description: description.into() }
    }

    /// Build the structured error for a non-success response body
    ///
    /// The description comes from the JSON `description` field (or `message`
    /// as a fallback), otherwise from the raw body text, otherwise from the
    /// status code's reason phrase.
    pub fn classify(status: StatusCode, body: &[u8]) -> Self {
        let description = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => parsed.description.or(parsed.message).filter(|d| !d.trim().is_empty()),
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                (!text.is_empty()).then_some(text)
            }
        };

        let description = description.unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
        });

        Self::new(status.as_u16(), description)
    }

    /// The busy and in-progress conditions, nothing else
    pub fn is_retryable(&self) -> bool {
        *self == Self::SERVICE_BUSY || *self == Self::OPERATION_IN_PROGRESS
    }

    /// The service rejected the bearer token; a fresh login is required
    pub fn is_expired_token(&self) -> bool {
        self.description == TOKEN_EXPIRED_DESCRIPTION
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}: {}", self.status_code, self.description)
    }
}

impl std::error::Error for ServiceError {}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    description: Option<String>,
    message: Option<String>,
}

/// Everything in [200, 299] except 202, which this service uses to mean
/// "accepted but not ready yet"
pub fn is_success(status: StatusCode) -> bool {
    status.is_success() && status != StatusCode::ACCEPTED
}

/// How the dispatcher must proceed after one attempt
#[derive(Debug)]
pub enum ResponseClass {
    /// 2xx other than 202; body still unread
    Success(Response),
    /// Bearer token rejected; log in again and repeat
    ExpiredToken(ServiceError),
    /// Busy or in progress; back off and repeat
    Retryable(ServiceError),
    /// Any other failure; returned to the caller
    Permanent(ServiceError),
}

impl ResponseClass {
    /// Classify a response, consuming the body only when it is a failure
    ///
    /// # Errors
    /// Returns the transport error if the failure body cannot be read.
    pub async fn from_response(response: Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        if is_success(status) {
            return Ok(Self::Success(response));
        }

        let body = response.bytes().await?;
        Ok(Self::from_error(ServiceError::classify(status, &body)))
    }

    /// Branch for an already classified service error
    pub fn from_error(error: ServiceError) -> Self {
        if error.is_expired_token() {
            Self::ExpiredToken(error)
        } else if error.is_retryable() {
            Self::Retryable(error)
        } else {
            Self::Permanent(error)
        }
    }
}

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Connection failures, timeouts, deadline and cancellation
    Transport,
    /// Non-success response from the service
    Service,
    /// Login could not produce a usable token
    Authentication,
    /// Response arrived but could not be interpreted
    Decode,
    /// Caller supplied an invalid request
    Client,
    /// Client misconfiguration or internal fault
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    Service(ServiceError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Login request reported an expired token; refusing to log in recursively")]
    RecursiveLogin,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::DeadlineExceeded | Self::Cancelled => {
                ApiErrorCategory::Transport
            }
            Self::Service(_) => ApiErrorCategory::Service,
            Self::Auth(_) | Self::RecursiveLogin => ApiErrorCategory::Authentication,
            Self::Decode(_) => ApiErrorCategory::Decode,
            Self::InvalidInput(_) => ApiErrorCategory::Client,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// The structured service error, if the service produced one
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of the service error, if any
    pub fn status_code(&self) -> Option<u16> {
        self.service_error().map(|err| err.status_code)
    }

    /// Map a reqwest failure into the transport variants
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<CertGateError> for ApiError {
    fn from(err: CertGateError) -> Self {
        match err {
            CertGateError::Config(msg) => Self::Config(msg),
            CertGateError::InvalidInput(msg) | CertGateError::NotFound(msg) => {
                Self::InvalidInput(msg)
            }
            CertGateError::Internal(msg) => Self::Config(msg),
        }
    }
}
