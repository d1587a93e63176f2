//! Issuance service API client
//!
//! This module provides the authenticated HTTP client for the certificate
//! issuance service: endpoint descriptors, response classification, the
//! shared session with its login procedure, the retrying dispatcher, and the
//! typed commands built on top of it.
//!
//! # Architecture
//!
//! - One `ApiClient` per service, shared behind an `Arc`
//! - Bearer token refreshed by double-checked locking on expiry
//! - Linear backoff on "service busy" / "operation in progress"
//! - Every call bounded by a `CallContext` deadline and cancellation token

pub mod auth;
pub mod backoff;
pub mod batch;
pub mod client;
pub mod commands;
pub mod context;
pub mod endpoint;
pub mod errors;
pub mod response;
pub mod session;

pub use backoff::{BackoffSleeper, RetryBudget, TokioSleeper};
pub use batch::{BatchConfig, BatchSubmissionResult, BatchSubmitter};
pub use client::{ApiClient, ApiClientBuilder};
pub use commands::ApiCommands;
pub use context::CallContext;
pub use endpoint::{Endpoint, EndpointKind};
pub use errors::{ApiError, ApiErrorCategory, ResponseClass, ServiceError};
pub use session::{Session, SessionState};
