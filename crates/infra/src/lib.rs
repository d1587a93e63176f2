//! # certgate Infrastructure
//!
//! I/O-bearing side of the certgate client.
//!
//! This crate contains:
//! - The authenticated API client and its request dispatcher
//! - Typed commands for certificates and domain claims
//! - HTTP transport construction
//! - Configuration loading from environment and files
//!
//! ## Architecture
//! - Depends on `certgate-domain` for models, configuration and errors
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod config;
pub mod http;

// Re-export commonly used items
pub use api::*;
pub use http::*;
