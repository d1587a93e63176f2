//! # certgate Domain
//!
//! Business domain types and models for the certgate client.
//!
//! This crate contains:
//! - Certificate and domain-claim models exchanged with the issuance service
//! - Domain error types and Result definitions
//! - Client configuration structures
//! - Service-wide constants
//!
//! ## Architecture
//! - No dependencies on other certgate crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures (no I/O)

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
