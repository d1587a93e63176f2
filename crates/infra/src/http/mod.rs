//! HTTP transport construction
//!
//! The API client owns one `reqwest::Client` built here from
//! [`ClientConfig`](certgate_domain::ClientConfig); TLS trust, timeouts and the
//! user agent are fixed at construction.

pub mod transport;

pub use transport::HttpTransportBuilder;
