//! Service constants
//!
//! Centralized location for the wire-level constants of the issuance service
//! and the client defaults derived from them.

// Wire contract
pub const LOGIN_PATH: &str = "/login";
pub const HEALTH_PATH: &str = "/health";
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";
pub const AUTHORIZATION_SCHEME: &str = "bearer";

// Descriptions the service attaches to its classified error responses
pub const SERVICE_BUSY_DESCRIPTION: &str = "Service busy";
pub const OPERATION_IN_PROGRESS_DESCRIPTION: &str = "Operation in progress";
pub const TOKEN_EXPIRED_DESCRIPTION: &str = "Token expired or invalid";

// Client defaults
pub const DEFAULT_BASE_URL: &str = "https://certs.example.com/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_BUDGET: u32 = 5;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2_000;
pub const DEFAULT_LOGIN_GRACE_PERIOD_SECS: u64 = 60;
pub const DEFAULT_MAX_RELOGINS: u32 = 3;
/// Upper bound accepted for `timeout_secs`
pub const MAX_TIMEOUT_SECS: u64 = 86_400;
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 1_000;
