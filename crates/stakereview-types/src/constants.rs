//! System-wide constants for the stakereview escrow.

/// Default upper bound on a review comment, in bytes.
pub const DEFAULT_MAX_COMMENT_BYTES: usize = 4096;

/// Default upper bound on how far in the future a grant may expire
/// (one year).
pub const DEFAULT_MAX_GRANT_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "stakereview";
