//! Error types for the stakereview escrow.
//!
//! All errors use the `SR_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Grant / attempt creation errors
//! - 2xx: Review errors
//! - 3xx: Reclaim / withdrawal errors
//! - 4xx: Ledger errors
//! - 8xx: Audit errors
//! - 9xx: General / internal errors
//!
//! Every error aborts the whole call: no record, balance, or pool counter
//! is touched when an operation returns `Err`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Central error enum for all stakereview operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Creation Errors (1xx)
    // =================================================================
    /// An unsettled record already exists for this key.
    #[error("SR_ERR_100: Duplicate grant: {key}")]
    DuplicateGrant { key: String },

    /// Expiration is not in the future, or is further out than allowed.
    #[error("SR_ERR_101: Invalid expiration {expires_at}: {reason}")]
    InvalidExpiration {
        expires_at: DateTime<Utc>,
        reason: String,
    },

    /// Stake amount was zero or negative.
    #[error("SR_ERR_102: Stake must be positive, got {0}")]
    ZeroStake(Decimal),

    /// Staker named themselves as the counterparty.
    #[error("SR_ERR_103: Cannot stake against yourself")]
    SelfStake,

    /// A reciprocal attempt exists but its terms differ.
    #[error("SR_ERR_104: Mismatched terms: partner expires at {theirs}, caller at {ours}")]
    MismatchedTerms {
        ours: DateTime<Utc>,
        theirs: DateTime<Utc>,
    },

    // =================================================================
    // Review Errors (2xx)
    // =================================================================
    /// No matching record exists.
    #[error("SR_ERR_200: Not found: {what}")]
    NotFound { what: String },

    /// The caller's review slot is already filled.
    #[error("SR_ERR_201: Already reviewed: {key}")]
    AlreadyReviewed { key: String },

    /// The caller is not one of the grant's two owners.
    ///
    /// Raised by [`JointGrant`](crate::JointGrant) itself. The registries
    /// look joint grants up by the caller's own pair, so a stranger gets
    /// `NotFound` there before this guard is reached.
    #[error("SR_ERR_202: Caller is not a participant of {key}")]
    NotAParticipant { key: String },

    /// The joint grant has already been resolved; no more reviews accepted.
    #[error("SR_ERR_203: Joint grant {key} already resolved")]
    AlreadyResolved { key: String },

    /// Review comment exceeds the configured size limit.
    #[error("SR_ERR_204: Comment too long: {len} bytes, limit {limit}")]
    CommentTooLong { len: usize, limit: usize },

    // =================================================================
    // Reclaim / Withdraw Errors (3xx)
    // =================================================================
    /// The stake cannot be reclaimed in the record's current state.
    #[error("SR_ERR_300: Not eligible for reclaim: {reason}")]
    NotEligibleForReclaim { reason: String },

    /// Only the custodian may withdraw the lost-stakes pool.
    #[error("SR_ERR_301: Unauthorized: only the custodian may withdraw lost stakes")]
    Unauthorized,

    // =================================================================
    // Ledger Errors (4xx)
    // =================================================================
    /// The depositor's account does not hold enough value.
    #[error("SR_ERR_400: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// Custody holds less than the requested payout.
    #[error("SR_ERR_401: Insufficient custody balance for payout of {0}")]
    InsufficientCustody(Decimal),

    /// The ledger refused the transfer for a reason of its own.
    #[error("SR_ERR_402: Ledger rejected transfer: {reason}")]
    LedgerRejected { reason: String },

    // =================================================================
    // Audit Errors (8xx)
    // =================================================================
    /// Value was created or destroyed. Critical.
    #[error("SR_ERR_800: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    #[error("SR_ERR_900: Internal error: {0}")]
    Internal(String),

    #[error("SR_ERR_901: Serialization error: {0}")]
    Serialization(String),

    #[error("SR_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl EscrowError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn not_eligible(reason: impl Into<String>) -> Self {
        Self::NotEligibleForReclaim {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
