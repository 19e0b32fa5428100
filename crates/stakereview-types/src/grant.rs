//! # Grant: single-sided conditional escrow
//!
//! A staker locks value against a future review from a named counterparty.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐ create ┌────────┐ review(+) ┌────────┐ reclaim ┌─────────┐
//!   │ NONE ├───────▶│ ACTIVE ├──────────▶│ CLOSED ├────────▶│ SETTLED │
//!   └──────┘        └──┬─────┘           └────────┘         └─────────┘
//!                      │ review(-): forfeit          ▲
//!                      │ expired + reclaim           │
//!                      └─────────────────────────────┘
//! ```
//!
//! `SETTLED` records are kept for history but no longer block a new
//! grant under the same key.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EscrowError, GrantKey, Result, Review};

/// Lifecycle status of a grant key.
///
/// Transitions are **monotonic** within one record:
/// - `None → Active` (create)
/// - `Active → Closed` (positive review)
/// - `Active → Settled` (negative review forfeits, or reclaim after expiry)
/// - `Closed → Settled` (reclaim)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantStatus {
    /// No record has ever been created under this key.
    None,
    /// Funds are in custody, waiting for a review or expiry.
    Active,
    /// Reviewed positively; the staker may reclaim.
    Closed,
    /// Paid back or forfeited. Terminal.
    Settled,
}

impl GrantStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::None, Self::Active)
                | (Self::Active, Self::Closed | Self::Settled)
                | (Self::Closed, Self::Settled)
        )
    }

    /// Whether a record in this status still holds funds in custody.
    #[must_use]
    pub fn is_unsettled(&self) -> bool {
        matches!(self, Self::Active | Self::Closed)
    }
}

impl std::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// How a settled stake left custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Settlement {
    /// Paid back to the staker.
    Reclaimed,
    /// Moved to the lost-stakes pool.
    Forfeited,
}

/// A single-sided escrow record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub key: GrantKey,
    pub amount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub status: GrantStatus,
    /// At most one review per grant.
    pub review: Option<Review>,
    /// Set once the grant reaches `Settled`.
    pub settlement: Option<Settlement>,
}

impl Grant {
    /// A freshly created, `Active` grant.
    #[must_use]
    pub fn open(
        key: GrantKey,
        amount: Decimal,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            amount,
            expires_at,
            created_at,
            status: GrantStatus::Active,
            review: None,
            settlement: None,
        }
    }

    /// Expiration is strict: at `expires_at` exactly the grant is still live.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Record the counterparty's review.
    ///
    /// A positive review closes the grant; a negative one settles it as
    /// forfeited on the spot.
    ///
    /// # Errors
    /// `AlreadyReviewed` if a review is on record, `NotFound` if the grant
    /// was already settled without one.
    pub fn record_review(&mut self, review: Review) -> Result<()> {
        if self.review.is_some() {
            return Err(EscrowError::AlreadyReviewed {
                key: self.key.to_string(),
            });
        }
        if self.status != GrantStatus::Active {
            return Err(EscrowError::not_found(format!(
                "active grant {} (status {})",
                self.key, self.status
            )));
        }
        if review.negative {
            self.status = GrantStatus::Settled;
            self.settlement = Some(Settlement::Forfeited);
        } else {
            self.status = GrantStatus::Closed;
        }
        self.review = Some(review);
        Ok(())
    }

    /// Check whether the staker may take the stake back at `now`.
    ///
    /// # Errors
    /// `NotEligibleForReclaim` for a negative review, an unreviewed grant
    /// that has not expired, or a grant already paid back.
    pub fn check_reclaim(&self, now: DateTime<Utc>) -> Result<()> {
        match (self.status, self.settlement) {
            (GrantStatus::Closed, _) => Ok(()),
            (GrantStatus::Active, _) if self.is_expired(now) => Ok(()),
            (GrantStatus::Active, _) => Err(EscrowError::not_eligible(format!(
                "grant {} is unreviewed and expires at {}",
                self.key, self.expires_at
            ))),
            (_, Some(Settlement::Forfeited)) => Err(EscrowError::not_eligible(format!(
                "grant {} was reviewed negatively and forfeited",
                self.key
            ))),
            _ => Err(EscrowError::not_eligible(format!(
                "grant {} is already {}",
                self.key, self.status
            ))),
        }
    }

    /// Mark the grant as paid back.
    ///
    /// # Errors
    /// Returns `Internal` if the current status cannot move to `Settled`.
    pub fn mark_reclaimed(&mut self) -> Result<()> {
        if !self.status.can_transition_to(GrantStatus::Settled) {
            return Err(EscrowError::Internal(format!(
                "cannot transition grant {} from {} to SETTLED",
                self.key, self.status
            )));
        }
        self.status = GrantStatus::Settled;
        self.settlement = Some(Settlement::Reclaimed);
        Ok(())
    }
}
