//! # Joint grants: two-sided escrow with simultaneous reveal
//!
//! Two parties each stake against the other. A one-sided [`JointAttempt`]
//! waits until the partner attempts back with the same expiration, at which
//! point both are promoted into a [`JointGrant`].
//!
//! ## State Machine
//!
//! ```text
//!   ATTEMPTED ──cancel──▶ CANCELED
//!       │ reciprocal attempt, same expiry
//!       ▼
//!   MATCHED ──review──▶ ONE_REVIEWED ──review──▶ RESOLVED_SUCCESS ──reclaim×2──▶ SETTLED
//!       │                    │                └▶ RESOLVED_FAILURE ──forfeit────▶ SETTLED
//!       └──── expired + reclaim (lazy) ──────────▶ RESOLVED_SUCCESS
//! ```
//!
//! ## Privacy contract
//!
//! Review slots are private. No read path on [`JointGrant`] exposes a single
//! filled slot: [`JointGrant::revealed_reviews`] stays `None` until both are
//! filled, `Debug` output redacts them, and [`JointGrant::state`] reads
//! `MATCHED` until reveal. This is an API contract only;
//! whoever operates the store can read its memory.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, AttemptKey, EscrowError, JointGrantId, PairKey, Result, Review};

/// A pending, unmatched one-sided stake toward a joint grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointAttempt {
    pub key: AttemptKey,
    pub amount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Final verdict of a joint grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Each leg is reclaimable by its owner.
    Success,
    /// Both legs are forfeited to the lost-stakes pool.
    Failure,
}

impl Outcome {
    /// The grant fails only when both reviews are negative.
    #[must_use]
    pub fn from_reviews(a_negative: bool, b_negative: bool) -> Self {
        if a_negative && b_negative {
            Self::Failure
        } else {
            Self::Success
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Observable lifecycle state of a joint grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointGrantState {
    Matched,
    /// Only reported to the owner whose review is in; see
    /// [`JointGrant::state_for`].
    OneReviewed,
    ResolvedSuccess,
    ResolvedFailure,
    /// Both legs paid out or forfeited. Terminal.
    Settled,
}

impl std::fmt::Display for JointGrantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "MATCHED"),
            Self::OneReviewed => write!(f, "ONE_REVIEWED"),
            Self::ResolvedSuccess => write!(f, "RESOLVED_SUCCESS"),
            Self::ResolvedFailure => write!(f, "RESOLVED_FAILURE"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegStatus {
    Locked,
    Reclaimed,
    Forfeited,
}

/// One side's stake inside a joint grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub owner: AccountId,
    pub amount: Decimal,
    pub status: LegStatus,
}

impl Leg {
    fn locked(owner: AccountId, amount: Decimal) -> Self {
        Self {
            owner,
            amount,
            status: LegStatus::Locked,
        }
    }
}

/// A matched two-leg escrow between two accounts.
#[derive(Clone)]
pub struct JointGrant {
    id: JointGrantId,
    pair: PairKey,
    leg_a: Leg,
    leg_b: Leg,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    /// Review written by the owner of leg A about the owner of leg B.
    review_by_a: Option<Review>,
    review_by_b: Option<Review>,
    resolution: Option<Outcome>,
}

impl JointGrant {
    /// Promote two reciprocal attempts into a grant. `initiator` is the
    /// attempt that completed the match and becomes leg A.
    ///
    /// # Errors
    /// `MismatchedTerms` if the expirations differ; `Internal` if the
    /// attempts are not reciprocal.
    pub fn from_attempts(
        initiator: &JointAttempt,
        partner: &JointAttempt,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if initiator.key.reciprocal() != partner.key {
            return Err(EscrowError::Internal(format!(
                "attempts {} and {} are not reciprocal",
                initiator.key, partner.key
            )));
        }
        if initiator.expires_at != partner.expires_at {
            return Err(EscrowError::MismatchedTerms {
                ours: initiator.expires_at,
                theirs: partner.expires_at,
            });
        }
        Ok(Self {
            id: JointGrantId::new(),
            pair: initiator.key.pair(),
            leg_a: Leg::locked(initiator.key.initiator, initiator.amount),
            leg_b: Leg::locked(partner.key.initiator, partner.amount),
            expires_at: initiator.expires_at,
            created_at,
            review_by_a: None,
            review_by_b: None,
            resolution: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> JointGrantId {
        self.id
    }

    #[must_use]
    pub fn pair(&self) -> PairKey {
        self.pair
    }

    #[must_use]
    pub fn legs(&self) -> (&Leg, &Leg) {
        (&self.leg_a, &self.leg_b)
    }

    #[must_use]
    pub fn leg_of(&self, owner: AccountId) -> Option<&Leg> {
        if self.leg_a.owner == owner {
            Some(&self.leg_a)
        } else if self.leg_b.owner == owner {
            Some(&self.leg_b)
        } else {
            None
        }
    }

    fn leg_of_mut(&mut self, owner: AccountId) -> Option<&mut Leg> {
        if self.leg_a.owner == owner {
            Some(&mut self.leg_a)
        } else if self.leg_b.owner == owner {
            Some(&mut self.leg_b)
        } else {
            None
        }
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Final outcome, once resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.resolution
    }

    /// Whether `caller` has filled their own slot. There is no form that
    /// asks about the other owner: until reveal, only the author of a review
    /// learns that it exists.
    #[must_use]
    pub fn has_reviewed(&self, caller: AccountId) -> bool {
        self.own_slot(caller).is_some_and(Option::is_some)
    }

    fn own_slot(&self, caller: AccountId) -> Option<&Option<Review>> {
        if caller == self.leg_a.owner {
            Some(&self.review_by_a)
        } else if caller == self.leg_b.owner {
            Some(&self.review_by_b)
        } else {
            None
        }
    }

    /// Both reviews, in leg order, once both slots are filled.
    #[must_use]
    pub fn revealed_reviews(&self) -> Option<(&Review, &Review)> {
        match (&self.review_by_a, &self.review_by_b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.leg_a.status != LegStatus::Locked && self.leg_b.status != LegStatus::Locked
    }

    /// State as seen by anyone. A single sealed review is not visible here:
    /// the grant reads `Matched` until both slots fill.
    #[must_use]
    pub fn state(&self) -> JointGrantState {
        if self.is_settled() {
            return JointGrantState::Settled;
        }
        match self.resolution {
            Some(Outcome::Success) => JointGrantState::ResolvedSuccess,
            Some(Outcome::Failure) => JointGrantState::ResolvedFailure,
            None => JointGrantState::Matched,
        }
    }

    /// State as seen by `caller`: `OneReviewed` once the caller's own
    /// review is in and the grant is still unresolved.
    #[must_use]
    pub fn state_for(&self, caller: AccountId) -> JointGrantState {
        match self.state() {
            JointGrantState::Matched if self.has_reviewed(caller) => JointGrantState::OneReviewed,
            state => state,
        }
    }

    /// Fill the reviewer's slot. Returns the outcome when this review is the
    /// second one and resolves the grant.
    ///
    /// # Errors
    /// - `NotAParticipant` if the reviewer or reviewee is not the pair
    /// - `AlreadyResolved` if the grant was already resolved, or expired
    ///   before `review.submitted_at` (it has then succeeded by fallback)
    /// - `AlreadyReviewed` if the reviewer's slot is filled
    pub fn submit_review(&mut self, review: Review) -> Result<Option<Outcome>> {
        if self.pair.other(review.reviewer) != Some(review.reviewee) {
            return Err(EscrowError::NotAParticipant {
                key: self.pair.to_string(),
            });
        }
        if self.effective_outcome(review.submitted_at).is_some() {
            return Err(EscrowError::AlreadyResolved {
                key: self.pair.to_string(),
            });
        }
        let slot = if review.reviewer == self.leg_a.owner {
            &mut self.review_by_a
        } else {
            &mut self.review_by_b
        };
        if slot.is_some() {
            return Err(EscrowError::AlreadyReviewed {
                key: self.pair.to_string(),
            });
        }
        *slot = Some(review);

        let resolved = self
            .revealed_reviews()
            .map(|(a, b)| Outcome::from_reviews(a.negative, b.negative));
        self.resolution = resolved;
        Ok(resolved)
    }

    /// The outcome that applies at `now` without mutating anything: the
    /// recorded resolution, or success by fallback once expired. Expiry can
    /// never yield failure because two negative reviews resolve immediately.
    #[must_use]
    pub fn effective_outcome(&self, now: DateTime<Utc>) -> Option<Outcome> {
        match self.resolution {
            Some(outcome) => Some(outcome),
            None if self.is_expired(now) => Some(Outcome::Success),
            None => None,
        }
    }

    /// Check whether `owner` may reclaim their leg at `now`.
    ///
    /// # Errors
    /// `NotAParticipant` for strangers, `NotEligibleForReclaim` otherwise.
    pub fn check_reclaim(&self, owner: AccountId, now: DateTime<Utc>) -> Result<&Leg> {
        let leg = self.leg_of(owner).ok_or_else(|| EscrowError::NotAParticipant {
            key: self.pair.to_string(),
        })?;
        match (leg.status, self.effective_outcome(now)) {
            (LegStatus::Reclaimed, _) => Err(EscrowError::not_eligible(format!(
                "leg of {owner} in {} already reclaimed",
                self.pair
            ))),
            (LegStatus::Forfeited, _) | (_, Some(Outcome::Failure)) => Err(
                EscrowError::not_eligible(format!("joint grant {} failed; stakes forfeited", self.pair)),
            ),
            (LegStatus::Locked, Some(Outcome::Success)) => Ok(leg),
            (LegStatus::Locked, None) => Err(EscrowError::not_eligible(format!(
                "joint grant {} unresolved until {}",
                self.pair, self.expires_at
            ))),
        }
    }

    /// Commit a reclaim for `owner`: resolve lazily if expired and mark the
    /// leg reclaimed. Returns the amount owed.
    ///
    /// # Errors
    /// Same as [`JointGrant::check_reclaim`].
    pub fn mark_reclaimed(&mut self, owner: AccountId, now: DateTime<Utc>) -> Result<Decimal> {
        let amount = self.check_reclaim(owner, now)?.amount;
        if self.resolution.is_none() {
            self.resolution = Some(Outcome::Success);
        }
        if let Some(leg) = self.leg_of_mut(owner) {
            leg.status = LegStatus::Reclaimed;
        }
        Ok(amount)
    }

    /// Forfeit every still-locked leg. Returns the total moved out.
    pub fn forfeit_all(&mut self) -> Decimal {
        let mut total = Decimal::ZERO;
        for leg in [&mut self.leg_a, &mut self.leg_b] {
            if leg.status == LegStatus::Locked {
                leg.status = LegStatus::Forfeited;
                total += leg.amount;
            }
        }
        total
    }

    /// Value still held in custody for this grant.
    #[must_use]
    pub fn locked_amount(&self) -> Decimal {
        [&self.leg_a, &self.leg_b]
            .into_iter()
            .filter(|leg| leg.status == LegStatus::Locked)
            .map(|leg| leg.amount)
            .sum()
    }
}

impl std::fmt::Debug for JointGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reviews = if self.revealed_reviews().is_some() {
            "revealed"
        } else {
            "sealed"
        };
        f.debug_struct("JointGrant")
            .field("id", &self.id)
            .field("pair", &self.pair)
            .field("leg_a", &self.leg_a)
            .field("leg_b", &self.leg_b)
            .field("expires_at", &self.expires_at)
            .field("reviews", &reviews)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}
