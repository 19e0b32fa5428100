//! Joint grants: two parties stake against each other.
//!
//! ## Matching
//!
//! `attempt` stores a one-sided [`JointAttempt`]. When the partner attempts
//! back with the same expiration, both attempts are consumed and promoted
//! into a [`JointGrant`]. A reciprocal attempt with a different expiration
//! is refused and left untouched. Until matched, an attempt can be
//! cancelled for a full refund.
//!
//! ## Resolution
//!
//! Each owner fills one sealed review slot. Nothing about a single slot is
//! revealed; when the second slot fills, both reviews are revealed and the
//! grant resolves on the spot. It fails only if both reviews are negative,
//! in which case both legs move to the lost-stakes pool. An expired grant
//! that has not failed resolves to success lazily on the first reclaim.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use stakereview_types::{
    AccountId, AttemptKey, EscrowConfig, EscrowError, EscrowEvent, JointAttempt, JointGrant,
    LegStatus, Outcome, PairKey, Result, Review,
};

use crate::{clock::Clock, ledger::Ledger, pool::LostStakesPool};

/// Pending attempts and matched joint grants.
pub struct JointMatchRegistry {
    attempts: HashMap<AttemptKey, JointAttempt>,
    grants: HashMap<PairKey, JointGrant>,
    config: EscrowConfig,
}

impl JointMatchRegistry {
    #[must_use]
    pub fn new(config: EscrowConfig) -> Self {
        Self {
            attempts: HashMap::new(),
            grants: HashMap::new(),
            config,
        }
    }

    /// Stake `amount` from `initiator` toward a joint grant with `partner`.
    ///
    /// Matches immediately if `partner` already attempted back with the
    /// same expiration; otherwise the attempt waits.
    ///
    /// # Errors
    /// - `ZeroStake`, `SelfStake`, `InvalidExpiration` on bad arguments
    /// - `DuplicateGrant` if the caller already has a pending attempt toward
    ///   `partner`, or the pair has an unsettled joint grant
    /// - `MismatchedTerms` if the partner's attempt has another expiration
    /// - `InsufficientFunds` if the ledger deposit fails
    pub fn attempt(
        &mut self,
        ledger: &mut dyn Ledger,
        clock: &dyn Clock,
        initiator: AccountId,
        partner: AccountId,
        expires_at: DateTime<Utc>,
        amount: Decimal,
    ) -> Result<Vec<EscrowEvent>> {
        let now = clock.now();
        if amount <= Decimal::ZERO {
            return Err(EscrowError::ZeroStake(amount));
        }
        if initiator == partner {
            return Err(EscrowError::SelfStake);
        }
        self.config.check_expiration(expires_at, now)?;

        let key = AttemptKey::new(initiator, partner);
        if self.attempts.contains_key(&key) {
            return Err(EscrowError::DuplicateGrant {
                key: key.to_string(),
            });
        }
        if self.grants.get(&key.pair()).is_some_and(|g| !g.is_settled()) {
            return Err(EscrowError::DuplicateGrant {
                key: key.pair().to_string(),
            });
        }

        let attempt = JointAttempt {
            key,
            amount,
            expires_at,
            created_at: now,
        };
        // Build the grant before touching funds so a term mismatch is free.
        let matched = self
            .attempts
            .get(&key.reciprocal())
            .map(|theirs| JointGrant::from_attempts(&attempt, theirs, now))
            .transpose()?;

        ledger.deposit(initiator, amount)?;

        let Some(grant) = matched else {
            self.attempts.insert(key, attempt);
            tracing::info!(
                initiator = %initiator,
                partner = %partner,
                amount = %amount,
                expires_at = %expires_at,
                "Joint grant attempted"
            );
            return Ok(vec![EscrowEvent::JointGrantAttempted {
                initiator,
                partner,
                expires_at,
                amount,
            }]);
        };

        self.attempts.remove(&key.reciprocal());
        let partner_amount = grant.legs().1.amount;
        let id = grant.id();
        self.grants.insert(key.pair(), grant);
        tracing::info!(
            id = %id,
            initiator = %initiator,
            partner = %partner,
            amount = %amount,
            partner_amount = %partner_amount,
            expires_at = %expires_at,
            "Joint grant created"
        );
        Ok(vec![EscrowEvent::JointGrantCreated {
            id,
            initiator,
            partner,
            expires_at,
            amount,
            partner_amount,
        }])
    }

    /// Withdraw a pending attempt and refund it.
    ///
    /// # Errors
    /// - `NotFound` if there is no pending attempt (including after a match)
    /// - any ledger error from the refund; the attempt is left in place
    pub fn cancel(
        &mut self,
        ledger: &mut dyn Ledger,
        initiator: AccountId,
        partner: AccountId,
    ) -> Result<Vec<EscrowEvent>> {
        let key = AttemptKey::new(initiator, partner);
        let attempt = self
            .attempts
            .remove(&key)
            .ok_or_else(|| EscrowError::not_found(format!("pending attempt {key}")))?;

        if let Err(err) = ledger.payout(initiator, attempt.amount) {
            self.attempts.insert(key, attempt);
            return Err(err);
        }

        tracing::info!(initiator = %initiator, partner = %partner, amount = %attempt.amount, "Joint grant attempt canceled");
        Ok(vec![EscrowEvent::JointGrantCanceled {
            initiator,
            partner,
            amount: attempt.amount,
        }])
    }

    /// `reviewer` fills their sealed slot about `reviewee`.
    ///
    /// The first review returns only a commitment digest to its author. The
    /// second reveals both, resolves the grant, and on failure forfeits both
    /// legs to `pool`.
    ///
    /// # Errors
    /// - `CommentTooLong` if the comment exceeds the configured limit
    /// - `NotFound` if the pair has no matched joint grant
    /// - `AlreadyReviewed` / `AlreadyResolved` per [`JointGrant::submit_review`];
    ///   once expired, an unresolved grant has succeeded and takes no reviews
    pub fn review(
        &mut self,
        pool: &mut LostStakesPool,
        clock: &dyn Clock,
        reviewer: AccountId,
        reviewee: AccountId,
        negative: bool,
        comment: &str,
    ) -> Result<Vec<EscrowEvent>> {
        self.config.check_comment(comment)?;
        let pair = PairKey::new(reviewer, reviewee);
        let grant = self
            .grants
            .get_mut(&pair)
            .ok_or_else(|| EscrowError::not_found(format!("joint grant {pair}")))?;

        let review = Review::new(reviewer, reviewee, negative, comment, clock.now());
        let commitment = review.commitment_hex();
        let id = grant.id();

        let Some(outcome) = grant.submit_review(review)? else {
            tracing::info!(id = %id, reviewer = %reviewer, "Joint review sealed");
            return Ok(vec![EscrowEvent::JointReviewSubmitted {
                id,
                reviewer,
                reviewee,
                commitment,
            }]);
        };

        let mut events = Vec::with_capacity(4);
        if let Some((a, b)) = grant.revealed_reviews() {
            events.push(EscrowEvent::JointReviewsRevealed {
                id,
                reviews: [a.clone(), b.clone()],
            });
        }
        events.push(EscrowEvent::JointGrantResolved { id, outcome });

        if outcome == Outcome::Failure {
            let forfeited = grant.forfeit_all();
            pool.forfeit(forfeited);
            let (leg_a, leg_b) = grant.legs();
            for (leg, other) in [(leg_a, leg_b), (leg_b, leg_a)] {
                events.push(EscrowEvent::StakeForfeited {
                    owner: leg.owner,
                    counterparty: other.owner,
                    amount: leg.amount,
                });
            }
        }

        tracing::info!(id = %id, outcome = %outcome, "Joint grant resolved");
        Ok(events)
    }

    /// A leg owner takes their own stake back after success, or after
    /// expiry when the grant has not failed.
    ///
    /// # Errors
    /// - `NotFound` if the pair has no matched joint grant
    /// - `NotEligibleForReclaim` if failed, unresolved and unexpired, or
    ///   already reclaimed
    /// - any ledger error from the payout; the grant is left unchanged
    pub fn reclaim(
        &mut self,
        ledger: &mut dyn Ledger,
        clock: &dyn Clock,
        owner: AccountId,
        counterparty: AccountId,
    ) -> Result<Vec<EscrowEvent>> {
        let pair = PairKey::new(owner, counterparty);
        let grant = self
            .grants
            .get_mut(&pair)
            .ok_or_else(|| EscrowError::not_found(format!("joint grant {pair}")))?;

        let was_resolved = grant.outcome().is_some();
        // Settle the leg before paying out; restore if the ledger refuses.
        let snapshot = grant.clone();
        let amount = grant.mark_reclaimed(owner, clock.now())?;
        if let Err(err) = ledger.payout(owner, amount) {
            *grant = snapshot;
            return Err(err);
        }

        let mut events = Vec::with_capacity(2);
        if !was_resolved {
            tracing::info!(id = %grant.id(), "Expired joint grant resolved as success");
            events.push(EscrowEvent::JointGrantResolved {
                id: grant.id(),
                outcome: Outcome::Success,
            });
        }
        tracing::info!(id = %grant.id(), owner = %owner, amount = %amount, "Joint stake reclaimed");
        events.push(EscrowEvent::StakeReclaimed {
            staker: owner,
            counterparty,
            amount,
        });
        Ok(events)
    }

    #[must_use]
    pub fn attempt_for(&self, initiator: AccountId, partner: AccountId) -> Option<&JointAttempt> {
        self.attempts.get(&AttemptKey::new(initiator, partner))
    }

    #[must_use]
    pub fn joint_grant(&self, a: AccountId, b: AccountId) -> Option<&JointGrant> {
        self.grants.get(&PairKey::new(a, b))
    }

    /// Value held in custody for pending attempts and locked legs.
    #[must_use]
    pub fn locked_total(&self) -> Decimal {
        let pending: Decimal = self.attempts.values().map(|a| a.amount).sum();
        let legs: Decimal = self.grants.values().map(JointGrant::locked_amount).sum();
        pending + legs
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.attempts.len()
    }

    /// Number of joint grants with at least one leg still locked.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.grants
            .values()
            .filter(|g| {
                let (a, b) = g.legs();
                a.status == LegStatus::Locked || b.status == LegStatus::Locked
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use stakereview_types::{EventKind, JointGrantState, kinds};

    use super::*;
    use crate::{clock::ManualClock, ledger::InMemoryLedger};

    struct Fixture {
        registry: JointMatchRegistry,
        pool: LostStakesPool,
        ledger: InMemoryLedger,
        clock: ManualClock,
        alice: AccountId,
        bob: AccountId,
    }

    fn setup() -> Fixture {
        let custodian = AccountId::new();
        let alice = AccountId::new();
        let bob = AccountId::new();
        let mut ledger = InMemoryLedger::new();
        ledger.fund(alice, Decimal::new(10, 0));
        ledger.fund(bob, Decimal::new(10, 0));
        Fixture {
            registry: JointMatchRegistry::new(EscrowConfig::new(custodian)),
            pool: LostStakesPool::new(custodian),
            ledger,
            clock: ManualClock::starting_now(),
            alice,
            bob,
        }
    }

    impl Fixture {
        fn week(&self) -> DateTime<Utc> {
            self.clock.now() + Duration::weeks(1)
        }

        fn attempt(
            &mut self,
            from: AccountId,
            to: AccountId,
            expires_at: DateTime<Utc>,
            amount: i64,
        ) -> Result<Vec<EscrowEvent>> {
            self.registry.attempt(
                &mut self.ledger,
                &self.clock,
                from,
                to,
                expires_at,
                Decimal::new(amount, 0),
            )
        }

        fn matched(&mut self) {
            let expiry = self.week();
            self.attempt(self.alice, self.bob, expiry, 1).unwrap();
            self.attempt(self.bob, self.alice, expiry, 2).unwrap();
        }

        fn review(&mut self, from: AccountId, to: AccountId, negative: bool) -> Result<Vec<EscrowEvent>> {
            self.registry
                .review(&mut self.pool, &self.clock, from, to, negative, "it was fine.")
        }

        fn reclaim(&mut self, owner: AccountId, other: AccountId) -> Result<Vec<EscrowEvent>> {
            self.registry
                .reclaim(&mut self.ledger, &self.clock, owner, other)
        }
    }

    #[test]
    fn first_attempt_waits_second_matches() {
        let mut f = setup();
        let expiry = f.week();
        let events = f.attempt(f.alice, f.bob, expiry, 1).unwrap();
        assert_eq!(kinds(&events), vec![EventKind::JointGrantAttempted]);
        assert_eq!(f.registry.pending_count(), 1);

        let events = f.attempt(f.bob, f.alice, expiry, 2).unwrap();
        assert!(matches!(
            events.as_slice(),
            [EscrowEvent::JointGrantCreated { initiator, partner, amount, partner_amount, .. }]
                if *initiator == f.bob
                    && *partner == f.alice
                    && *amount == Decimal::new(2, 0)
                    && *partner_amount == Decimal::ONE
        ));
        assert_eq!(f.registry.pending_count(), 0);
        assert_eq!(f.registry.open_count(), 1);
        assert_eq!(f.ledger.custody_balance(), Decimal::new(3, 0));
        let grant = f.registry.joint_grant(f.alice, f.bob).unwrap();
        assert_eq!(grant.state(), JointGrantState::Matched);
    }

    #[test]
    fn duplicate_attempt_rejected() {
        let mut f = setup();
        let expiry = f.week();
        f.attempt(f.alice, f.bob, expiry, 1).unwrap();
        let err = f.attempt(f.alice, f.bob, expiry, 1).unwrap_err();
        assert!(matches!(err, EscrowError::DuplicateGrant { .. }));
        assert_eq!(f.ledger.balance(f.alice), Decimal::new(9, 0));
    }

    #[test]
    fn attempt_blocked_while_joint_grant_open() {
        let mut f = setup();
        f.matched();
        let expiry = f.week();
        let err = f.attempt(f.alice, f.bob, expiry, 1).unwrap_err();
        assert!(matches!(err, EscrowError::DuplicateGrant { .. }));
        let err = f.attempt(f.bob, f.alice, expiry, 1).unwrap_err();
        assert!(matches!(err, EscrowError::DuplicateGrant { .. }));
    }

    #[test]
    fn mismatched_expiry_leaves_first_attempt_cancelable() {
        let mut f = setup();
        let expiry = f.week();
        f.attempt(f.alice, f.bob, expiry, 1).unwrap();
        let err = f
            .attempt(f.bob, f.alice, expiry + Duration::weeks(1), 2)
            .unwrap_err();
        assert!(matches!(err, EscrowError::MismatchedTerms { .. }));
        assert_eq!(f.ledger.balance(f.bob), Decimal::new(10, 0));
        assert!(f.registry.attempt_for(f.alice, f.bob).is_some());

        let events = f.registry.cancel(&mut f.ledger, f.alice, f.bob).unwrap();
        assert_eq!(kinds(&events), vec![EventKind::JointGrantCanceled]);
        assert_eq!(f.ledger.balance(f.alice), Decimal::new(10, 0));
    }

    #[test]
    fn cancel_after_match_not_found() {
        let mut f = setup();
        f.matched();
        let err = f.registry.cancel(&mut f.ledger, f.alice, f.bob).unwrap_err();
        assert!(matches!(err, EscrowError::NotFound { .. }));
    }

    #[test]
    fn canceled_attempt_does_not_match() {
        let mut f = setup();
        let expiry = f.week();
        f.attempt(f.alice, f.bob, expiry, 1).unwrap();
        f.registry.cancel(&mut f.ledger, f.alice, f.bob).unwrap();
        let events = f.attempt(f.bob, f.alice, expiry, 2).unwrap();
        assert_eq!(kinds(&events), vec![EventKind::JointGrantAttempted]);
    }

    #[test]
    fn review_before_match_not_found() {
        let mut f = setup();
        let expiry = f.week();
        f.attempt(f.alice, f.bob, expiry, 1).unwrap();
        let err = f.review(f.alice, f.bob, false).unwrap_err();
        assert!(matches!(err, EscrowError::NotFound { .. }));
    }

    #[test]
    fn first_review_is_sealed() {
        let mut f = setup();
        f.matched();
        let events = f.review(f.alice, f.bob, true).unwrap();
        let [EscrowEvent::JointReviewSubmitted { commitment, .. }] = events.as_slice() else {
            panic!("unexpected events: {events:?}");
        };
        assert_eq!(commitment.len(), 64);
        assert!(!format!("{events:?}").contains("it was fine."));
        let grant = f.registry.joint_grant(f.alice, f.bob).unwrap();
        assert!(grant.revealed_reviews().is_none());
        assert!(grant.outcome().is_none());
    }

    #[test]
    fn mixed_reviews_succeed_each_leg_reclaims_own() {
        let mut f = setup();
        f.matched();
        f.review(f.alice, f.bob, false).unwrap();
        let events = f.review(f.bob, f.alice, true).unwrap();
        assert_eq!(
            kinds(&events),
            vec![EventKind::JointReviewsRevealed, EventKind::JointGrantResolved]
        );

        let events = f.reclaim(f.alice, f.bob).unwrap();
        assert!(matches!(
            events.as_slice(),
            [EscrowEvent::StakeReclaimed { amount, .. }] if *amount == Decimal::ONE
        ));
        f.reclaim(f.bob, f.alice).unwrap();
        assert_eq!(f.ledger.balance(f.alice), Decimal::new(10, 0));
        assert_eq!(f.ledger.balance(f.bob), Decimal::new(10, 0));
        let grant = f.registry.joint_grant(f.alice, f.bob).unwrap();
        assert_eq!(grant.state(), JointGrantState::Settled);
    }

    #[test]
    fn double_negative_forfeits_both_legs() {
        let mut f = setup();
        f.matched();
        f.review(f.alice, f.bob, true).unwrap();
        let events = f.review(f.bob, f.alice, true).unwrap();
        assert_eq!(
            kinds(&events),
            vec![
                EventKind::JointReviewsRevealed,
                EventKind::JointGrantResolved,
                EventKind::StakeForfeited,
                EventKind::StakeForfeited
            ]
        );
        assert_eq!(f.pool.balance(), Decimal::new(3, 0));
        assert_eq!(f.registry.locked_total(), Decimal::ZERO);

        for (owner, other) in [(f.alice, f.bob), (f.bob, f.alice)] {
            let err = f.reclaim(owner, other).unwrap_err();
            assert!(matches!(err, EscrowError::NotEligibleForReclaim { .. }));
        }
    }

    #[test]
    fn reclaim_blocked_until_resolution_or_expiry() {
        let mut f = setup();
        f.matched();
        f.review(f.alice, f.bob, false).unwrap();
        let err = f.reclaim(f.alice, f.bob).unwrap_err();
        assert!(matches!(err, EscrowError::NotEligibleForReclaim { .. }));
        let err = f.reclaim(f.bob, f.alice).unwrap_err();
        assert!(matches!(err, EscrowError::NotEligibleForReclaim { .. }));
    }

    #[test]
    fn expiry_without_reviews_falls_back_to_success() {
        let mut f = setup();
        f.matched();
        f.clock.advance(Duration::weeks(1) + Duration::seconds(1));

        let events = f.reclaim(f.alice, f.bob).unwrap();
        assert_eq!(
            kinds(&events),
            vec![EventKind::JointGrantResolved, EventKind::StakeReclaimed]
        );
        let events = f.reclaim(f.bob, f.alice).unwrap();
        assert_eq!(kinds(&events), vec![EventKind::StakeReclaimed]);
        assert_eq!(f.ledger.custody_balance(), Decimal::ZERO);

        let err = f.review(f.alice, f.bob, true).unwrap_err();
        assert!(matches!(err, EscrowError::AlreadyResolved { .. }));
    }

    #[test]
    fn late_review_cannot_turn_expired_grant_into_failure() {
        let mut f = setup();
        f.matched();
        f.review(f.alice, f.bob, true).unwrap();
        f.clock.advance(Duration::weeks(2));

        let err = f.review(f.bob, f.alice, true).unwrap_err();
        assert!(matches!(err, EscrowError::AlreadyResolved { .. }));
        assert_eq!(f.pool.balance(), Decimal::ZERO);

        f.reclaim(f.alice, f.bob).unwrap();
        f.reclaim(f.bob, f.alice).unwrap();
        assert_eq!(f.ledger.balance(f.alice), Decimal::new(10, 0));
        assert_eq!(f.ledger.balance(f.bob), Decimal::new(10, 0));
    }

    #[test]
    fn sealed_review_hidden_from_partner_view() {
        let mut f = setup();
        f.matched();
        let before = f.registry.joint_grant(f.bob, f.alice).unwrap();
        let before = (before.state(), before.state_for(f.bob), before.has_reviewed(f.bob));

        f.review(f.alice, f.bob, true).unwrap();
        let grant = f.registry.joint_grant(f.bob, f.alice).unwrap();
        assert_eq!(
            (grant.state(), grant.state_for(f.bob), grant.has_reviewed(f.bob)),
            before
        );
        assert_eq!(grant.state_for(f.alice), JointGrantState::OneReviewed);
    }

    #[test]
    fn settled_pair_can_match_again() {
        let mut f = setup();
        f.matched();
        f.review(f.alice, f.bob, true).unwrap();
        f.review(f.bob, f.alice, true).unwrap();
        f.matched();
        let grant = f.registry.joint_grant(f.alice, f.bob).unwrap();
        assert_eq!(grant.state(), JointGrantState::Matched);
        assert_eq!(f.registry.locked_total(), Decimal::new(3, 0));
    }
}
