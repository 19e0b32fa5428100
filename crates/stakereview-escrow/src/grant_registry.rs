//! Single-sided grants.
//!
//! A staker locks value against a review from a named counterparty:
//! - a positive review closes the grant; the staker may then reclaim
//! - a negative review forfeits the stake to the lost-stakes pool at once
//! - with no review, the staker may reclaim once the grant has expired

use std::collections::HashMap;

use rust_decimal::Decimal;
use stakereview_types::{
    AccountId, EscrowConfig, EscrowError, EscrowEvent, Grant, GrantKey, GrantStatus, Result,
    Review,
};

use crate::{clock::Clock, ledger::Ledger, pool::LostStakesPool};

/// Owns every single-sided grant record, keyed by (staker, counterparty).
pub struct GrantRegistry {
    grants: HashMap<GrantKey, Grant>,
    config: EscrowConfig,
}

impl GrantRegistry {
    #[must_use]
    pub fn new(config: EscrowConfig) -> Self {
        Self {
            grants: HashMap::new(),
            config,
        }
    }

    /// Lock `amount` from `staker` against a review by `counterparty`.
    ///
    /// # Errors
    /// - `ZeroStake`, `SelfStake`, `InvalidExpiration` on bad arguments
    /// - `DuplicateGrant` if an unsettled grant exists for the key
    /// - `InsufficientFunds` if the ledger deposit fails
    pub fn create(
        &mut self,
        ledger: &mut dyn Ledger,
        clock: &dyn Clock,
        staker: AccountId,
        counterparty: AccountId,
        expires_at: chrono::DateTime<chrono::Utc>,
        amount: Decimal,
    ) -> Result<Vec<EscrowEvent>> {
        let now = clock.now();
        if amount <= Decimal::ZERO {
            return Err(EscrowError::ZeroStake(amount));
        }
        if staker == counterparty {
            return Err(EscrowError::SelfStake);
        }
        self.config.check_expiration(expires_at, now)?;

        let key = GrantKey::new(staker, counterparty);
        if self.status(&key).is_unsettled() {
            return Err(EscrowError::DuplicateGrant {
                key: key.to_string(),
            });
        }

        // Step 1: lock funds (if this fails, nothing changes)
        ledger.deposit(staker, amount)?;

        // Step 2: open the record, replacing any settled one
        self.grants
            .insert(key, Grant::open(key, amount, expires_at, now));

        tracing::info!(
            staker = %staker,
            counterparty = %counterparty,
            amount = %amount,
            expires_at = %expires_at,
            "Grant created"
        );
        Ok(vec![EscrowEvent::GrantCreated {
            staker,
            counterparty,
            expires_at,
            amount,
        }])
    }

    /// The counterparty reviews the staker. A negative review moves the
    /// stake into `pool` immediately.
    ///
    /// # Errors
    /// - `CommentTooLong` if the comment exceeds the configured limit
    /// - `NotFound` if no active grant exists from `staker` to `reviewer`
    /// - `AlreadyReviewed` if the grant already carries a review
    pub fn review(
        &mut self,
        pool: &mut LostStakesPool,
        clock: &dyn Clock,
        reviewer: AccountId,
        staker: AccountId,
        negative: bool,
        comment: &str,
    ) -> Result<Vec<EscrowEvent>> {
        self.config.check_comment(comment)?;
        let key = GrantKey::new(staker, reviewer);
        let grant = self
            .grants
            .get_mut(&key)
            .filter(|g| g.review.is_some() || g.status == GrantStatus::Active)
            .ok_or_else(|| EscrowError::not_found(format!("active grant {key}")))?;

        grant.record_review(Review::new(reviewer, staker, negative, comment, clock.now()))?;

        let mut events = vec![
            EscrowEvent::ReviewCreated {
                staker,
                reviewer,
                negative,
                comment: comment.to_string(),
            },
            EscrowEvent::GrantClosed {
                staker,
                counterparty: reviewer,
            },
        ];
        if negative {
            pool.forfeit(grant.amount);
            events.push(EscrowEvent::StakeForfeited {
                owner: staker,
                counterparty: reviewer,
                amount: grant.amount,
            });
        }

        tracing::info!(staker = %staker, reviewer = %reviewer, negative, "Grant reviewed");
        Ok(events)
    }

    /// The staker takes the stake back after a positive review, or after
    /// expiry with no review.
    ///
    /// # Errors
    /// - `NotFound` if no grant exists for the key
    /// - `NotEligibleForReclaim` if reviewed negatively, already paid back,
    ///   or unreviewed and not yet expired
    /// - any ledger error from the payout; the grant is left unchanged
    pub fn reclaim(
        &mut self,
        ledger: &mut dyn Ledger,
        clock: &dyn Clock,
        staker: AccountId,
        counterparty: AccountId,
    ) -> Result<Vec<EscrowEvent>> {
        let key = GrantKey::new(staker, counterparty);
        let grant = self
            .grants
            .get_mut(&key)
            .ok_or_else(|| EscrowError::not_found(format!("grant {key}")))?;

        grant.check_reclaim(clock.now())?;

        // Settle before paying out; restore if the ledger refuses.
        let snapshot = grant.clone();
        grant.mark_reclaimed()?;
        if let Err(err) = ledger.payout(staker, grant.amount) {
            *grant = snapshot;
            return Err(err);
        }

        tracing::info!(
            staker = %staker,
            counterparty = %counterparty,
            amount = %grant.amount,
            "Stake reclaimed"
        );
        Ok(vec![EscrowEvent::StakeReclaimed {
            staker,
            counterparty,
            amount: grant.amount,
        }])
    }

    #[must_use]
    pub fn grant(&self, key: &GrantKey) -> Option<&Grant> {
        self.grants.get(key)
    }

    /// Status of a key; `GrantStatus::None` if nothing was ever created.
    #[must_use]
    pub fn status(&self, key: &GrantKey) -> GrantStatus {
        self.grants
            .get(key)
            .map_or(GrantStatus::None, |grant| grant.status)
    }

    /// Value held in custody for unsettled grants.
    #[must_use]
    pub fn locked_total(&self) -> Decimal {
        self.grants
            .values()
            .filter(|g| g.status.is_unsettled())
            .map(|g| g.amount)
            .sum()
    }

    /// Number of records tracked, settled ones included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.grants.len()
    }
}
