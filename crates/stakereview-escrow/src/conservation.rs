//! Value conservation checker.
//!
//! Invariants enforced on demand:
//! ```text
//! deposited == reclaimed + refunded + forfeited + locked
//! forfeited == withdrawn + pool
//! custody   == locked + pool
//! ```
//!
//! Totals are accumulated from the events every successful call returns, so
//! the audit sees exactly what callers see. If these ever disagree, value
//! was created or destroyed somewhere.

use rust_decimal::Decimal;
use stakereview_types::{EscrowError, EscrowEvent, Result};

/// Lifetime totals of every fund movement through the escrow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConservationAudit {
    deposited: Decimal,
    reclaimed: Decimal,
    refunded: Decimal,
    forfeited: Decimal,
    withdrawn: Decimal,
}

impl ConservationAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the totals. Events without fund movement are
    /// ignored.
    pub fn observe(&mut self, event: &EscrowEvent) {
        match event {
            EscrowEvent::GrantCreated { amount, .. }
            | EscrowEvent::JointGrantAttempted { amount, .. }
            | EscrowEvent::JointGrantCreated { amount, .. } => self.deposited += *amount,
            EscrowEvent::StakeReclaimed { amount, .. } => self.reclaimed += *amount,
            EscrowEvent::JointGrantCanceled { amount, .. } => self.refunded += *amount,
            EscrowEvent::StakeForfeited { amount, .. } => self.forfeited += *amount,
            EscrowEvent::LostStakesWithdrawn { amount, .. } => self.withdrawn += *amount,
            EscrowEvent::ReviewCreated { .. }
            | EscrowEvent::GrantClosed { .. }
            | EscrowEvent::JointReviewSubmitted { .. }
            | EscrowEvent::JointReviewsRevealed { .. }
            | EscrowEvent::JointGrantResolved { .. } => {}
        }
    }

    pub fn observe_all(&mut self, events: &[EscrowEvent]) {
        for event in events {
            self.observe(event);
        }
    }

    #[must_use]
    pub fn total_deposited(&self) -> Decimal {
        self.deposited
    }

    /// Everything paid back to stakers: reclaims plus cancel refunds.
    #[must_use]
    pub fn total_returned(&self) -> Decimal {
        self.reclaimed + self.refunded
    }

    #[must_use]
    pub fn total_forfeited(&self) -> Decimal {
        self.forfeited
    }

    #[must_use]
    pub fn total_withdrawn(&self) -> Decimal {
        self.withdrawn
    }

    /// Value the totals say should still be locked in escrow records.
    #[must_use]
    pub fn expected_locked(&self) -> Decimal {
        self.deposited - self.reclaimed - self.refunded - self.forfeited
    }

    /// Check the totals against the live state.
    ///
    /// # Errors
    /// Returns [`EscrowError::ConservationViolation`] naming the first
    /// invariant that does not hold.
    pub fn verify(&self, locked: Decimal, pool: Decimal, custody: Decimal) -> Result<()> {
        let expected_locked = self.expected_locked();
        if locked != expected_locked {
            return Err(EscrowError::ConservationViolation {
                reason: format!(
                    "locked {locked} != expected {expected_locked} \
                     (deposited={}, reclaimed={}, refunded={}, forfeited={})",
                    self.deposited, self.reclaimed, self.refunded, self.forfeited
                ),
            });
        }
        let expected_pool = self.forfeited - self.withdrawn;
        if pool != expected_pool {
            return Err(EscrowError::ConservationViolation {
                reason: format!(
                    "pool {pool} != expected {expected_pool} (forfeited={}, withdrawn={})",
                    self.forfeited, self.withdrawn
                ),
            });
        }
        if custody != locked + pool {
            return Err(EscrowError::ConservationViolation {
                reason: format!("custody {custody} != locked {locked} + pool {pool}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stakereview_types::AccountId;

    use super::*;

    fn created(amount: i64) -> EscrowEvent {
        EscrowEvent::GrantCreated {
            staker: AccountId::new(),
            counterparty: AccountId::new(),
            expires_at: chrono::Utc::now(),
            amount: Decimal::new(amount, 0),
        }
    }

    fn forfeited(amount: i64) -> EscrowEvent {
        EscrowEvent::StakeForfeited {
            owner: AccountId::new(),
            counterparty: AccountId::new(),
            amount: Decimal::new(amount, 0),
        }
    }

    #[test]
    fn empty_audit_balances() {
        let audit = ConservationAudit::new();
        assert!(audit.verify(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO).is_ok());
    }

    #[test]
    fn deposits_are_locked_until_they_leave() {
        let mut audit = ConservationAudit::new();
        audit.observe_all(&[created(5), created(2)]);
        assert_eq!(audit.expected_locked(), Decimal::new(7, 0));
        assert!(
            audit
                .verify(Decimal::new(7, 0), Decimal::ZERO, Decimal::new(7, 0))
                .is_ok()
        );
    }

    #[test]
    fn forfeiture_moves_value_to_pool() {
        let mut audit = ConservationAudit::new();
        audit.observe_all(&[created(5), forfeited(5)]);
        assert!(
            audit
                .verify(Decimal::ZERO, Decimal::new(5, 0), Decimal::new(5, 0))
                .is_ok()
        );
        audit.observe(&EscrowEvent::LostStakesWithdrawn {
            custodian: AccountId::new(),
            amount: Decimal::new(5, 0),
        });
        assert!(audit.verify(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO).is_ok());
        assert_eq!(audit.total_withdrawn(), Decimal::new(5, 0));
    }

    #[test]
    fn detects_created_value() {
        let mut audit = ConservationAudit::new();
        audit.observe(&created(1));
        let err = audit
            .verify(Decimal::new(2, 0), Decimal::ZERO, Decimal::new(2, 0))
            .unwrap_err();
        assert!(matches!(err, EscrowError::ConservationViolation { .. }));
    }

    #[test]
    fn detects_custody_drift() {
        let mut audit = ConservationAudit::new();
        audit.observe(&created(1));
        let err = audit
            .verify(Decimal::ONE, Decimal::ZERO, Decimal::new(3, 0))
            .unwrap_err();
        assert!(matches!(err, EscrowError::ConservationViolation { .. }));
    }
}
