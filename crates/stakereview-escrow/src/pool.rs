//! Lost-stakes pool.
//!
//! Forfeited stakes stay in ledger custody; the pool is the counter that
//! says how much of custody belongs to the custodian. Only the custodian
//! fixed at initialization can withdraw it, and a withdrawal always takes
//! the whole balance.

use rust_decimal::Decimal;
use stakereview_types::{AccountId, EscrowError, EscrowEvent, Result};

use crate::ledger::Ledger;

/// Aggregate of forfeited value, claimable by one custodian.
#[derive(Debug, Clone)]
pub struct LostStakesPool {
    custodian: AccountId,
    balance: Decimal,
}

impl LostStakesPool {
    #[must_use]
    pub fn new(custodian: AccountId) -> Self {
        Self {
            custodian,
            balance: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn custodian(&self) -> AccountId {
        self.custodian
    }

    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Add forfeited value. The funds themselves never leave custody.
    pub fn forfeit(&mut self, amount: Decimal) {
        self.balance += amount;
        tracing::warn!(amount = %amount, pool = %self.balance, "Stake forfeited to lost-stakes pool");
    }

    /// Pay the whole pool to the custodian and reset it to zero.
    ///
    /// An empty pool still succeeds, paying zero.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the custodian
    /// - any ledger error from the payout; the pool is left unchanged
    pub fn withdraw(&mut self, ledger: &mut dyn Ledger, caller: AccountId) -> Result<EscrowEvent> {
        if caller != self.custodian {
            tracing::warn!(caller = %caller, "Rejected lost-stakes withdrawal from non-custodian");
            return Err(EscrowError::Unauthorized);
        }

        // Zero the counter before paying out.
        let amount = std::mem::replace(&mut self.balance, Decimal::ZERO);
        if !amount.is_zero() {
            if let Err(err) = ledger.payout(self.custodian, amount) {
                self.balance = amount;
                return Err(err);
            }
        }

        tracing::info!(custodian = %self.custodian, amount = %amount, "Lost stakes withdrawn");
        Ok(EscrowEvent::LostStakesWithdrawn {
            custodian: self.custodian,
            amount,
        })
    }
}
