//! Value custody for the escrow.
//!
//! The [`Ledger`] trait is the seam to whatever actually holds value. It
//! moves funds between participant accounts and a single custody account.
//! All mutations are atomic: either the full transfer happens or the
//! balances are unchanged.

use std::collections::HashMap;

use rust_decimal::Decimal;
use stakereview_types::{AccountId, EscrowError, Result};

/// Deposit-on-call and payout-to-recipient over a custody account.
pub trait Ledger {
    /// Move `amount` from `from` into custody.
    ///
    /// # Errors
    /// `InsufficientFunds` if `from` cannot cover it.
    fn deposit(&mut self, from: AccountId, amount: Decimal) -> Result<()>;

    /// Move `amount` out of custody to `to`.
    ///
    /// # Errors
    /// `InsufficientCustody` if custody cannot cover it, or
    /// `LedgerRejected` if the backend refuses the transfer.
    fn payout(&mut self, to: AccountId, amount: Decimal) -> Result<()>;

    /// Spendable balance of an account.
    fn balance(&self, account: AccountId) -> Decimal;

    /// Value currently held in custody.
    fn custody_balance(&self) -> Decimal;
}

/// Reference ledger kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<AccountId, Decimal>,
    custody: Decimal,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account from outside the system (initial funding).
    pub fn fund(&mut self, account: AccountId, amount: Decimal) {
        *self.balances.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    /// Sum of every account balance plus custody.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.balances.values().copied().sum::<Decimal>() + self.custody
    }
}

impl Ledger for InMemoryLedger {
    fn deposit(&mut self, from: AccountId, amount: Decimal) -> Result<()> {
        let available = self.balance(from);
        if amount < Decimal::ZERO || available < amount {
            return Err(EscrowError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        self.balances.insert(from, available - amount);
        self.custody += amount;
        Ok(())
    }

    fn payout(&mut self, to: AccountId, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO || self.custody < amount {
            return Err(EscrowError::InsufficientCustody(amount));
        }
        self.custody -= amount;
        *self.balances.entry(to).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    fn balance(&self, account: AccountId) -> Decimal {
        self.balances.get(&account).copied().unwrap_or(Decimal::ZERO)
    }

    fn custody_balance(&self) -> Decimal {
        self.custody
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_increases_balance() {
        let mut ledger = InMemoryLedger::new();
        let user = AccountId::new();
        ledger.fund(user, Decimal::new(1000, 0));
        assert_eq!(ledger.balance(user), Decimal::new(1000, 0));
        assert_eq!(ledger.custody_balance(), Decimal::ZERO);
    }

    #[test]
    fn deposit_moves_into_custody() {
        let mut ledger = InMemoryLedger::new();
        let user = AccountId::new();
        ledger.fund(user, Decimal::new(1000, 0));
        ledger.deposit(user, Decimal::new(400, 0)).unwrap();
        assert_eq!(ledger.balance(user), Decimal::new(600, 0));
        assert_eq!(ledger.custody_balance(), Decimal::new(400, 0));
        assert_eq!(ledger.total_supply(), Decimal::new(1000, 0));
    }

    #[test]
    fn deposit_insufficient_fails() {
        let mut ledger = InMemoryLedger::new();
        let user = AccountId::new();
        ledger.fund(user, Decimal::new(100, 0));
        let err = ledger.deposit(user, Decimal::new(200, 0)).unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientFunds { .. }));
        // Balance unchanged
        assert_eq!(ledger.balance(user), Decimal::new(100, 0));
        assert_eq!(ledger.custody_balance(), Decimal::ZERO);
    }

    #[test]
    fn payout_moves_out_of_custody() {
        let mut ledger = InMemoryLedger::new();
        let user = AccountId::new();
        let other = AccountId::new();
        ledger.fund(user, Decimal::new(10, 0));
        ledger.deposit(user, Decimal::new(10, 0)).unwrap();
        ledger.payout(other, Decimal::new(4, 0)).unwrap();
        assert_eq!(ledger.balance(other), Decimal::new(4, 0));
        assert_eq!(ledger.custody_balance(), Decimal::new(6, 0));
    }

    #[test]
    fn payout_beyond_custody_fails() {
        let mut ledger = InMemoryLedger::new();
        let user = AccountId::new();
        let err = ledger.payout(user, Decimal::ONE).unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientCustody(_)));
        assert_eq!(ledger.balance(user), Decimal::ZERO);
    }

    #[test]
    fn nonexistent_balance_is_zero() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.balance(AccountId::new()).is_zero());
    }
}
