//! Identifiers and record keys used throughout stakereview.
//!
//! Account and grant IDs use UUIDv7 for time-ordered sorting. Record keys
//! come in two flavors: ordered ([`GrantKey`], [`AttemptKey`]) where the
//! direction matters, and unordered ([`PairKey`]) for two-sided grants.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Identity of a participant: staker, counterparty, or the custodian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// JointGrantId
// ---------------------------------------------------------------------------

/// Minted when two reciprocal attempts are matched into a joint grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct JointGrantId(pub Uuid);

impl JointGrantId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JointGrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JointGrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jg:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// GrantKey / AttemptKey
// ---------------------------------------------------------------------------

/// Key of a single-sided grant: `staker` locks value against a review
/// from `counterparty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GrantKey {
    pub staker: AccountId,
    pub counterparty: AccountId,
}

impl GrantKey {
    #[must_use]
    pub fn new(staker: AccountId, counterparty: AccountId) -> Self {
        Self {
            staker,
            counterparty,
        }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.staker, self.counterparty)
    }
}

/// Key of a pending one-sided joint attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AttemptKey {
    pub initiator: AccountId,
    pub partner: AccountId,
}

impl AttemptKey {
    #[must_use]
    pub fn new(initiator: AccountId, partner: AccountId) -> Self {
        Self { initiator, partner }
    }

    /// The key the partner would use to attempt back at the initiator.
    #[must_use]
    pub fn reciprocal(&self) -> Self {
        Self {
            initiator: self.partner,
            partner: self.initiator,
        }
    }

    /// Unordered pair this attempt would form a joint grant under.
    #[must_use]
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.initiator, self.partner)
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~>{}", self.initiator, self.partner)
    }
}

// ---------------------------------------------------------------------------
// PairKey
// ---------------------------------------------------------------------------

/// Unordered pair of accounts. `PairKey::new(a, b) == PairKey::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PairKey {
    low: AccountId,
    high: AccountId,
}

impl PairKey {
    #[must_use]
    pub fn new(a: AccountId, b: AccountId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    #[must_use]
    pub fn contains(&self, account: AccountId) -> bool {
        self.low == account || self.high == account
    }

    /// The other member of the pair, or `None` if `account` is not a member.
    #[must_use]
    pub fn other(&self, account: AccountId) -> Option<AccountId> {
        if account == self.low {
            Some(self.high)
        } else if account == self.high {
            Some(self.low)
        } else {
            None
        }
    }

    #[must_use]
    pub fn members(&self) -> (AccountId, AccountId) {
        (self.low, self.high)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.low, self.high)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_uniqueness_and_ordering() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn pair_key_is_unordered() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
    }

    #[test]
    fn pair_key_other_member() {
        let a = AccountId::new();
        let b = AccountId::new();
        let stranger = AccountId::new();
        let pair = PairKey::new(b, a);
        assert_eq!(pair.other(a), Some(b));
        assert_eq!(pair.other(b), Some(a));
        assert_eq!(pair.other(stranger), None);
        assert!(!pair.contains(stranger));
    }

    #[test]
    fn attempt_key_reciprocal_shares_pair() {
        let key = AttemptKey::new(AccountId::new(), AccountId::new());
        let back = key.reciprocal();
        assert_eq!(back.initiator, key.partner);
        assert_eq!(back.reciprocal(), key);
        assert_eq!(key.pair(), back.pair());
    }

    #[test]
    fn grant_key_is_directional() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_ne!(GrantKey::new(a, b), GrantKey::new(b, a));
    }

    #[test]
    fn serde_roundtrips() {
        let id = AccountId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let pair = PairKey::new(AccountId::new(), AccountId::new());
        let json = serde_json::to_string(&pair).unwrap();
        let back: PairKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pair, back);
    }
}
