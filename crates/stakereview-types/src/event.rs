//! Events returned by successful escrow calls.
//!
//! Every successful operation returns the events it emitted, in order.
//! Failed calls emit nothing. Joint review content only ever appears in
//! [`EscrowEvent::JointReviewsRevealed`], after both slots are filled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, JointGrantId, Outcome, Review};

/// The kind of an [`EscrowEvent`], for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    GrantCreated,
    ReviewCreated,
    GrantClosed,
    StakeForfeited,
    StakeReclaimed,
    JointGrantAttempted,
    JointGrantCreated,
    JointGrantCanceled,
    JointReviewSubmitted,
    JointReviewsRevealed,
    JointGrantResolved,
    LostStakesWithdrawn,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::GrantCreated => "GRANT_CREATED",
            Self::ReviewCreated => "REVIEW_CREATED",
            Self::GrantClosed => "GRANT_CLOSED",
            Self::StakeForfeited => "STAKE_FORFEITED",
            Self::StakeReclaimed => "STAKE_RECLAIMED",
            Self::JointGrantAttempted => "JOINT_GRANT_ATTEMPTED",
            Self::JointGrantCreated => "JOINT_GRANT_CREATED",
            Self::JointGrantCanceled => "JOINT_GRANT_CANCELED",
            Self::JointReviewSubmitted => "JOINT_REVIEW_SUBMITTED",
            Self::JointReviewsRevealed => "JOINT_REVIEWS_REVEALED",
            Self::JointGrantResolved => "JOINT_GRANT_RESOLVED",
            Self::LostStakesWithdrawn => "LOST_STAKES_WITHDRAWN",
        };
        f.write_str(name)
    }
}

/// Structured result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EscrowEvent {
    GrantCreated {
        staker: AccountId,
        counterparty: AccountId,
        expires_at: DateTime<Utc>,
        amount: Decimal,
    },
    ReviewCreated {
        staker: AccountId,
        reviewer: AccountId,
        negative: bool,
        comment: String,
    },
    GrantClosed {
        staker: AccountId,
        counterparty: AccountId,
    },
    /// A stake moved into the lost-stakes pool.
    StakeForfeited {
        owner: AccountId,
        counterparty: AccountId,
        amount: Decimal,
    },
    StakeReclaimed {
        staker: AccountId,
        counterparty: AccountId,
        amount: Decimal,
    },
    JointGrantAttempted {
        initiator: AccountId,
        partner: AccountId,
        expires_at: DateTime<Utc>,
        amount: Decimal,
    },
    /// The caller's attempt matched a reciprocal one. `amount` is the
    /// initiator's leg, deposited by this call; `partner_amount` is the
    /// partner's leg, already in custody since their attempt.
    JointGrantCreated {
        id: JointGrantId,
        initiator: AccountId,
        partner: AccountId,
        expires_at: DateTime<Utc>,
        amount: Decimal,
        partner_amount: Decimal,
    },
    JointGrantCanceled {
        initiator: AccountId,
        partner: AccountId,
        amount: Decimal,
    },
    /// First review of a joint grant: content stays sealed, only the
    /// reviewer's own commitment digest is returned.
    JointReviewSubmitted {
        id: JointGrantId,
        reviewer: AccountId,
        reviewee: AccountId,
        commitment: String,
    },
    JointReviewsRevealed {
        id: JointGrantId,
        reviews: [Review; 2],
    },
    JointGrantResolved {
        id: JointGrantId,
        outcome: Outcome,
    },
    LostStakesWithdrawn {
        custodian: AccountId,
        amount: Decimal,
    },
}

impl EscrowEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GrantCreated { .. } => EventKind::GrantCreated,
            Self::ReviewCreated { .. } => EventKind::ReviewCreated,
            Self::GrantClosed { .. } => EventKind::GrantClosed,
            Self::StakeForfeited { .. } => EventKind::StakeForfeited,
            Self::StakeReclaimed { .. } => EventKind::StakeReclaimed,
            Self::JointGrantAttempted { .. } => EventKind::JointGrantAttempted,
            Self::JointGrantCreated { .. } => EventKind::JointGrantCreated,
            Self::JointGrantCanceled { .. } => EventKind::JointGrantCanceled,
            Self::JointReviewSubmitted { .. } => EventKind::JointReviewSubmitted,
            Self::JointReviewsRevealed { .. } => EventKind::JointReviewsRevealed,
            Self::JointGrantResolved { .. } => EventKind::JointGrantResolved,
            Self::LostStakesWithdrawn { .. } => EventKind::LostStakesWithdrawn,
        }
    }
}

impl std::fmt::Display for EscrowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Kinds of a sequence of events, in order. Handy for assertions and logs.
#[must_use]
pub fn kinds(events: &[EscrowEvent]) -> Vec<EventKind> {
    events.iter().map(EscrowEvent::kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_display() {
        assert_eq!(format!("{}", EventKind::GrantCreated), "GRANT_CREATED");
        assert_eq!(
            format!("{}", EventKind::LostStakesWithdrawn),
            "LOST_STAKES_WITHDRAWN"
        );
    }

    #[test]
    fn event_display_uses_kind() {
        let event = EscrowEvent::GrantClosed {
            staker: AccountId::new(),
            counterparty: AccountId::new(),
        };
        assert_eq!(event.to_string(), "GRANT_CLOSED");
        assert_eq!(kinds(&[event]), vec![EventKind::GrantClosed]);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = EscrowEvent::LostStakesWithdrawn {
            custodian: AccountId::new(),
            amount: Decimal::new(3, 0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "LostStakesWithdrawn");
        let back: EscrowEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event, back);
    }
}
