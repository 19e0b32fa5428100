//! Reviews: the sentiment that decides where a stake goes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::AccountId;

/// A single review. Immutable once written; the comment is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Who wrote the review.
    pub reviewer: AccountId,
    /// Who the review is about (the staker, or the other leg owner).
    pub reviewee: AccountId,
    /// `true` if the reviewer reports a negative experience.
    pub negative: bool,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

impl Review {
    #[must_use]
    pub fn new(
        reviewer: AccountId,
        reviewee: AccountId,
        negative: bool,
        comment: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reviewer,
            reviewee,
            negative,
            comment: comment.into(),
            submitted_at,
        }
    }

    /// SHA-256 digest binding the review content to its authors.
    ///
    /// Format: `"stakereview:review:v1:" || reviewer || reviewee || negative || len(comment) || comment`
    ///
    /// Handed back to the reviewer of a joint grant in place of the content.
    /// Anyone holding the revealed review can recompute it; it does not hide
    /// a low-entropy verdict from a determined guesser.
    #[must_use]
    pub fn commitment(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"stakereview:review:v1:");
        hasher.update(self.reviewer.as_bytes());
        hasher.update(self.reviewee.as_bytes());
        hasher.update([u8::from(self.negative)]);
        hasher.update((self.comment.len() as u64).to_le_bytes());
        hasher.update(self.comment.as_bytes());
        hasher.finalize().into()
    }

    /// Hex form of [`Review::commitment`].
    #[must_use]
    pub fn commitment_hex(&self) -> String {
        hex::encode(self.commitment())
    }
}
