//! Configuration for an escrow instance.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, EscrowError, Result, constants};

/// Settings fixed when an escrow instance is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// The single identity allowed to withdraw the lost-stakes pool.
    pub custodian: AccountId,
    /// Maximum review comment length in bytes.
    #[serde(default = "default_max_comment_bytes")]
    pub max_comment_bytes: usize,
    /// Furthest a grant may expire from the moment it is created.
    #[serde(default = "default_max_grant_duration_secs")]
    pub max_grant_duration_secs: u64,
}

fn default_max_comment_bytes() -> usize {
    constants::DEFAULT_MAX_COMMENT_BYTES
}

fn default_max_grant_duration_secs() -> u64 {
    constants::DEFAULT_MAX_GRANT_DURATION_SECS
}

impl EscrowConfig {
    /// Default limits with the given custodian.
    #[must_use]
    pub fn new(custodian: AccountId) -> Self {
        Self {
            custodian,
            max_comment_bytes: constants::DEFAULT_MAX_COMMENT_BYTES,
            max_grant_duration_secs: constants::DEFAULT_MAX_GRANT_DURATION_SECS,
        }
    }

    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for bad values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `Configuration` if a limit is zero or the duration overflows.
    pub fn validate(&self) -> Result<()> {
        if self.max_comment_bytes == 0 {
            return Err(EscrowError::Configuration(
                "max_comment_bytes must be > 0".into(),
            ));
        }
        if self.max_grant_duration_secs == 0 {
            return Err(EscrowError::Configuration(
                "max_grant_duration_secs must be > 0".into(),
            ));
        }
        if i64::try_from(self.max_grant_duration_secs).is_err() {
            return Err(EscrowError::Configuration(
                "max_grant_duration_secs out of range".into(),
            ));
        }
        Ok(())
    }

    /// Latest expiration accepted for a grant created at `now`.
    #[must_use]
    pub fn latest_expiration(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::try_from(self.max_grant_duration_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Validate an expiration for a grant created at `now`.
    ///
    /// # Errors
    /// `InvalidExpiration` if it is not strictly after `now` or lies beyond
    /// the configured horizon.
    pub fn check_expiration(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        if expires_at <= now {
            return Err(EscrowError::InvalidExpiration {
                expires_at,
                reason: format!("must be after {now}"),
            });
        }
        let latest = self.latest_expiration(now);
        if expires_at > latest {
            return Err(EscrowError::InvalidExpiration {
                expires_at,
                reason: format!("must not be after {latest}"),
            });
        }
        Ok(())
    }

    /// # Errors
    /// `CommentTooLong` if the comment exceeds `max_comment_bytes`.
    pub fn check_comment(&self, comment: &str) -> Result<()> {
        if comment.len() > self.max_comment_bytes {
            return Err(EscrowError::CommentTooLong {
                len: comment.len(),
                limit: self.max_comment_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EscrowConfig::new(AccountId::new());
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_comment_bytes, 4096);
    }

    #[test]
    fn from_json_fills_defaults() {
        let custodian = AccountId::new();
        let json = format!(r#"{{"custodian":"{custodian}"}}"#);
        let cfg = EscrowConfig::from_json(&json).unwrap();
        assert_eq!(cfg, EscrowConfig::new(custodian));
    }

    #[test]
    fn from_json_rejects_zero_limits() {
        let json = format!(
            r#"{{"custodian":"{}","max_comment_bytes":0}}"#,
            AccountId::new()
        );
        let err = EscrowConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, EscrowError::Configuration(_)));
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = EscrowConfig::from_json("{").unwrap_err();
        assert!(matches!(err, EscrowError::Serialization(_)));
    }

    #[test]
    fn expiration_window() {
        let mut cfg = EscrowConfig::new(AccountId::new());
        cfg.max_grant_duration_secs = 60;
        let now = Utc::now();
        assert!(cfg.check_expiration(now, now).is_err());
        assert!(cfg.check_expiration(now - Duration::seconds(1), now).is_err());
        assert!(cfg.check_expiration(now + Duration::seconds(60), now).is_ok());
        let err = cfg
            .check_expiration(now + Duration::seconds(61), now)
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidExpiration { .. }));
    }

    #[test]
    fn comment_limit() {
        let mut cfg = EscrowConfig::new(AccountId::new());
        cfg.max_comment_bytes = 4;
        assert!(cfg.check_comment("four").is_ok());
        let err = cfg.check_comment("five!").unwrap_err();
        assert!(matches!(err, EscrowError::CommentTooLong { len: 5, limit: 4 }));
    }
}
