//! Magic-link models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a magic link stays valid after issuance.
pub const MAGIC_LINK_TTL_HOURS: i64 = 24;

/// A one-time, time-limited sign-in token delivered by email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MagicLink {
    /// UUID, generated at creation
    pub id: String,
    /// Opaque token embedded in the emailed URL (unique)
    pub token: String,
    /// Patient the link signs in
    pub patient_id: String,
    /// Expiry timestamp (RFC 3339)
    pub expires_at: String,
    /// Whether the link has been redeemed
    pub used: bool,
    /// When it was redeemed
    pub used_at: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl MagicLink {
    /// Issue a new link for a patient, valid for [`MAGIC_LINK_TTL_HOURS`].
    pub fn new(patient_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token: uuid::Uuid::new_v4().simple().to_string(),
            patient_id,
            expires_at: (now + Duration::hours(MAGIC_LINK_TTL_HOURS)).to_rfc3339(),
            used: false,
            used_at: None,
            created_at: now.to_rfc3339(),
        }
    }

    /// Whether the link has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires) => now >= expires,
            // Unparseable expiry reads as expired, failing closed.
            Err(_) => true,
        }
    }

    /// A link is redeemable only if it is unused and unexpired.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_link_is_redeemable() {
        let link = MagicLink::new("patient-1".into());
        assert!(link.is_redeemable(Utc::now()));
        assert_eq!(link.token.len(), 32); // simple UUID format
    }

    #[test]
    fn test_expired_link() {
        let link = MagicLink::new("patient-1".into());
        let later = Utc::now() + Duration::hours(MAGIC_LINK_TTL_HOURS + 1);
        assert!(link.is_expired(later));
        assert!(!link.is_redeemable(later));
    }

    #[test]
    fn test_used_link_is_not_redeemable() {
        let mut link = MagicLink::new("patient-1".into());
        link.used = true;
        assert!(!link.is_redeemable(Utc::now()));
    }

    #[test]
    fn test_garbage_expiry_fails_closed() {
        let mut link = MagicLink::new("patient-1".into());
        link.expires_at = "not-a-timestamp".into();
        assert!(link.is_expired(Utc::now()));
    }
}
