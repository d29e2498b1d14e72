//! Unsubscribe-token lifecycle.
//!
//! A token is issued with an expiry and no `used_at`. It becomes permanently
//! unusable once `used_at` is set, and implicitly unusable once the expiry
//! has passed. Expiry is never written back.

use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::entities::SubscriptionTokenRecord;

pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("unsubscribe token has expired")]
    Expired,
    #[error("unsubscribe token has already been used")]
    AlreadyUsed,
}

/// Two v4 UUIDs in simple form: 64 hex chars carrying 244 random bits.
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn token_expiry(issued_at: OffsetDateTime, ttl_days: u32) -> OffsetDateTime {
    issued_at + Duration::days(i64::from(ttl_days))
}

/// Expiry is checked before usage, so an expired token that was also used
/// reports `Expired`.
pub fn check_redeemable(
    token: &SubscriptionTokenRecord,
    now: OffsetDateTime,
) -> Result<(), TokenRejection> {
    if token.expires_at < now {
        return Err(TokenRejection::Expired);
    }
    if token.used_at.is_some() {
        return Err(TokenRejection::AlreadyUsed);
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    validator::validate_email(email)
}
