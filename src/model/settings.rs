use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::password::token_digest;

/// Settings rows under this prefix hold pending password resets and are never exposed.
pub const RESET_KEY_PREFIX: &str = "password_reset:";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PutSettingRequest {
    pub value: serde_json::Value,
}

/// Value stored for a pending password reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReset {
    /// SHA-256 of the emailed token, hex encoded
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a stored reset did not accept a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRejection {
    Expired,
    WrongToken,
}

impl PendingReset {
    pub fn issue(token: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token_digest: token_digest(token),
            expires_at: now + ttl,
        }
    }

    pub fn check(&self, token: &str, now: DateTime<Utc>) -> Result<(), ResetRejection> {
        if self.expires_at < now {
            return Err(ResetRejection::Expired);
        }
        if token_digest(token.trim()) != self.token_digest {
            return Err(ResetRejection::WrongToken);
        }
        Ok(())
    }
}

pub fn reset_key(email: &str) -> String {
    format!("{RESET_KEY_PREFIX}{email}")
}

pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESET_KEY_PREFIX)
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub rooms: i64,
    pub active_rooms: i64,
    pub bookings_pending: i64,
    pub bookings_confirmed: i64,
    pub bookings_cancelled: i64,
    pub upcoming_check_ins: i64,
    pub unread_messages: i64,
    pub pending_testimonials: i64,
    pub paid_revenue: i64,
}
