//! Bearer tokens for the admin panel (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::model::user::{Account, AccountSource, AdminRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: AdminRole,
    /// Table the account lives in
    pub source: AccountSource,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(account: &Account, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account.id,
        email: account.email.clone(),
        role: account.role,
        source: account.source,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| AppError::Internal {
        operation: format!("sign token: {e}"),
    })
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Rejected bearer token: {e}");
            AppError::unauthenticated("Invalid or expired token")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "manager@resort.test".to_string(),
            full_name: "Manager".to_string(),
            phone: None,
            role: AdminRole::Admin,
            password_hash: String::new(),
            source: AccountSource::Users,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_carries_account_and_table() {
        let account = account();
        let token = issue_token(&account, "secret", 1).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.source, AccountSource::Users);
        assert_eq!(claims.email, "manager@resort.test");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&account(), "secret", 1).unwrap();
        let err = verify_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(&account(), "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
