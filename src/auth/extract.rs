use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::auth::{credentials::load_account, token::verify_token};
use crate::error::AppError;
use crate::model::user::{Account, AdminRole};
use crate::state::AppState;

/// Signed-in admin, from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Account);

impl AdminUser {
    pub fn require_super_admin(&self) -> Result<(), AppError> {
        if self.0.role == AdminRole::SuperAdmin {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: "Only super admins can manage admin accounts".to_string(),
            })
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer token to a live account. Database failures stay 500s.
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Account, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthenticated { message: None })?;
    let claims = verify_token(token, &state.config.auth.jwt_secret)?;

    // Deactivated or demoted accounts lose access before their token expires
    load_account(&state.pool, claims.sub, claims.source)
        .await?
        .ok_or_else(|| AppError::unauthenticated("Account is no longer active"))
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or_else(|| AppError::Internal {
                operation: "find application state".to_string(),
            })?;

        authenticate(&state, &parts.headers).await.map(AdminUser)
    }
}
