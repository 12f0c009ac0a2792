use axum::{
    extract::{Extension, Json},
    http::HeaderMap,
    response::Json as RespJson,
    routing::post,
    Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::PgConnection;
use validator::Validate;

use crate::auth::{
    credentials::{find_any_admin, load_account, verify_credentials},
    extract::authenticate,
    password::{ensure_strong_enough, generate_reset_token, hash_password, verify_password},
    token::issue_token,
};
use crate::error::{AppError, AppResult};
use crate::model::settings::{reset_key, PendingReset, ResetRejection};
use crate::model::user::{normalize_email, Account, AccountSource, AdminProfile};
use crate::state::AppState;

// Payload untuk login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

/// Body of `POST /api/auth`, dispatched on its `action` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthAction {
    Login(LoginRequest),
    Me,
    UpdateProfile(ProfileUpdate),
    ChangePassword(ChangePasswordRequest),
    ForgotPassword(ForgotPasswordRequest),
    ResetPassword(ResetPasswordRequest),
}

const RESET_REQUESTED: &str = "If an admin account exists for this email, a reset link has been sent";
const INVALID_RESET: &str = "Invalid or expired reset token";
const EMAIL_TAKEN: &str = "Another account already uses this email";

pub fn auth_router() -> Router {
    Router::new().route("/api/auth", post(auth))
}

async fn auth(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(action): Json<AuthAction>,
) -> AppResult<RespJson<serde_json::Value>> {
    match action {
        AuthAction::Login(req) => login(&state, req).await,
        AuthAction::Me => {
            let account = authenticate(&state, &headers).await?;
            Ok(RespJson(serde_json::json!({ "user": AdminProfile::from(account) })))
        }
        AuthAction::UpdateProfile(req) => update_profile(&state, authenticate(&state, &headers).await?, req).await,
        AuthAction::ChangePassword(req) => change_password(&state, authenticate(&state, &headers).await?, req).await,
        AuthAction::ForgotPassword(req) => forgot_password(&state, req).await,
        AuthAction::ResetPassword(req) => reset_password(&state, req).await,
    }
}

async fn login(state: &AppState, req: LoginRequest) -> AppResult<RespJson<serde_json::Value>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let account = verify_credentials(&state.pool, &req.email, &req.password).await?;
    let auth = &state.config.auth;
    let token = issue_token(&account, &auth.jwt_secret, auth.jwt_ttl_hours)?;

    tracing::info!(admin_id = %account.id, source = account.source.table(), "Admin signed in");

    Ok(RespJson(serde_json::json!({
        "token": token,
        "expires_in": auth.jwt_ttl_hours * 3600,
        "user": AdminProfile::from(account),
    })))
}

fn touch_clause(source: AccountSource) -> &'static str {
    match source {
        AccountSource::Admin => ", updated_at = NOW()",
        AccountSource::Users => "",
    }
}

/// Any row in either table already holding this email.
async fn email_in_use(conn: &mut PgConnection, email: &str) -> AppResult<bool> {
    let (taken,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM admin WHERE lower(email) = $1)
             OR EXISTS (SELECT 1 FROM users WHERE lower(email) = $1)",
    )
    .bind(email)
    .fetch_one(&mut *conn)
    .await?;
    Ok(taken)
}

// Update profil di tabel sendiri lalu salin ke tabel lain dengan email yang sama
async fn update_profile(state: &AppState, account: Account, req: ProfileUpdate) -> AppResult<RespJson<serde_json::Value>> {
    req.validate()?;

    let old_email = normalize_email(&account.email);
    let new_email = req.email.as_deref().map(normalize_email).unwrap_or_else(|| old_email.clone());

    let own_sql = format!(
        "UPDATE {} SET full_name = COALESCE($2, full_name), email = $3, phone = COALESCE($4, phone){} WHERE id = $1",
        account.source.table(),
        touch_clause(account.source)
    );
    let mirror = account.source.other();
    let mirror_sql = format!(
        "UPDATE {} SET full_name = COALESCE($2, full_name), email = $3, phone = COALESCE($4, phone){} WHERE lower(email) = $1",
        mirror.table(),
        touch_clause(mirror)
    );

    let mut tx = state.pool.begin().await?;

    // Own row and mirror both carry the old email, so any holder of the new one is someone else
    if new_email != old_email && email_in_use(&mut tx, &new_email).await? {
        tracing::info!(admin_id = %account.id, "Profile email change rejected, address taken");
        return Err(AppError::conflict(EMAIL_TAKEN));
    }

    sqlx::query(&own_sql)
        .bind(account.id)
        .bind(&req.full_name)
        .bind(&new_email)
        .bind(&req.phone)
        .execute(&mut *tx)
        .await
        .map_err(email_conflict)?;

    let mirrored = sqlx::query(&mirror_sql)
        .bind(&old_email)
        .bind(&req.full_name)
        .bind(&new_email)
        .bind(&req.phone)
        .execute(&mut *tx)
        .await
        .map_err(email_conflict)?
        .rows_affected();

    tx.commit().await?;

    tracing::info!(admin_id = %account.id, mirrored, "Profile updated");

    let updated = load_account(&state.pool, account.id, account.source)
        .await?
        .ok_or_else(|| AppError::not_found("Account", account.id))?;
    let auth = &state.config.auth;
    let token = issue_token(&updated, &auth.jwt_secret, auth.jwt_ttl_hours)?;

    Ok(RespJson(serde_json::json!({
        "token": token,
        "user": AdminProfile::from(updated),
    })))
}

fn email_conflict(e: sqlx::Error) -> AppError {
    let err = AppError::Database(e);
    if err.status_code() == axum::http::StatusCode::CONFLICT {
        AppError::conflict(EMAIL_TAKEN)
    } else {
        err
    }
}

/// Writes the hash to every table holding the email. Returns the number of rows touched.
async fn set_password_everywhere(conn: &mut PgConnection, email: &str, password_hash: &str) -> AppResult<u64> {
    let admins = sqlx::query("UPDATE admin SET password_hash = $2, updated_at = NOW() WHERE lower(email) = $1")
        .bind(email)
        .bind(password_hash)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let users = sqlx::query("UPDATE users SET password_hash = $2 WHERE lower(email) = $1")
        .bind(email)
        .bind(password_hash)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(admins + users)
}

async fn change_password(
    state: &AppState,
    account: Account,
    req: ChangePasswordRequest,
) -> AppResult<RespJson<serde_json::Value>> {
    if !verify_password(&req.current_password, &account.password_hash) {
        return Err(AppError::bad_request("Current password is incorrect"));
    }
    ensure_strong_enough(&req.new_password)?;

    let hash = hash_password(&req.new_password)?;
    let mut tx = state.pool.begin().await?;
    let updated = set_password_everywhere(&mut tx, &normalize_email(&account.email), &hash).await?;
    tx.commit().await?;

    tracing::info!(admin_id = %account.id, rows = updated, "Password changed");
    Ok(RespJson(serde_json::json!({
        "success": true,
        "message": "Password updated successfully"
    })))
}

async fn forgot_password(state: &AppState, req: ForgotPasswordRequest) -> AppResult<RespJson<serde_json::Value>> {
    let email = normalize_email(&req.email);
    let response = RespJson(serde_json::json!({ "success": true, "message": RESET_REQUESTED }));

    // Same answer whether or not the account exists
    let Some(account) = find_any_admin(&state.pool, &email).await? else {
        tracing::info!(%email, "Password reset requested for unknown email");
        return Ok(response);
    };

    let token = generate_reset_token();
    let pending = PendingReset::issue(
        &token,
        Utc::now(),
        Duration::minutes(state.config.auth.reset_token_ttl_minutes),
    );
    let value = serde_json::to_value(&pending).map_err(|e| AppError::Internal {
        operation: format!("encode reset token: {e}"),
    })?;

    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW())
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
    )
    .bind(reset_key(&email))
    .bind(value)
    .execute(&state.pool)
    .await?;

    if let Err(e) = state
        .mailer
        .send_password_reset(&account.email, Some(&account.full_name), &token)
        .await
    {
        tracing::warn!(%email, "Failed to send password reset email: {e}");
    }

    Ok(response)
}

// Token dihapus di transaksi yang sama dengan penulisan hash
async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> AppResult<RespJson<serde_json::Value>> {
    ensure_strong_enough(&req.new_password)?;
    let email = normalize_email(&req.email);

    let mut tx = state.pool.begin().await?;

    // Row lock makes a concurrent reset with the same token wait, then find nothing
    let stored: Option<(serde_json::Value,)> = sqlx::query_as("DELETE FROM settings WHERE key = $1 RETURNING value")
        .bind(reset_key(&email))
        .fetch_optional(&mut *tx)
        .await?;

    let Some(pending) = stored.and_then(|(value,)| serde_json::from_value::<PendingReset>(value).ok()) else {
        // Drops an unreadable row if there was one
        tx.commit().await?;
        return Err(AppError::bad_request(INVALID_RESET));
    };

    match pending.check(&req.token, Utc::now()) {
        Ok(()) => {}
        Err(ResetRejection::Expired) => {
            tx.commit().await?;
            return Err(AppError::bad_request(INVALID_RESET));
        }
        Err(ResetRejection::WrongToken) => {
            // Rolled back on drop, the real token stays usable
            tracing::info!(%email, "Password reset with wrong token");
            return Err(AppError::bad_request(INVALID_RESET));
        }
    }

    let hash = hash_password(&req.new_password)?;
    let updated = set_password_everywhere(&mut tx, &email, &hash).await?;
    if updated == 0 {
        tx.commit().await?;
        return Err(AppError::bad_request(INVALID_RESET));
    }

    tx.commit().await?;

    tracing::info!(%email, rows = updated, "Password reset completed");
    Ok(RespJson(serde_json::json!({
        "success": true,
        "message": "Password has been reset"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::AdminRole;
    use crate::test_utils::{login, seed_admin, seed_legacy_admin, test_config, test_server, test_server_with_pool};
    use axum::http::StatusCode;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[test]
    fn actions_are_dispatched_by_tag() {
        let action: AuthAction = serde_json::from_value(serde_json::json!({
            "action": "reset_password",
            "email": "desk@resort.test",
            "token": "abc",
            "new_password": "long-enough"
        }))
        .unwrap();
        assert!(matches!(action, AuthAction::ResetPassword(ref r) if r.token == "abc"));

        let action: AuthAction = serde_json::from_value(serde_json::json!({ "action": "me" })).unwrap();
        assert!(matches!(action, AuthAction::Me));

        assert!(serde_json::from_value::<AuthAction>(serde_json::json!({ "action": "register" })).is_err());
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let server = test_server();
        let response = server
            .post("/api/auth")
            .json(&serde_json::json!({ "action": "delete_everything" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let server = test_server();
        let response = server
            .post("/api/auth")
            .json(&serde_json::json!({ "action": "login", "email": "", "password": "" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Email and password are required");
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let server = test_server();
        let response = server.post("/api/auth").json(&serde_json::json!({ "action": "me" })).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_with_forged_token_is_unauthorized() {
        let server = test_server();
        let response = server
            .post("/api/auth")
            .authorization_bearer("not-a-jwt")
            .json(&serde_json::json!({
                "action": "change_password",
                "current_password": "old-password",
                "new_password": "new-password"
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reset_rejects_short_password_before_lookup() {
        let server = test_server();
        let response = server
            .post("/api/auth")
            .json(&serde_json::json!({
                "action": "reset_password",
                "email": "desk@resort.test",
                "token": "whatever",
                "new_password": "short"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn me_reports_database_outage_as_server_error() {
        let config = test_config();
        let account = Account {
            id: Uuid::new_v4(),
            email: "desk@resort.test".to_string(),
            full_name: "Front Desk".to_string(),
            phone: None,
            role: AdminRole::Admin,
            password_hash: String::new(),
            source: AccountSource::Admin,
            created_at: Utc::now(),
        };
        let token = issue_token(&account, &config.auth.jwt_secret, 1).unwrap();

        // The test pool points at a closed port
        let server = test_server();
        let response = server
            .post("/api/auth")
            .authorization_bearer(&token)
            .json(&serde_json::json!({ "action": "me" }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn login_ignores_stale_bearer_header() {
        let server = test_server();
        let response = server
            .post("/api/auth")
            .authorization_bearer("expired-or-forged")
            .json(&serde_json::json!({ "action": "login", "email": "", "password": "" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    async fn stored_hash(pool: &PgPool, table: &str, email: &str) -> String {
        let (hash,): (String,) = sqlx::query_as(&format!("SELECT password_hash FROM {table} WHERE lower(email) = $1"))
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap();
        hash
    }

    async fn store_reset(pool: &PgPool, email: &str, pending: &PendingReset) {
        sqlx::query("INSERT INTO settings (key, value) VALUES ($1, $2)")
            .bind(reset_key(email))
            .bind(serde_json::to_value(pending).unwrap())
            .execute(pool)
            .await
            .unwrap();
    }

    async fn reset_pending(pool: &PgPool, email: &str) -> bool {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM settings WHERE key = $1)")
            .bind(reset_key(email))
            .fetch_one(pool)
            .await
            .unwrap();
        exists
    }

    #[sqlx::test]
    async fn legacy_admin_cannot_claim_another_admins_email(pool: PgPool) {
        seed_admin(&pool, "owner@resort.test", "owner-password", AdminRole::SuperAdmin).await;
        seed_legacy_admin(&pool, "desk@resort.test", "desk-password").await;
        let server = test_server_with_pool(pool.clone());
        let token = login(&server, "desk@resort.test", "desk-password").await;

        let response = server
            .post("/api/auth")
            .authorization_bearer(&token)
            .json(&serde_json::json!({ "action": "update_profile", "email": "Owner@Resort.test" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        // Nothing was written, so a password change stays on the caller's row
        let response = server
            .post("/api/auth")
            .authorization_bearer(&token)
            .json(&serde_json::json!({
                "action": "change_password",
                "current_password": "desk-password",
                "new_password": "hijacked-pass"
            }))
            .await;
        response.assert_status_ok();

        assert!(verify_password("owner-password", &stored_hash(&pool, "admin", "owner@resort.test").await));
        login(&server, "owner@resort.test", "owner-password").await;
        server
            .post("/api/auth")
            .json(&serde_json::json!({ "action": "login", "email": "owner@resort.test", "password": "hijacked-pass" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn profile_and_password_changes_reach_the_mirror_row(pool: PgPool) {
        seed_admin(&pool, "manager@resort.test", "manager-password", AdminRole::Admin).await;
        seed_legacy_admin(&pool, "manager@resort.test", "manager-password").await;
        let server = test_server_with_pool(pool.clone());
        let token = login(&server, "manager@resort.test", "manager-password").await;

        let response = server
            .post("/api/auth")
            .authorization_bearer(&token)
            .json(&serde_json::json!({
                "action": "update_profile",
                "full_name": "Maya Pillai",
                "email": "Maya@Resort.test"
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["user"]["email"], "maya@resort.test");
        let token = body["token"].as_str().unwrap().to_string();

        let (email, name): (String, String) = sqlx::query_as("SELECT email, full_name FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(email, "maya@resort.test");
        assert_eq!(name, "Maya Pillai");

        let response = server
            .post("/api/auth")
            .authorization_bearer(&token)
            .json(&serde_json::json!({
                "action": "change_password",
                "current_password": "manager-password",
                "new_password": "harbour-lights-9"
            }))
            .await;
        response.assert_status_ok();

        assert!(verify_password("harbour-lights-9", &stored_hash(&pool, "admin", "maya@resort.test").await));
        assert!(verify_password("harbour-lights-9", &stored_hash(&pool, "users", "maya@resort.test").await));
    }

    #[sqlx::test]
    async fn reset_token_is_checked_then_consumed(pool: PgPool) {
        seed_admin(&pool, "owner@resort.test", "owner-password", AdminRole::SuperAdmin).await;
        seed_legacy_admin(&pool, "owner@resort.test", "owner-password").await;
        store_reset(&pool, "owner@resort.test", &PendingReset::issue("emailed-token", Utc::now(), Duration::minutes(30)))
            .await;
        let server = test_server_with_pool(pool.clone());
        let reset = |token: &str| {
            serde_json::json!({
                "action": "reset_password",
                "email": "owner@resort.test",
                "token": token,
                "new_password": "fresh-start-77"
            })
        };

        let response = server.post("/api/auth").json(&reset("guessed-token")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(reset_pending(&pool, "owner@resort.test").await);

        server.post("/api/auth").json(&reset("emailed-token")).await.assert_status_ok();
        assert!(!reset_pending(&pool, "owner@resort.test").await);
        assert!(verify_password("fresh-start-77", &stored_hash(&pool, "admin", "owner@resort.test").await));
        assert!(verify_password("fresh-start-77", &stored_hash(&pool, "users", "owner@resort.test").await));

        // Second use of the same link
        let response = server.post("/api/auth").json(&reset("emailed-token")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], INVALID_RESET);
    }

    #[sqlx::test]
    async fn expired_reset_token_is_rejected_and_dropped(pool: PgPool) {
        seed_admin(&pool, "owner@resort.test", "owner-password", AdminRole::SuperAdmin).await;
        let issued = Utc::now() - Duration::hours(2);
        store_reset(&pool, "owner@resort.test", &PendingReset::issue("emailed-token", issued, Duration::minutes(30)))
            .await;
        let server = test_server_with_pool(pool.clone());

        let response = server
            .post("/api/auth")
            .json(&serde_json::json!({
                "action": "reset_password",
                "email": "owner@resort.test",
                "token": "emailed-token",
                "new_password": "fresh-start-77"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(!reset_pending(&pool, "owner@resort.test").await);
        assert!(verify_password("owner-password", &stored_hash(&pool, "admin", "owner@resort.test").await));
    }
}
