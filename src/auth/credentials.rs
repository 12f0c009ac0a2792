//! Admin credential lookup across the `admin` table and the legacy `users` table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::model::user::{normalize_email, Account, AccountSource, Admin, LegacyUser};

const ADMIN_COLUMNS: &str = "id, email, full_name, phone, role, password_hash, is_active, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, full_name, phone, password_hash, is_admin, created_at";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active row of the `admin` table with this email.
    async fn active_admin_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Row of the `users` table with this email and `is_admin = true`.
    async fn legacy_admin_by_email(&self, email: &str) -> AppResult<Option<Account>>;
}

/// Tries the admin table first, then legacy admins. Any miss is a generic 401.
pub async fn verify_credentials<S>(store: &S, email: &str, password: &str) -> AppResult<Account>
where
    S: CredentialStore + ?Sized,
{
    let email = normalize_email(email);

    if let Some(account) = store.active_admin_by_email(&email).await? {
        if verify_password(password, &account.password_hash) {
            return Ok(account);
        }
        tracing::debug!(%email, "Admin table password mismatch, trying legacy users");
    }

    if let Some(account) = store.legacy_admin_by_email(&email).await? {
        if verify_password(password, &account.password_hash) {
            return Ok(account);
        }
    }

    tracing::info!(%email, "Rejected admin login");
    Err(AppError::unauthenticated("Invalid email or password"))
}

#[async_trait]
impl CredentialStore for PgPool {
    async fn active_admin_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin WHERE lower(email) = $1 AND is_active = TRUE"
        ))
        .bind(email)
        .fetch_optional(self)
        .await?;

        Ok(admin.map(Account::from))
    }

    async fn legacy_admin_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let user = sqlx::query_as::<_, LegacyUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = $1 AND is_admin = TRUE"
        ))
        .bind(email)
        .fetch_optional(self)
        .await?;

        Ok(user.map(Account::from))
    }
}

/// Loads the account a token was issued for, if it may still sign in.
pub async fn load_account(pool: &PgPool, id: Uuid, source: AccountSource) -> AppResult<Option<Account>> {
    let account = match source {
        AccountSource::Admin => sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Account::from),
        AccountSource::Users => sqlx::query_as::<_, LegacyUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_admin = TRUE"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Account::from),
    };

    Ok(account)
}

/// Either table holds an admin with this email.
pub async fn find_any_admin(pool: &PgPool, email: &str) -> AppResult<Option<Account>> {
    if let Some(account) = pool.active_admin_by_email(email).await? {
        return Ok(Some(account));
    }
    pool.legacy_admin_by_email(email).await
}
