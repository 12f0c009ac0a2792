use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

/// Table an account was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSource {
    Admin,
    Users,
}

impl AccountSource {
    pub fn table(self) -> &'static str {
        match self {
            AccountSource::Admin => "admin",
            AccountSource::Users => "users",
        }
    }

    pub fn other(self) -> Self {
        match self {
            AccountSource::Admin => AccountSource::Users,
            AccountSource::Users => AccountSource::Admin,
        }
    }
}

/// Row of the `admin` table.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: AdminRole,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the legacy `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct LegacyUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin credentials and profile, whichever table they live in.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: AdminRole,
    pub password_hash: String,
    pub source: AccountSource,
    pub created_at: DateTime<Utc>,
}

impl From<Admin> for Account {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            full_name: admin.full_name,
            phone: admin.phone,
            role: admin.role,
            password_hash: admin.password_hash,
            source: AccountSource::Admin,
            created_at: admin.created_at,
        }
    }
}

impl From<LegacyUser> for Account {
    fn from(user: LegacyUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role: AdminRole::Admin,
            password_hash: user.password_hash,
            source: AccountSource::Users,
            created_at: user.created_at,
        }
    }
}

/// Profile returned to clients; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: AdminRole,
    pub source: AccountSource,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AdminProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            full_name: account.full_name,
            phone: account.phone,
            role: account.role,
            source: account.source,
            created_at: account.created_at,
        }
    }
}

/// Admin-table row as listed in the users screen of the admin panel.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: AdminRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Admin> for AdminSummary {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            full_name: admin.full_name,
            phone: admin.phone,
            role: admin.role,
            is_active: admin.is_active,
            created_at: admin.created_at,
            updated_at: admin.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: Option<AdminRole>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAdminRequest {
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

/// Emails are matched case-insensitively across both tables.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serialization_has_no_password_hash() {
        let account = Account {
            id: Uuid::new_v4(),
            email: "owner@resort.test".to_string(),
            full_name: "Owner".to_string(),
            phone: None,
            role: AdminRole::SuperAdmin,
            password_hash: "$2b$12$secret".to_string(),
            source: AccountSource::Admin,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(AdminProfile::from(account)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "super_admin");
        assert_eq!(json["source"], "admin");
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Owner@Resort.TEST "), "owner@resort.test");
    }
}
