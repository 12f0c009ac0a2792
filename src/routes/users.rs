use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::Json as RespJson,
    routing::{get, put},
    Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{password::hash_password, AdminUser};
use crate::error::{AppError, AppResult};
use crate::model::user::{normalize_email, Admin, AdminRole, AdminSummary, CreateAdminRequest, UpdateAdminRequest};
use crate::state::AppState;

const ADMIN_COLUMNS: &str = "id, email, full_name, phone, role, password_hash, is_active, created_at, updated_at";

// Router admin users, di-nest ke /api/admin/users
pub fn users_router() -> Router {
    tracing::debug!("Registering admin user routes");
    Router::new()
        .route("/", get(list_admins).post(create_admin))
        .route("/:id", put(update_admin).delete(delete_admin))
}

async fn list_admins(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
) -> AppResult<RespJson<Vec<AdminSummary>>> {
    admin.require_super_admin()?;

    let admins = sqlx::query_as::<_, Admin>(&format!("SELECT {ADMIN_COLUMNS} FROM admin ORDER BY created_at ASC"))
        .fetch_all(&state.pool)
        .await?;

    Ok(RespJson(admins.into_iter().map(AdminSummary::from).collect()))
}

async fn create_admin(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Json(req): Json<CreateAdminRequest>,
) -> AppResult<(StatusCode, RespJson<AdminSummary>)> {
    admin.require_super_admin()?;
    req.validate()?;

    let email = normalize_email(&req.email);
    let password_hash = hash_password(&req.password)?;

    let mut tx = state.pool.begin().await?;

    let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM admin WHERE lower(email) = $1")
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await?;
    if taken.is_some() {
        return Err(AppError::conflict("An admin with this email already exists"));
    }

    let created = sqlx::query_as::<_, Admin>(&format!(
        "INSERT INTO admin (id, email, full_name, phone, role, password_hash, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, TRUE)
         RETURNING {ADMIN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(req.full_name.trim())
    .bind(&req.phone)
    .bind(req.role.unwrap_or(AdminRole::Admin))
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await?;

    // A legacy row for the same person keeps working with the new password
    sqlx::query("UPDATE users SET password_hash = $2 WHERE lower(email) = $1 AND is_admin = TRUE")
        .bind(&email)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(created_by = %admin.0.id, admin_id = %created.id, "Admin account created");
    Ok((StatusCode::CREATED, RespJson(AdminSummary::from(created))))
}

async fn update_admin(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAdminRequest>,
) -> AppResult<RespJson<AdminSummary>> {
    admin.require_super_admin()?;
    req.validate()?;

    if id == admin.0.id && req.is_active == Some(false) {
        return Err(AppError::bad_request("You cannot deactivate your own account"));
    }

    let password_hash = req.password.as_deref().map(hash_password).transpose()?;

    // Build SET dinamis dari field yang dikirim
    let mut sets = Vec::new();
    let mut param_count = 2;
    for (column, present) in [
        ("full_name", req.full_name.is_some()),
        ("phone", req.phone.is_some()),
        ("role", req.role.is_some()),
        ("is_active", req.is_active.is_some()),
        ("password_hash", password_hash.is_some()),
    ] {
        if present {
            sets.push(format!("{column} = ${param_count}"));
            param_count += 1;
        }
    }
    if sets.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }
    sets.push("updated_at = NOW()".to_string());

    let sql = format!("UPDATE admin SET {} WHERE id = $1 RETURNING {ADMIN_COLUMNS}", sets.join(", "));
    let mut query = sqlx::query_as::<_, Admin>(&sql).bind(id);
    if let Some(full_name) = &req.full_name {
        query = query.bind(full_name.trim());
    }
    if let Some(phone) = &req.phone {
        query = query.bind(phone);
    }
    if let Some(role) = req.role {
        query = query.bind(role);
    }
    if let Some(is_active) = req.is_active {
        query = query.bind(is_active);
    }
    if let Some(hash) = &password_hash {
        query = query.bind(hash);
    }

    let updated = query
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Admin", id))?;

    tracing::info!(updated_by = %admin.0.id, admin_id = %id, "Admin account updated");
    Ok(RespJson(AdminSummary::from(updated)))
}

async fn delete_admin(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    admin.require_super_admin()?;

    if id == admin.0.id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }

    let result = sqlx::query("DELETE FROM admin WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Admin", id));
    }

    tracing::info!(deleted_by = %admin.0.id, admin_id = %id, "Admin account deleted");
    Ok(RespJson(serde_json::json!({ "success": true, "id": id })))
}
