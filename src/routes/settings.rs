use axum::{
    extract::{Extension, Json, Path},
    response::Json as RespJson,
    routing::get,
    Router,
};

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::model::settings::{is_reserved_key, DashboardStats, PutSettingRequest, Setting, RESET_KEY_PREFIX};
use crate::state::AppState;

// Di-nest ke /api/admin/settings
pub fn settings_router() -> Router {
    tracing::debug!("Registering settings routes");
    Router::new()
        .route("/", get(list_settings))
        .route("/:key", get(get_setting).put(put_setting).delete(delete_setting))
}

pub fn stats_router() -> Router {
    Router::new().route("/api/admin/stats", get(dashboard_stats))
}

fn ensure_public_key(key: &str) -> AppResult<()> {
    if is_reserved_key(key) {
        // Reset tokens live in this table but are not settings
        return Err(AppError::not_found("Setting", key));
    }
    if key.trim().is_empty() || key.len() > 100 {
        return Err(AppError::bad_request("Invalid setting key"));
    }
    Ok(())
}

async fn list_settings(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<Setting>>> {
    let rows = sqlx::query_as::<_, Setting>(
        "SELECT key, value, updated_at FROM settings WHERE NOT starts_with(key, $1) ORDER BY key",
    )
    .bind(RESET_KEY_PREFIX)
    .fetch_all(&state.pool)
    .await?;
    Ok(RespJson(rows))
}

async fn get_setting(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(key): Path<String>,
) -> AppResult<RespJson<Setting>> {
    ensure_public_key(&key)?;
    let row = sqlx::query_as::<_, Setting>("SELECT key, value, updated_at FROM settings WHERE key = $1")
        .bind(&key)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Setting", &key))?;
    Ok(RespJson(row))
}

async fn put_setting(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(key): Path<String>,
    Json(req): Json<PutSettingRequest>,
) -> AppResult<RespJson<Setting>> {
    ensure_public_key(&key)?;
    let row = sqlx::query_as::<_, Setting>(
        "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW())
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
         RETURNING key, value, updated_at",
    )
    .bind(&key)
    .bind(&req.value)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(admin_id = %admin.0.id, %key, "Setting saved");
    Ok(RespJson(row))
}

async fn delete_setting(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(key): Path<String>,
) -> AppResult<RespJson<serde_json::Value>> {
    ensure_public_key(&key)?;
    let result = sqlx::query("DELETE FROM settings WHERE key = $1")
        .bind(&key)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Setting", &key));
    }

    tracing::info!(admin_id = %admin.0.id, %key, "Setting deleted");
    Ok(RespJson(serde_json::json!({ "success": true, "key": key })))
}

async fn dashboard_stats(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<DashboardStats>> {
    let (rooms, active_rooms): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM rooms")
            .fetch_one(&state.pool)
            .await?;

    let (bookings_pending, bookings_confirmed, bookings_cancelled, upcoming_check_ins, paid_revenue): (
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = sqlx::query_as(
        "SELECT
             COUNT(*) FILTER (WHERE status = 'pending'),
             COUNT(*) FILTER (WHERE status = 'confirmed'),
             COUNT(*) FILTER (WHERE status = 'cancelled'),
             COUNT(*) FILTER (WHERE status = 'confirmed' AND check_in >= CURRENT_DATE),
             COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'paid'), 0)::BIGINT
         FROM bookings",
    )
    .fetch_one(&state.pool)
    .await?;

    let (unread_messages,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contact_messages WHERE is_read = FALSE")
        .fetch_one(&state.pool)
        .await?;

    let (pending_testimonials,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM testimonials WHERE is_approved = FALSE")
            .fetch_one(&state.pool)
            .await?;

    Ok(RespJson(DashboardStats {
        rooms,
        active_rooms,
        bookings_pending,
        bookings_confirmed,
        bookings_cancelled,
        upcoming_check_ins,
        unread_messages,
        pending_testimonials,
        paid_revenue,
    }))
}
