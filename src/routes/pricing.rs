use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::Json as RespJson,
    routing::{get, put},
    Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::model::pricing::{CreatePricingRequest, RoomPricing, UpdatePricingRequest};
use crate::services::pricing::validate_rule_dates;
use crate::state::AppState;

const PRICING_COLUMNS: &str = "id, room_id, label, start_date, end_date, price_per_night, created_at";

pub fn pricing_router() -> Router {
    tracing::debug!("Registering pricing routes");
    Router::new()
        .route("/api/admin/rooms/:id/pricing", get(list_rules).post(create_rule))
        .route("/api/admin/pricing/:id", put(update_rule).delete(delete_rule))
}

async fn list_rules(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<RespJson<Vec<RoomPricing>>> {
    let rules = sqlx::query_as::<_, RoomPricing>(&format!(
        "SELECT {PRICING_COLUMNS} FROM room_pricing WHERE room_id = $1 ORDER BY start_date ASC"
    ))
    .bind(room_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(RespJson(rules))
}

async fn create_rule(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(room_id): Path<Uuid>,
    Json(req): Json<CreatePricingRequest>,
) -> AppResult<(StatusCode, RespJson<RoomPricing>)> {
    req.validate()?;
    validate_rule_dates(req.start_date, req.end_date)?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found("Room", room_id));
    }

    let rule = sqlx::query_as::<_, RoomPricing>(&format!(
        "INSERT INTO room_pricing (id, room_id, label, start_date, end_date, price_per_night)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PRICING_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(room_id)
    .bind(req.label.trim())
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.price_per_night)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(admin_id = %admin.0.id, room_id = %room_id, rule_id = %rule.id, "Pricing rule created");
    Ok((StatusCode::CREATED, RespJson(rule)))
}

async fn update_rule(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePricingRequest>,
) -> AppResult<RespJson<RoomPricing>> {
    req.validate()?;

    let current = sqlx::query_as::<_, RoomPricing>(&format!("SELECT {PRICING_COLUMNS} FROM room_pricing WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Pricing rule", id))?;

    let start_date = req.start_date.unwrap_or(current.start_date);
    let end_date = req.end_date.unwrap_or(current.end_date);
    validate_rule_dates(start_date, end_date)?;

    let rule = sqlx::query_as::<_, RoomPricing>(&format!(
        "UPDATE room_pricing SET
             label = COALESCE($2, label),
             start_date = $3,
             end_date = $4,
             price_per_night = COALESCE($5, price_per_night)
         WHERE id = $1
         RETURNING {PRICING_COLUMNS}"
    ))
    .bind(id)
    .bind(req.label.as_deref().map(str::trim))
    .bind(start_date)
    .bind(end_date)
    .bind(req.price_per_night)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("Pricing rule", id))?;

    tracing::info!(admin_id = %admin.0.id, rule_id = %id, "Pricing rule updated");
    Ok(RespJson(rule))
}

async fn delete_rule(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM room_pricing WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Pricing rule", id));
    }

    tracing::info!(admin_id = %admin.0.id, rule_id = %id, "Pricing rule deleted");
    Ok(RespJson(serde_json::json!({ "success": true, "id": id })))
}
