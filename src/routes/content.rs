use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::Json as RespJson,
    routing::{get, put},
    Router,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::model::content::{Attraction, AttractionRequest, Faq, FaqRequest, HouseRule, HouseRuleRequest};
use crate::state::AppState;

const ATTRACTION_COLUMNS: &str = "id, name, description, image_url, distance, is_active, sort_order, created_at";
const FAQ_COLUMNS: &str = "id, question, answer, is_active, sort_order, created_at";
const HOUSE_RULE_COLUMNS: &str = "id, rule, is_active, sort_order, created_at";

pub fn content_router() -> Router {
    tracing::debug!("Registering content routes");
    Router::new()
        .route("/api/attractions", get(list_attractions))
        .route("/api/faqs", get(list_faqs))
        .route("/api/house-rules", get(list_house_rules))
        .route("/api/admin/attractions", get(all_attractions).post(create_attraction))
        .route("/api/admin/attractions/:id", put(update_attraction).delete(delete_attraction))
        .route("/api/admin/faqs", get(all_faqs).post(create_faq))
        .route("/api/admin/faqs/:id", put(update_faq).delete(delete_faq))
        .route("/api/admin/house-rules", get(all_house_rules).post(create_house_rule))
        .route("/api/admin/house-rules/:id", put(update_house_rule).delete(delete_house_rule))
}

/// Deletes one row of a content table by id.
pub(crate) async fn delete_row(pool: &PgPool, table: &'static str, resource: &'static str, id: Uuid) -> AppResult<()> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found(resource, id));
    }
    Ok(())
}

fn deleted(id: Uuid) -> RespJson<serde_json::Value> {
    RespJson(serde_json::json!({ "success": true, "id": id }))
}

// ---- Attractions ----

async fn list_attractions(Extension(state): Extension<AppState>) -> AppResult<RespJson<Vec<Attraction>>> {
    let rows = sqlx::query_as::<_, Attraction>(&format!(
        "SELECT {ATTRACTION_COLUMNS} FROM attractions WHERE is_active = TRUE ORDER BY sort_order, name"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(RespJson(rows))
}

async fn all_attractions(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<Attraction>>> {
    let rows = sqlx::query_as::<_, Attraction>(&format!("SELECT {ATTRACTION_COLUMNS} FROM attractions ORDER BY sort_order, name"))
        .fetch_all(&state.pool)
        .await?;
    Ok(RespJson(rows))
}

async fn create_attraction(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Json(req): Json<AttractionRequest>,
) -> AppResult<(StatusCode, RespJson<Attraction>)> {
    req.validate()?;
    let row = sqlx::query_as::<_, Attraction>(&format!(
        "INSERT INTO attractions (id, name, description, image_url, distance, is_active, sort_order)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {ATTRACTION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(&req.image_url)
    .bind(&req.distance)
    .bind(req.is_active.unwrap_or(true))
    .bind(req.sort_order.unwrap_or(0))
    .fetch_one(&state.pool)
    .await?;
    Ok((StatusCode::CREATED, RespJson(row)))
}

async fn update_attraction(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AttractionRequest>,
) -> AppResult<RespJson<Attraction>> {
    req.validate()?;
    let row = sqlx::query_as::<_, Attraction>(&format!(
        "UPDATE attractions SET name = $2, description = $3, image_url = $4, distance = $5,
             is_active = COALESCE($6, is_active), sort_order = COALESCE($7, sort_order)
         WHERE id = $1
         RETURNING {ATTRACTION_COLUMNS}"
    ))
    .bind(id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(&req.image_url)
    .bind(&req.distance)
    .bind(req.is_active)
    .bind(req.sort_order)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("Attraction", id))?;
    Ok(RespJson(row))
}

async fn delete_attraction(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    delete_row(&state.pool, "attractions", "Attraction", id).await?;
    Ok(deleted(id))
}

// ---- FAQs ----

async fn list_faqs(Extension(state): Extension<AppState>) -> AppResult<RespJson<Vec<Faq>>> {
    let rows = sqlx::query_as::<_, Faq>(&format!(
        "SELECT {FAQ_COLUMNS} FROM faqs WHERE is_active = TRUE ORDER BY sort_order, created_at"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(RespJson(rows))
}

async fn all_faqs(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<Faq>>> {
    let rows = sqlx::query_as::<_, Faq>(&format!("SELECT {FAQ_COLUMNS} FROM faqs ORDER BY sort_order, created_at"))
        .fetch_all(&state.pool)
        .await?;
    Ok(RespJson(rows))
}

async fn create_faq(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Json(req): Json<FaqRequest>,
) -> AppResult<(StatusCode, RespJson<Faq>)> {
    req.validate()?;
    let row = sqlx::query_as::<_, Faq>(&format!(
        "INSERT INTO faqs (id, question, answer, is_active, sort_order)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {FAQ_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(req.question.trim())
    .bind(req.answer.trim())
    .bind(req.is_active.unwrap_or(true))
    .bind(req.sort_order.unwrap_or(0))
    .fetch_one(&state.pool)
    .await?;
    Ok((StatusCode::CREATED, RespJson(row)))
}

async fn update_faq(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<FaqRequest>,
) -> AppResult<RespJson<Faq>> {
    req.validate()?;
    let row = sqlx::query_as::<_, Faq>(&format!(
        "UPDATE faqs SET question = $2, answer = $3,
             is_active = COALESCE($4, is_active), sort_order = COALESCE($5, sort_order)
         WHERE id = $1
         RETURNING {FAQ_COLUMNS}"
    ))
    .bind(id)
    .bind(req.question.trim())
    .bind(req.answer.trim())
    .bind(req.is_active)
    .bind(req.sort_order)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("FAQ", id))?;
    Ok(RespJson(row))
}

async fn delete_faq(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    delete_row(&state.pool, "faqs", "FAQ", id).await?;
    Ok(deleted(id))
}

// ---- House rules ----

async fn list_house_rules(Extension(state): Extension<AppState>) -> AppResult<RespJson<Vec<HouseRule>>> {
    let rows = sqlx::query_as::<_, HouseRule>(&format!(
        "SELECT {HOUSE_RULE_COLUMNS} FROM house_rules WHERE is_active = TRUE ORDER BY sort_order, created_at"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(RespJson(rows))
}

async fn all_house_rules(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<HouseRule>>> {
    let rows = sqlx::query_as::<_, HouseRule>(&format!(
        "SELECT {HOUSE_RULE_COLUMNS} FROM house_rules ORDER BY sort_order, created_at"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(RespJson(rows))
}

async fn create_house_rule(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Json(req): Json<HouseRuleRequest>,
) -> AppResult<(StatusCode, RespJson<HouseRule>)> {
    req.validate()?;
    let row = sqlx::query_as::<_, HouseRule>(&format!(
        "INSERT INTO house_rules (id, rule, is_active, sort_order)
         VALUES ($1, $2, $3, $4)
         RETURNING {HOUSE_RULE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(req.rule.trim())
    .bind(req.is_active.unwrap_or(true))
    .bind(req.sort_order.unwrap_or(0))
    .fetch_one(&state.pool)
    .await?;
    Ok((StatusCode::CREATED, RespJson(row)))
}

async fn update_house_rule(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<HouseRuleRequest>,
) -> AppResult<RespJson<HouseRule>> {
    req.validate()?;
    let row = sqlx::query_as::<_, HouseRule>(&format!(
        "UPDATE house_rules SET rule = $2,
             is_active = COALESCE($3, is_active), sort_order = COALESCE($4, sort_order)
         WHERE id = $1
         RETURNING {HOUSE_RULE_COLUMNS}"
    ))
    .bind(id)
    .bind(req.rule.trim())
    .bind(req.is_active)
    .bind(req.sort_order)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("House rule", id))?;
    Ok(RespJson(row))
}

async fn delete_house_rule(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    delete_row(&state.pool, "house_rules", "House rule", id).await?;
    Ok(deleted(id))
}
