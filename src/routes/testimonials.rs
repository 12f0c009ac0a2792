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
use crate::model::content::{CreateTestimonialRequest, ModerateTestimonialRequest, ReviewsResponse, Testimonial};
use crate::routes::content::delete_row;
use crate::services::reviews;
use crate::state::AppState;

const TESTIMONIAL_COLUMNS: &str = "id, guest_name, location, rating, content, is_approved, created_at";

pub fn testimonials_router() -> Router {
    tracing::debug!("Registering testimonial routes");
    Router::new()
        .route("/api/testimonials", get(list_approved).post(submit_testimonial))
        .route("/api/reviews", get(list_reviews))
        .route("/api/admin/testimonials", get(list_all))
        .route("/api/admin/testimonials/:id", put(moderate).delete(delete_testimonial))
}

async fn approved_testimonials(state: &AppState) -> AppResult<Vec<Testimonial>> {
    let rows = sqlx::query_as::<_, Testimonial>(&format!(
        "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE is_approved = TRUE ORDER BY created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

async fn list_approved(Extension(state): Extension<AppState>) -> AppResult<RespJson<Vec<Testimonial>>> {
    Ok(RespJson(approved_testimonials(&state).await?))
}

// Testimoni dari tamu masuk sebagai belum disetujui
async fn submit_testimonial(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateTestimonialRequest>,
) -> AppResult<(StatusCode, RespJson<serde_json::Value>)> {
    req.validate()?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO testimonials (id, guest_name, location, rating, content, is_approved)
         VALUES ($1, $2, $3, $4, $5, FALSE)",
    )
    .bind(id)
    .bind(req.guest_name.trim())
    .bind(&req.location)
    .bind(req.rating)
    .bind(req.content.trim())
    .execute(&state.pool)
    .await?;

    tracing::info!(testimonial_id = %id, rating = req.rating, "Testimonial submitted");
    Ok((
        StatusCode::CREATED,
        RespJson(serde_json::json!({
            "success": true,
            "id": id,
            "message": "Thank you! Your review will appear once approved."
        })),
    ))
}

/// Reviews API when configured, approved testimonials otherwise or when it fails.
async fn list_reviews(Extension(state): Extension<AppState>) -> AppResult<RespJson<ReviewsResponse>> {
    if let Some(url) = state.config.reviews_api_url.as_deref() {
        match reviews::fetch_external(&state.http, url).await {
            Ok(external) => return Ok(RespJson(external)),
            Err(e) => tracing::warn!("Falling back to testimonials: {e}"),
        }
    }

    let testimonials = approved_testimonials(&state).await?;
    Ok(RespJson(reviews::from_testimonials(testimonials)))
}

async fn list_all(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<Testimonial>>> {
    let rows = sqlx::query_as::<_, Testimonial>(&format!(
        "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY is_approved ASC, created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(RespJson(rows))
}

async fn moderate(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ModerateTestimonialRequest>,
) -> AppResult<RespJson<Testimonial>> {
    let row = sqlx::query_as::<_, Testimonial>(&format!(
        "UPDATE testimonials SET is_approved = $2 WHERE id = $1 RETURNING {TESTIMONIAL_COLUMNS}"
    ))
    .bind(id)
    .bind(req.is_approved)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("Testimonial", id))?;

    tracing::info!(admin_id = %admin.0.id, testimonial_id = %id, approved = req.is_approved, "Testimonial moderated");
    Ok(RespJson(row))
}

async fn delete_testimonial(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    delete_row(&state.pool, "testimonials", "Testimonial", id).await?;
    Ok(RespJson(serde_json::json!({ "success": true, "id": id })))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_server;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn rating_out_of_range_is_rejected() {
        let server = test_server();
        let response = server
            .post("/api/testimonials")
            .json(&serde_json::json!({
                "guest_name": "Rahul",
                "rating": 6,
                "content": "Best stay of our trip, staff were lovely."
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Invalid value for: rating");
    }

    #[tokio::test]
    async fn moderation_requires_admin() {
        let server = test_server();
        server
            .put(&format!("/api/admin/testimonials/{}", uuid::Uuid::new_v4()))
            .json(&serde_json::json!({ "is_approved": true }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
