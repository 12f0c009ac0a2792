use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::Json as RespJson,
    routing::get,
    Router,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::model::booking::validate_stay;
use crate::model::pricing::Quote;
use crate::model::room::{AvailabilityResponse, CreateRoomRequest, Room, StayQuery, UpdateRoomRequest, ROOM_COLUMNS};
use crate::services::{availability, pricing};
use crate::state::AppState;

pub fn rooms_router() -> Router {
    tracing::debug!("Registering room routes");
    Router::new()
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/:id", get(get_room))
        .route("/api/rooms/:id/availability", get(check_availability))
        .route("/api/rooms/:id/quote", get(quote_room))
        .route("/api/admin/rooms", get(list_all_rooms).post(create_room))
        .route("/api/admin/rooms/:id", axum::routing::put(update_room).delete(delete_room))
}

/// Looks a room up by id, or by slug when the key is not a UUID.
pub(crate) async fn find_room(pool: &PgPool, key: &str) -> AppResult<Option<Room>> {
    let room = match Uuid::parse_str(key) {
        Ok(id) => {
            sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        Err(_) => {
            sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE slug = $1"))
                .bind(key)
                .fetch_optional(pool)
                .await?
        }
    };
    Ok(room)
}

/// Rooms hidden from the public site are reported as missing.
async fn find_active_room(pool: &PgPool, key: &str) -> AppResult<Room> {
    find_room(pool, key)
        .await?
        .filter(|room| room.is_active)
        .ok_or_else(|| AppError::not_found("Room", key))
}

// List kamar aktif untuk halaman publik
async fn list_rooms(Extension(state): Extension<AppState>) -> AppResult<RespJson<Vec<Room>>> {
    let rooms = sqlx::query_as::<_, Room>(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE is_active = TRUE ORDER BY sort_order ASC, name ASC"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(RespJson(rooms))
}

async fn get_room(Extension(state): Extension<AppState>, Path(key): Path<String>) -> AppResult<RespJson<Room>> {
    Ok(RespJson(find_active_room(&state.pool, &key).await?))
}

fn check_stay(stay: &StayQuery) -> AppResult<()> {
    validate_stay(stay.check_in, stay.check_out, Utc::now().date_naive())
        .map(|_| ())
        .map_err(AppError::bad_request)
}

async fn check_availability(
    Extension(state): Extension<AppState>,
    Path(key): Path<String>,
    Query(stay): Query<StayQuery>,
) -> AppResult<RespJson<AvailabilityResponse>> {
    check_stay(&stay)?;
    let room = find_active_room(&state.pool, &key).await?;
    let available = availability::is_available(&state.pool, room.id, stay.check_in, stay.check_out).await?;

    Ok(RespJson(AvailabilityResponse {
        room_id: room.id,
        check_in: stay.check_in,
        check_out: stay.check_out,
        available,
    }))
}

async fn quote_room(
    Extension(state): Extension<AppState>,
    Path(key): Path<String>,
    Query(stay): Query<StayQuery>,
) -> AppResult<RespJson<Quote>> {
    check_stay(&stay)?;
    let room = find_active_room(&state.pool, &key).await?;
    let quote = pricing::quote_for_room(&state.pool, &room, stay.check_in, stay.check_out).await?;
    Ok(RespJson(quote))
}

async fn list_all_rooms(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<Room>>> {
    let rooms = sqlx::query_as::<_, Room>(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms ORDER BY sort_order ASC, name ASC"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(RespJson(rooms))
}

async fn create_room(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Json(req): Json<CreateRoomRequest>,
) -> AppResult<(StatusCode, RespJson<Room>)> {
    req.validate()?;

    let room = sqlx::query_as::<_, Room>(&format!(
        "INSERT INTO rooms (id, slug, name, description, room_type, price_per_night, weekend_price,
             max_guests, size_sqft, bed_type, amenities, images, ical_import_url, is_active, sort_order)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
         RETURNING {ROOM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(req.slug.trim().to_lowercase())
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(&req.room_type)
    .bind(req.price_per_night)
    .bind(req.weekend_price)
    .bind(req.max_guests)
    .bind(req.size_sqft)
    .bind(&req.bed_type)
    .bind(&req.amenities)
    .bind(&req.images)
    .bind(&req.ical_import_url)
    .bind(req.is_active.unwrap_or(true))
    .bind(req.sort_order.unwrap_or(0))
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(admin_id = %admin.0.id, room_id = %room.id, slug = %room.slug, "Room created");
    Ok((StatusCode::CREATED, RespJson(room)))
}

async fn update_room(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoomRequest>,
) -> AppResult<RespJson<Room>> {
    req.validate()?;

    let room = sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET
             slug = COALESCE($2, slug),
             name = COALESCE($3, name),
             description = COALESCE($4, description),
             room_type = COALESCE($5, room_type),
             price_per_night = COALESCE($6, price_per_night),
             weekend_price = COALESCE($7, weekend_price),
             max_guests = COALESCE($8, max_guests),
             size_sqft = COALESCE($9, size_sqft),
             bed_type = COALESCE($10, bed_type),
             amenities = COALESCE($11, amenities),
             images = COALESCE($12, images),
             ical_import_url = COALESCE($13, ical_import_url),
             is_active = COALESCE($14, is_active),
             sort_order = COALESCE($15, sort_order),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {ROOM_COLUMNS}"
    ))
    .bind(id)
    .bind(req.slug.as_deref().map(|s| s.trim().to_lowercase()))
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.room_type)
    .bind(req.price_per_night)
    .bind(req.weekend_price)
    .bind(req.max_guests)
    .bind(req.size_sqft)
    .bind(&req.bed_type)
    .bind(&req.amenities)
    .bind(&req.images)
    .bind(&req.ical_import_url)
    .bind(req.is_active)
    .bind(req.sort_order)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("Room", id))?;

    tracing::info!(admin_id = %admin.0.id, room_id = %id, "Room updated");
    Ok(RespJson(room))
}

async fn delete_room(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    let (bookings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE room_id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if bookings > 0 {
        return Err(AppError::conflict("Room has bookings; deactivate it instead"));
    }

    let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Room", id));
    }

    tracing::info!(admin_id = %admin.0.id, room_id = %id, "Room deleted");
    Ok(RespJson(serde_json::json!({ "success": true, "id": id })))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_server;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn availability_rejects_inverted_dates() {
        let server = test_server();
        let response = server
            .get("/api/rooms/garden-villa/availability")
            .add_query_param("check_in", "2030-05-04")
            .add_query_param("check_out", "2030-05-02")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Check-out must be after check-in");
    }

    #[tokio::test]
    async fn quote_requires_dates() {
        let server = test_server();
        let response = server.get("/api/rooms/garden-villa/quote").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn creating_rooms_requires_admin() {
        let server = test_server();
        let response = server
            .post("/api/admin/rooms")
            .json(&serde_json::json!({
                "slug": "garden-villa",
                "name": "Garden Villa",
                "room_type": "villa",
                "price_per_night": 4000,
                "max_guests": 3
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
