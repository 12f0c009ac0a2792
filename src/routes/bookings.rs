use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::Json as RespJson,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::model::booking::{
    new_booking_ref, validate_stay, Booking, BookingListResponse, BookingLookup, BookingQuery, BookingSummary,
    CreateBookingRequest, UpdateBookingRequest, BOOKING_COLUMNS,
};
use crate::model::room::{Room, ROOM_COLUMNS};
use crate::services::{availability, pricing};
use crate::state::AppState;

pub fn bookings_router() -> Router {
    tracing::debug!("Registering booking routes");
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/:id", get(get_booking))
        .route("/api/admin/bookings", get(list_bookings))
        .route("/api/admin/bookings/:id", put(update_booking).delete(delete_booking))
}

/// Looks a booking up by id, or by its reference when the key is not a UUID.
pub(crate) async fn find_booking(pool: &PgPool, key: &str) -> AppResult<Booking> {
    let booking = match Uuid::parse_str(key) {
        Ok(id) => {
            sqlx::query_as::<_, Booking>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        Err(_) => {
            sqlx::query_as::<_, Booking>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_ref = $1"))
                .bind(key.trim().to_uppercase())
                .fetch_optional(pool)
                .await?
        }
    };
    booking.ok_or_else(|| AppError::not_found("Booking", key))
}

// Buat booking baru dari form publik
async fn create_booking(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, RespJson<Booking>)> {
    req.validate()?;
    validate_stay(req.check_in, req.check_out, Utc::now().date_naive()).map_err(AppError::bad_request)?;

    let mut tx = state.pool.begin().await?;

    // Row lock serializes concurrent bookings of the same room
    let room = sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1 FOR UPDATE"))
        .bind(req.room_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|room| room.is_active)
        .ok_or_else(|| AppError::not_found("Room", req.room_id))?;

    if !room.fits(req.adults, req.children) {
        return Err(AppError::bad_request(format!(
            "{} accommodates at most {} guests",
            room.name, room.max_guests
        )));
    }

    if !availability::is_available(&mut *tx, room.id, req.check_in, req.check_out).await? {
        return Err(AppError::conflict("Room is not available for the selected dates"));
    }

    let rules = pricing::rules_for_stay(&state.pool, room.id, req.check_in, req.check_out).await?;
    let quote = pricing::quote_stay(&room, &rules, req.check_in, req.check_out);

    let id = Uuid::new_v4();
    let booking = sqlx::query_as::<_, Booking>(&format!(
        "INSERT INTO bookings (id, booking_ref, room_id, guest_name, guest_email, guest_phone,
             check_in, check_out, adults, children, total_amount, special_requests)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(id)
    .bind(new_booking_ref(id))
    .bind(room.id)
    .bind(req.guest_name.trim())
    .bind(req.guest_email.trim().to_lowercase())
    .bind(req.guest_phone.trim())
    .bind(req.check_in)
    .bind(req.check_out)
    .bind(req.adults)
    .bind(req.children)
    .bind(quote.total)
    .bind(&req.special_requests)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        booking_ref = %booking.booking_ref,
        room_id = %room.id,
        nights = quote.nights.len(),
        total = booking.total_amount,
        "Booking created"
    );
    Ok((StatusCode::CREATED, RespJson(booking)))
}

// Tamu cek booking dengan nomor booking + email
async fn get_booking(
    Extension(state): Extension<AppState>,
    Path(key): Path<String>,
    Query(lookup): Query<BookingLookup>,
) -> AppResult<RespJson<BookingSummary>> {
    let booking = find_booking(&state.pool, &key).await?;
    if !booking.belongs_to(&lookup.email) {
        // Same answer as an unknown reference
        return Err(AppError::not_found("Booking", &key));
    }
    Ok(RespJson(booking.into()))
}

// Admin: semua booking dengan filter dan pagination
async fn list_bookings(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Query(params): Query<BookingQuery>,
) -> AppResult<RespJson<BookingListResponse>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let mut where_clauses = Vec::new();
    let mut param_count = 1;

    if params.status.is_some() {
        where_clauses.push(format!("status = ${param_count}"));
        param_count += 1;
    }
    if params.payment_status.is_some() {
        where_clauses.push(format!("payment_status = ${param_count}"));
        param_count += 1;
    }
    if params.room_id.is_some() {
        where_clauses.push(format!("room_id = ${param_count}"));
        param_count += 1;
    }

    let where_clause = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM bookings {where_clause}");
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
    if let Some(status) = params.status {
        count_query = count_query.bind(status);
    }
    if let Some(payment_status) = params.payment_status {
        count_query = count_query.bind(payment_status);
    }
    if let Some(room_id) = params.room_id {
        count_query = count_query.bind(room_id);
    }
    let (total,) = count_query.fetch_one(&state.pool).await?;

    let fetch_sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_clause}
         ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        param_count,
        param_count + 1
    );
    let mut fetch_query = sqlx::query_as::<_, Booking>(&fetch_sql);
    if let Some(status) = params.status {
        fetch_query = fetch_query.bind(status);
    }
    if let Some(payment_status) = params.payment_status {
        fetch_query = fetch_query.bind(payment_status);
    }
    if let Some(room_id) = params.room_id {
        fetch_query = fetch_query.bind(room_id);
    }
    let bookings = fetch_query.bind(limit).bind(offset).fetch_all(&state.pool).await?;

    Ok(RespJson(BookingListResponse {
        bookings,
        total,
        page,
        limit,
    }))
}

async fn update_booking(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> AppResult<RespJson<Booking>> {
    if req.status.is_none() && req.payment_status.is_none() {
        return Err(AppError::bad_request("No fields to update"));
    }

    let booking = sqlx::query_as::<_, Booking>(&format!(
        "UPDATE bookings SET
             status = COALESCE($2, status),
             payment_status = COALESCE($3, payment_status),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(id)
    .bind(req.status)
    .bind(req.payment_status)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("Booking", id))?;

    tracing::info!(
        admin_id = %admin.0.id,
        booking_id = %id,
        status = ?booking.status,
        payment_status = ?booking.payment_status,
        "Booking updated"
    );
    Ok(RespJson(booking))
}

async fn delete_booking(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Booking", id));
    }

    tracing::info!(admin_id = %admin.0.id, booking_id = %id, "Booking deleted");
    Ok(RespJson(serde_json::json!({ "success": true, "id": id })))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{seed_room, test_server, test_server_with_pool};
    use axum::http::StatusCode;
    use sqlx::PgPool;

    fn booking_body() -> serde_json::Value {
        serde_json::json!({
            "room_id": "6a0f3a52-3b9e-4d6e-9d0e-5b7e2b3c9f10",
            "guest_name": "Asha Menon",
            "guest_email": "asha@example.com",
            "guest_phone": "+91 98470 12345",
            "check_in": "2030-05-10",
            "check_out": "2030-05-13",
            "adults": 2,
            "children": 1
        })
    }

    #[tokio::test]
    async fn invalid_guest_email_is_rejected() {
        let server = test_server();
        let mut body = booking_body();
        body["guest_email"] = serde_json::json!("not-an-email");

        let response = server.post("/api/bookings").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Invalid value for: guest_email");
    }

    #[tokio::test]
    async fn stays_longer_than_thirty_nights_are_rejected() {
        let server = test_server();
        let mut body = booking_body();
        body["check_out"] = serde_json::json!("2030-07-10");

        let response = server.post("/api/bookings").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Stays are limited to 30 nights");
    }

    #[tokio::test]
    async fn zero_adults_is_rejected() {
        let server = test_server();
        let mut body = booking_body();
        body["adults"] = serde_json::json!(0);

        let response = server.post("/api/bookings").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_dates_are_unprocessable() {
        let server = test_server();
        let mut body = booking_body();
        body["check_in"] = serde_json::json!("next friday");

        let response = server.post("/api/bookings").json(&body).await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn admin_listing_requires_token() {
        let server = test_server();
        server.get("/api/admin/bookings").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn oversized_party_is_rejected_before_lookup() {
        let server = test_server();
        let mut body = booking_body();
        body["adults"] = serde_json::json!(i32::MAX);
        body["children"] = serde_json::json!(1);

        let response = server.post("/api/bookings").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Invalid value for: adults");
    }

    #[tokio::test]
    async fn public_lookup_requires_guest_email() {
        let server = test_server();
        server
            .get("/api/bookings/RB-7F3A9C215B4E")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn public_lookup_shows_summary_to_the_guest_only(pool: PgPool) {
        let room = seed_room(&pool).await;
        let server = test_server_with_pool(pool);
        let mut body = booking_body();
        body["room_id"] = serde_json::json!(room.id);
        body["special_requests"] = serde_json::json!("Ground floor please");
        let response = server.post("/api/bookings").json(&body).await;
        response.assert_status(StatusCode::CREATED);
        let created: serde_json::Value = response.json();
        let path = format!("/api/bookings/{}", created["booking_ref"].as_str().unwrap());

        server
            .get(&path)
            .add_query_param("email", "someone@else.test")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let response = server.get(&path).add_query_param("email", "ASHA@example.com").await;
        response.assert_status_ok();
        let summary: serde_json::Value = response.json();
        assert_eq!(summary["id"], created["id"]);
        assert_eq!(summary["status"], "pending");
        assert!(summary.get("guest_email").is_none());
        assert!(summary.get("guest_phone").is_none());
        assert!(summary.get("special_requests").is_none());
    }

    #[sqlx::test]
    async fn party_larger_than_room_is_rejected(pool: PgPool) {
        let room = seed_room(&pool).await;
        let server = test_server_with_pool(pool);
        let mut body = booking_body();
        body["room_id"] = serde_json::json!(room.id);
        body["adults"] = serde_json::json!(3);
        body["children"] = serde_json::json!(2);

        let response = server.post("/api/bookings").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Garden Villa accommodates at most 3 guests");
    }
}
