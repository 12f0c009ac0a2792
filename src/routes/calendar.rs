use axum::{
    extract::{Extension, Json, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Json as RespJson, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::model::blocked_date::{BlockSource, BlockedDate, CreateBlockedDateRequest, SyncResult};
use crate::model::room::{Room, ROOM_COLUMNS};
use crate::routes::rooms::find_room;
use crate::services::ical::{self, CalendarEvent};
use crate::state::AppState;

const BLOCK_COLUMNS: &str = "id, room_id, start_date, end_date, reason, source, external_uid, created_at";

pub fn calendar_router() -> Router {
    tracing::debug!("Registering calendar routes");
    Router::new()
        .route("/api/calendar/:id", get(export_calendar))
        .route("/api/admin/rooms/:id/blocked-dates", get(list_blocked).post(create_blocked))
        .route("/api/admin/blocked-dates/:id", delete(delete_blocked))
        .route("/api/admin/rooms/:id/calendar-sync", post(sync_one))
        .route("/api/admin/calendar/sync", post(sync_all))
}

// Feed publik: hanya tanggal, tanpa data tamu atau nomor booking
fn booking_event(id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> CalendarEvent {
    CalendarEvent {
        uid: format!("booking-{id}@resort-be"),
        start: check_in,
        end: check_out,
        summary: "Booked".to_string(),
    }
}

// Feed iCal untuk channel manager (Airbnb, Booking.com, dll)
async fn export_calendar(Extension(state): Extension<AppState>, Path(key): Path<String>) -> AppResult<Response> {
    let key = key.strip_suffix(".ics").unwrap_or(&key);
    let room = find_room(&state.pool, key)
        .await?
        .ok_or_else(|| AppError::not_found("Room", key))?;

    let since = Utc::now().date_naive() - Duration::days(1);

    let bookings: Vec<(Uuid, NaiveDate, NaiveDate)> = sqlx::query_as(
        "SELECT id, check_in, check_out FROM bookings
         WHERE room_id = $1 AND status <> 'cancelled' AND check_out >= $2
         ORDER BY check_in",
    )
    .bind(room.id)
    .bind(since)
    .fetch_all(&state.pool)
    .await?;

    // External blocks came from other channels and are not echoed back to them
    let blocks = sqlx::query_as::<_, BlockedDate>(&format!(
        "SELECT {BLOCK_COLUMNS} FROM blocked_dates
         WHERE room_id = $1 AND source = 'manual' AND end_date >= $2
         ORDER BY start_date"
    ))
    .bind(room.id)
    .bind(since)
    .fetch_all(&state.pool)
    .await?;

    let mut events: Vec<CalendarEvent> = bookings
        .into_iter()
        .map(|(id, check_in, check_out)| booking_event(id, check_in, check_out))
        .collect();
    events.extend(blocks.into_iter().map(|block| CalendarEvent {
        uid: format!("block-{}@resort-be", block.id),
        start: block.start_date,
        end: block.end_date,
        summary: block.reason.unwrap_or_else(|| "Not available".to_string()),
    }));

    let name = format!("{} - {}", state.config.resort_name, room.name);
    let body = ical::render_calendar(&name, &events, Utc::now());

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}.ics\"", room.slug)),
        ],
        body,
    )
        .into_response())
}

async fn list_blocked(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<RespJson<Vec<BlockedDate>>> {
    let blocks = sqlx::query_as::<_, BlockedDate>(&format!(
        "SELECT {BLOCK_COLUMNS} FROM blocked_dates WHERE room_id = $1 ORDER BY start_date ASC"
    ))
    .bind(room_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(RespJson(blocks))
}

async fn create_blocked(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(room_id): Path<Uuid>,
    Json(req): Json<CreateBlockedDateRequest>,
) -> AppResult<(StatusCode, RespJson<BlockedDate>)> {
    if req.end_date <= req.start_date {
        return Err(AppError::bad_request("End date must be after start date"));
    }

    let block = sqlx::query_as::<_, BlockedDate>(&format!(
        "INSERT INTO blocked_dates (id, room_id, start_date, end_date, reason, source)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {BLOCK_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(room_id)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()))
    .bind(BlockSource::Manual)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(admin_id = %admin.0.id, room_id = %room_id, block_id = %block.id, "Dates blocked");
    Ok((StatusCode::CREATED, RespJson(block)))
}

async fn delete_blocked(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM blocked_dates WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Blocked date", id));
    }

    tracing::info!(admin_id = %admin.0.id, block_id = %id, "Blocked dates removed");
    Ok(RespJson(serde_json::json!({ "success": true, "id": id })))
}

async fn fetch_feed(client: &reqwest::Client, url: &str) -> AppResult<String> {
    let upstream = |message: String| AppError::Upstream {
        service: "Calendar feed",
        message,
    };

    let resp = client.get(url).send().await.map_err(|e| upstream(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(upstream(format!("{url} returned {}", resp.status())));
    }
    resp.text().await.map_err(|e| upstream(e.to_string()))
}

/// Replaces the room's external blocks with the events of its import feed.
async fn sync_room(state: &AppState, room: &Room) -> AppResult<usize> {
    let url = room
        .ical_import_url
        .as_deref()
        .ok_or_else(|| AppError::bad_request("Room has no calendar import URL"))?;

    let feed = fetch_feed(&state.http, url).await?;
    let events = ical::parse_calendar(&feed);

    let mut tx = state.pool.begin().await?;

    sqlx::query("DELETE FROM blocked_dates WHERE room_id = $1 AND source = 'external'")
        .bind(room.id)
        .execute(&mut *tx)
        .await?;

    for event in &events {
        let reason = if event.summary.trim().is_empty() {
            None
        } else {
            Some(event.summary.trim())
        };
        sqlx::query(
            "INSERT INTO blocked_dates (id, room_id, start_date, end_date, reason, source, external_uid)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(room.id)
        .bind(event.start)
        .bind(event.end)
        .bind(reason)
        .bind(BlockSource::External)
        .bind(&event.uid)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(room_id = %room.id, imported = events.len(), "Calendar feed synced");
    Ok(events.len())
}

async fn sync_one(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<RespJson<SyncResult>> {
    let room = find_room(&state.pool, &room_id.to_string())
        .await?
        .ok_or_else(|| AppError::not_found("Room", room_id))?;

    let imported = sync_room(&state, &room).await?;
    Ok(RespJson(SyncResult {
        room_id,
        imported,
        error: None,
    }))
}

/// Syncs every room with an import URL; one failing feed does not stop the others.
async fn sync_all(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<SyncResult>>> {
    let rooms = sqlx::query_as::<_, Room>(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE ical_import_url IS NOT NULL AND ical_import_url <> '' ORDER BY sort_order"
    ))
    .fetch_all(&state.pool)
    .await?;

    let mut results = Vec::with_capacity(rooms.len());
    for room in &rooms {
        let result = match sync_room(&state, room).await {
            Ok(imported) => SyncResult {
                room_id: room.id,
                imported,
                error: None,
            },
            Err(e) => {
                tracing::warn!(room_id = %room.id, "Calendar sync failed: {e}");
                SyncResult {
                    room_id: room.id,
                    imported: 0,
                    error: Some(e.user_message()),
                }
            }
        };
        results.push(result);
    }

    Ok(RespJson(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_room, test_server, test_server_with_pool};
    use sqlx::PgPool;

    #[test]
    fn booked_nights_carry_no_reference_or_guest_data() {
        let id = Uuid::new_v4();
        let check_in = NaiveDate::from_ymd_opt(2030, 5, 10).unwrap();
        let event = booking_event(id, check_in, check_in + Duration::days(3));
        assert_eq!(event.summary, "Booked");
        assert_eq!(event.uid, format!("booking-{id}@resort-be"));
    }

    #[sqlx::test]
    async fn exported_feed_hides_booking_reference(pool: PgPool) {
        let room = seed_room(&pool).await;
        let server = test_server_with_pool(pool.clone());
        let response = server
            .post("/api/bookings")
            .json(&serde_json::json!({
                "room_id": room.id,
                "guest_name": "Asha Menon",
                "guest_email": "asha@example.com",
                "guest_phone": "+91 98470 12345",
                "check_in": "2030-05-10",
                "check_out": "2030-05-13",
                "adults": 2
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let booking: serde_json::Value = response.json();
        let booking_ref = booking["booking_ref"].as_str().unwrap().to_string();

        let response = server.get(&format!("/api/calendar/{}", room.id)).await;
        response.assert_status_ok();
        let feed = response.text();
        assert!(feed.contains("SUMMARY:Booked\r\n"));
        assert!(!feed.contains(&booking_ref));
        assert!(!feed.contains("Asha"));
    }

    #[tokio::test]
    async fn blocking_dates_requires_admin() {
        let server = test_server();
        let response = server
            .post(&format!("/api/admin/rooms/{}/blocked-dates", Uuid::new_v4()))
            .json(&serde_json::json!({ "start_date": "2030-01-01", "end_date": "2030-01-03" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn syncing_all_feeds_requires_admin() {
        let server = test_server();
        server
            .post("/api/admin/calendar/sync")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
