//! Room availability against bookings and blocked dates.

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::error::AppResult;

/// No non-cancelled booking and no block of the room overlaps `[check_in, check_out)`.
pub async fn is_available<'c, E>(executor: E, room_id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> AppResult<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    let (taken,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (
             SELECT 1 FROM bookings
             WHERE room_id = $1 AND status <> 'cancelled' AND check_in < $3 AND $2 < check_out
         ) OR EXISTS (
             SELECT 1 FROM blocked_dates
             WHERE room_id = $1 AND start_date < $3 AND $2 < end_date
         )",
    )
    .bind(room_id)
    .bind(check_in)
    .bind(check_out)
    .fetch_one(executor)
    .await?;

    Ok(!taken)
}
