//! Nightly rates and stay quotes.

use chrono::{Datelike, NaiveDate, Weekday};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::pricing::{NightPrice, Quote, RoomPricing};
use crate::model::room::Room;

/// Rate for the night starting on `date`.
///
/// The seasonal rule covering the date with the latest start wins (ties go to the
/// newest rule); otherwise Friday/Saturday nights use the weekend price when the
/// room has one; otherwise the base price.
pub fn nightly_rate(room: &Room, rules: &[RoomPricing], date: NaiveDate) -> NightPrice {
    let rule = rules
        .iter()
        .filter(|r| r.room_id == room.id && r.start_date <= date && date <= r.end_date)
        .max_by_key(|r| (r.start_date, r.created_at));

    if let Some(rule) = rule {
        return NightPrice {
            date,
            price: rule.price_per_night,
            rate: rule.label.clone(),
        };
    }

    match (room.weekend_price, date.weekday()) {
        (Some(price), Weekday::Fri | Weekday::Sat) => NightPrice {
            date,
            price,
            rate: "weekend".to_string(),
        },
        _ => NightPrice {
            date,
            price: room.price_per_night,
            rate: "base".to_string(),
        },
    }
}

/// Prices every night of `[check_in, check_out)`.
pub fn quote_stay(room: &Room, rules: &[RoomPricing], check_in: NaiveDate, check_out: NaiveDate) -> Quote {
    let nights: Vec<NightPrice> = check_in
        .iter_days()
        .take_while(|d| *d < check_out)
        .map(|d| nightly_rate(room, rules, d))
        .collect();
    let total = nights.iter().map(|n| i64::from(n.price)).sum();

    Quote {
        room_id: room.id,
        check_in,
        check_out,
        nights,
        total,
    }
}

pub fn validate_rule_dates(start_date: NaiveDate, end_date: NaiveDate) -> AppResult<()> {
    if end_date < start_date {
        return Err(AppError::bad_request("Pricing end date must not be before its start date"));
    }
    Ok(())
}

/// Rules of a room that touch any night of the stay.
pub async fn rules_for_stay(
    pool: &PgPool,
    room_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> AppResult<Vec<RoomPricing>> {
    let rules = sqlx::query_as::<_, RoomPricing>(
        "SELECT id, room_id, label, start_date, end_date, price_per_night, created_at
         FROM room_pricing
         WHERE room_id = $1 AND start_date < $3 AND end_date >= $2",
    )
    .bind(room_id)
    .bind(check_in)
    .bind(check_out)
    .fetch_all(pool)
    .await?;

    Ok(rules)
}

pub async fn quote_for_room(pool: &PgPool, room: &Room, check_in: NaiveDate, check_out: NaiveDate) -> AppResult<Quote> {
    let rules = rules_for_stay(pool, room.id, check_in, check_out).await?;
    Ok(quote_stay(room, &rules, check_in, check_out))
}
