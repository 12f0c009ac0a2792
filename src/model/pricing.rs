use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Seasonal override of a room's nightly price, `start_date..=end_date`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomPricing {
    pub id: Uuid,
    pub room_id: Uuid,
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price_per_night: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePricingRequest {
    #[validate(length(min = 1, max = 80))]
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1))]
    pub price_per_night: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePricingRequest {
    #[validate(length(min = 1, max = 80))]
    pub label: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub price_per_night: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NightPrice {
    pub date: NaiveDate,
    pub price: i32,
    /// Seasonal rule label, `weekend` or `base`
    pub rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: Vec<NightPrice>,
    pub total: i64,
}
