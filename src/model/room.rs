use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub room_type: String,
    pub price_per_night: i32,
    /// Friday and Saturday nights, when set
    pub weekend_price: Option<i32>,
    pub max_guests: i32,
    pub size_sqft: Option<i32>,
    pub bed_type: Option<String>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub ical_import_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const ROOM_COLUMNS: &str = "id, slug, name, description, room_type, price_per_night, weekend_price, \
     max_guests, size_sqft, bed_type, amenities, images, ical_import_url, is_active, sort_order, \
     created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 80))]
    pub slug: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub room_type: String,
    #[validate(range(min = 1))]
    pub price_per_night: i32,
    #[validate(range(min = 1))]
    pub weekend_price: Option<i32>,
    #[validate(range(min = 1, max = 50))]
    pub max_guests: i32,
    pub size_sqft: Option<i32>,
    pub bed_type: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(url)]
    pub ical_import_url: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoomRequest {
    #[validate(length(min = 1, max = 80))]
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub room_type: Option<String>,
    #[validate(range(min = 1))]
    pub price_per_night: Option<i32>,
    #[validate(range(min = 1))]
    pub weekend_price: Option<i32>,
    #[validate(range(min = 1, max = 50))]
    pub max_guests: Option<i32>,
    pub size_sqft: Option<i32>,
    pub bed_type: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    #[validate(url)]
    pub ical_import_url: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StayQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub available: bool,
}

impl Room {
    /// Summed in `i64` so no party size can wrap past the limit.
    pub fn fits(&self, adults: i32, children: i32) -> bool {
        if adults < 1 || children < 0 {
            return false;
        }
        i64::from(adults) + i64::from(children) <= i64::from(self.max_guests)
    }
}
