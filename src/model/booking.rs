use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Longest stay accepted from the public booking form
pub const MAX_NIGHTS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub booking_ref: String,
    pub room_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub children: i32,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const BOOKING_COLUMNS: &str = "id, booking_ref, room_id, guest_name, guest_email, guest_phone, \
     check_in, check_out, adults, children, total_amount, status, payment_status, \
     payment_order_id, payment_id, special_requests, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub room_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub guest_name: String,
    #[validate(email)]
    pub guest_email: String,
    #[validate(length(min = 6, max = 20))]
    pub guest_phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(range(min = 1, max = 50))]
    pub adults: i32,
    #[validate(range(min = 0, max = 50))]
    #[serde(default)]
    pub children: i32,
    #[validate(length(max = 2000))]
    pub special_requests: Option<String>,
}

/// Public view of a booking. Contact details and gateway ids stay admin-only.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    pub id: Uuid,
    pub booking_ref: String,
    pub room_id: Uuid,
    pub guest_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub children: i32,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingSummary {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            booking_ref: booking.booking_ref,
            room_id: booking.room_id,
            guest_name: booking.guest_name,
            check_in: booking.check_in,
            check_out: booking.check_out,
            adults: booking.adults,
            children: booking.children,
            total_amount: booking.total_amount,
            status: booking.status,
            payment_status: booking.payment_status,
            created_at: booking.created_at,
        }
    }
}

/// Guests prove a lookup with the email they booked under.
#[derive(Debug, Deserialize)]
pub struct BookingLookup {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BookingQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub room_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Half-open date ranges `[start, end)` overlap.
pub fn ranges_overlap(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start < b_end && b_start < a_end
}

/// Checks the stay dates of a new booking, returning the number of nights.
pub fn validate_stay(check_in: NaiveDate, check_out: NaiveDate, today: NaiveDate) -> Result<i64, String> {
    if check_out <= check_in {
        return Err("Check-out must be after check-in".to_string());
    }
    if check_in < today {
        return Err("Check-in cannot be in the past".to_string());
    }
    let nights = (check_out - check_in).num_days();
    if nights > MAX_NIGHTS {
        return Err(format!("Stays are limited to {MAX_NIGHTS} nights"));
    }
    Ok(nights)
}

/// Reference printed on confirmations, e.g. `RB-7F3A9C215B4E`. Carries 48 bits of the id.
pub fn new_booking_ref(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("RB-{}", simple[..12].to_uppercase())
}

impl Booking {
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn belongs_to(&self, email: &str) -> bool {
        let email = email.trim();
        !email.is_empty() && self.guest_email.eq_ignore_ascii_case(email)
    }
}
