use axum::{
    extract::{Extension, Json},
    response::Json as RespJson,
    routing::post,
    Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::routes::bookings::find_booking;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CustomEmail {
    #[validate(email)]
    pub to: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EmailAction {
    /// Re-sends the confirmation of a booking (id or reference)
    BookingConfirmation { booking_id: String },
    Custom(CustomEmail),
}

pub fn email_router() -> Router {
    Router::new().route("/api/admin/email", post(send_email))
}

async fn send_email(
    Extension(state): Extension<AppState>,
    admin: AdminUser,
    Json(action): Json<EmailAction>,
) -> AppResult<RespJson<serde_json::Value>> {
    match action {
        EmailAction::BookingConfirmation { booking_id } => {
            let booking = find_booking(&state.pool, &booking_id).await?;
            let (room_name,): (String,) = sqlx::query_as("SELECT name FROM rooms WHERE id = $1")
                .bind(booking.room_id)
                .fetch_one(&state.pool)
                .await?;

            state.mailer.send_booking_confirmation(&booking, &room_name).await?;
            tracing::info!(admin_id = %admin.0.id, booking_id = %booking.id, "Booking confirmation re-sent");
        }
        EmailAction::Custom(email) => {
            email.validate()?;
            state.mailer.send_custom(&email.to, &email.subject, &email.body).await?;
            tracing::info!(admin_id = %admin.0.id, to = %email.to, "Custom email sent");
        }
    }

    Ok(RespJson(serde_json::json!({ "success": true })))
}
