use axum::{
    extract::{Extension, Json},
    response::Json as RespJson,
    routing::post,
    Router,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::model::booking::{Booking, BookingSummary, BOOKING_COLUMNS};
use crate::routes::bookings::find_booking;
use crate::services::payment::{self, to_minor_units};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Booking id or reference
    pub booking_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub booking_id: String,
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

pub fn payments_router() -> Router {
    tracing::debug!("Registering payment routes");
    Router::new()
        .route("/api/payments/order", post(create_order))
        .route("/api/payments/verify", post(verify_payment))
}

// Amount selalu dari booking di database, bukan dari client
async fn create_order(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<RespJson<serde_json::Value>> {
    let booking = find_booking(&state.pool, &req.booking_id).await?;
    if booking.is_paid() {
        return Err(AppError::conflict("Booking is already paid"));
    }
    if booking.is_cancelled() {
        return Err(AppError::conflict("Booking has been cancelled"));
    }

    let config = &state.config.payment;
    let order = payment::create_order(
        &state.http,
        config,
        to_minor_units(booking.total_amount),
        &booking.booking_ref,
        &booking.id.to_string(),
    )
    .await?;

    sqlx::query("UPDATE bookings SET payment_order_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(booking.id)
        .bind(&order.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(
        booking_id = %booking.id,
        order_id = %order.id,
        amount = order.amount,
        status = %order.status,
        "Payment order created"
    );

    Ok(RespJson(serde_json::json!({
        "order_id": order.id,
        "amount": order.amount,
        "currency": order.currency,
        "key_id": config.key_id,
        "booking_id": booking.id,
        "booking_ref": booking.booking_ref,
    })))
}

#[derive(Debug, PartialEq, Eq)]
enum VerifyStep {
    /// Same payment reported twice; answer as before without writing.
    AlreadyRecorded,
    CheckSignature,
}

/// Decides from the stored booking alone whether a verify request may touch it.
fn verify_step(booking: &Booking, req: &VerifyPaymentRequest) -> AppResult<VerifyStep> {
    if booking.is_paid() {
        if booking.payment_id.as_deref() == Some(req.payment_id.as_str()) {
            return Ok(VerifyStep::AlreadyRecorded);
        }
        return Err(AppError::conflict("Booking is already paid"));
    }
    if booking.is_cancelled() {
        return Err(AppError::conflict("Booking has been cancelled"));
    }
    if booking.payment_order_id.as_deref() != Some(req.order_id.as_str()) {
        return Err(AppError::bad_request("Payment order does not belong to this booking"));
    }
    Ok(VerifyStep::CheckSignature)
}

async fn verify_payment(
    Extension(state): Extension<AppState>,
    Json(req): Json<VerifyPaymentRequest>,
) -> AppResult<RespJson<serde_json::Value>> {
    let booking = find_booking(&state.pool, &req.booking_id).await?;

    if verify_step(&booking, &req)? == VerifyStep::AlreadyRecorded {
        return Ok(RespJson(serde_json::json!({ "success": true, "booking": BookingSummary::from(booking) })));
    }

    let valid = payment::verify_payment_signature(
        &req.order_id,
        &req.payment_id,
        &req.signature,
        &state.config.payment.key_secret,
    );

    if !valid {
        // Only an unpaid attempt can be marked failed
        sqlx::query(
            "UPDATE bookings SET payment_status = 'failed', updated_at = NOW()
             WHERE id = $1 AND payment_status = 'pending'",
        )
        .bind(booking.id)
        .execute(&state.pool)
        .await?;
        tracing::warn!(booking_id = %booking.id, order_id = %req.order_id, "Payment signature mismatch");
        return Err(AppError::bad_request("Payment verification failed"));
    }

    // Guarded against an admin cancellation or a parallel verify since the read above
    let booking = sqlx::query_as::<_, Booking>(&format!(
        "UPDATE bookings SET payment_status = 'paid', status = 'confirmed', payment_id = $2, updated_at = NOW()
         WHERE id = $1 AND status <> 'cancelled' AND payment_status <> 'paid' AND payment_order_id = $3
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(booking.id)
    .bind(&req.payment_id)
    .bind(&req.order_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::conflict("Booking changed while the payment was being verified"))?;

    tracing::info!(booking_id = %booking.id, payment_id = %req.payment_id, "Payment verified");

    let room_name: Option<(String,)> = sqlx::query_as("SELECT name FROM rooms WHERE id = $1")
        .bind(booking.room_id)
        .fetch_optional(&state.pool)
        .await?;
    let room_name = room_name.map(|(name,)| name).unwrap_or_else(|| "your room".to_string());

    if let Err(e) = state.mailer.send_booking_confirmation(&booking, &room_name).await {
        tracing::warn!(booking_id = %booking.id, "Failed to send booking confirmation: {e}");
    }

    Ok(RespJson(serde_json::json!({ "success": true, "booking": BookingSummary::from(booking) })))
}
