use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::Json as RespJson,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::model::content::{ContactMessage, ContactRequest};
use crate::routes::content::delete_row;
use crate::state::AppState;

const MESSAGE_COLUMNS: &str = "id, name, email, phone, subject, message, is_read, created_at";

pub fn contact_router() -> Router {
    tracing::debug!("Registering contact routes");
    Router::new()
        .route("/api/contact", post(submit_message))
        .route("/api/admin/messages", get(list_messages))
        .route("/api/admin/messages/:id/read", put(mark_read))
        .route("/api/admin/messages/:id", delete(delete_message))
}

async fn submit_message(
    Extension(state): Extension<AppState>,
    Json(req): Json<ContactRequest>,
) -> AppResult<(StatusCode, RespJson<serde_json::Value>)> {
    req.validate()?;

    let message = sqlx::query_as::<_, ContactMessage>(&format!(
        "INSERT INTO contact_messages (id, name, email, phone, subject, message)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {MESSAGE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(req.email.trim())
    .bind(&req.phone)
    .bind(&req.subject)
    .bind(req.message.trim())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(message_id = %message.id, "Contact message received");

    // Notifikasi ke inbox resort tidak boleh menggagalkan request
    if let Err(e) = state.mailer.send_contact_notification(&message).await {
        tracing::warn!(message_id = %message.id, "Failed to send contact notification: {e}");
    }

    Ok((
        StatusCode::CREATED,
        RespJson(serde_json::json!({
            "success": true,
            "message": "Thanks for reaching out. We will get back to you shortly."
        })),
    ))
}

async fn list_messages(Extension(state): Extension<AppState>, _admin: AdminUser) -> AppResult<RespJson<Vec<ContactMessage>>> {
    let rows = sqlx::query_as::<_, ContactMessage>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM contact_messages ORDER BY created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(RespJson(rows))
}

async fn mark_read(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<ContactMessage>> {
    let row = sqlx::query_as::<_, ContactMessage>(&format!(
        "UPDATE contact_messages SET is_read = TRUE WHERE id = $1 RETURNING {MESSAGE_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("Message", id))?;
    Ok(RespJson(row))
}

async fn delete_message(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    delete_row(&state.pool, "contact_messages", "Message", id).await?;
    Ok(RespJson(serde_json::json!({ "success": true, "id": id })))
}
