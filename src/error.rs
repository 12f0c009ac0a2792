use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as RespJson, Response},
};
use thiserror::Error as ThisError;

/// Error type shared by every handler; rendered as `{"error": "..."}`.
#[derive(ThisError, Debug)]
pub enum AppError {
    /// Missing, malformed or expired credentials
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Payment gateway, SMTP relay, calendar feed or reviews API failure
    #[error("{service} request failed: {message}")]
    Upstream { service: &'static str, message: String },

    #[error("Failed to {operation}")]
    Internal { operation: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

// Postgres SQLSTATE codes we translate into client errors
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest { message: message.into() }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        AppError::NotFound { resource, id: id.to_string() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict { message: message.into() }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AppError::Unauthenticated { message: Some(message.into()) }
    }

    fn sql_state(&self) -> Option<String> {
        match self {
            AppError::Database(e) => e
                .as_database_error()
                .and_then(|db| db.code())
                .map(|code| code.to_string()),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::BadRequest { .. } | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(_) => match self.sql_state().as_deref() {
                Some(UNIQUE_VIOLATION) => StatusCode::CONFLICT,
                Some(FOREIGN_KEY_VIOLATION) | Some(CHECK_VIOLATION) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message safe to hand to clients. Internal details only go to the log.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated { message } => {
                message.clone().unwrap_or_else(|| "Authentication required".to_string())
            }
            AppError::Forbidden { message } => message.clone(),
            AppError::BadRequest { message } => message.clone(),
            AppError::Validation(errors) => {
                let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
                fields.sort();
                format!("Invalid value for: {}", fields.join(", "))
            }
            AppError::NotFound { resource, .. } => format!("{resource} not found"),
            AppError::Conflict { message } => message.clone(),
            AppError::Upstream { service, .. } => format!("{service} is currently unavailable"),
            AppError::Internal { .. } => "Internal server error".to_string(),
            AppError::Database(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
            AppError::Database(_) => match self.sql_state().as_deref() {
                Some(UNIQUE_VIOLATION) => "Resource already exists".to_string(),
                Some(FOREIGN_KEY_VIOLATION) => "Invalid reference to related resource".to_string(),
                Some(CHECK_VIOLATION) => "Invalid data provided".to_string(),
                _ => "Database error".to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, debug = ?self, "Request failed");
        } else if matches!(self, AppError::Unauthenticated { .. } | AppError::Forbidden { .. }) {
            tracing::info!("Authorization error: {}", self);
        } else {
            tracing::debug!("Client error: {}", self);
        }

        (status, RespJson(serde_json::json!({ "error": self.user_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 8))]
        password: String,
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(AppError::unauthenticated("nope").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::bad_request("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("Room", "x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("taken").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::Internal {
            operation: "hash password: cost out of range".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");

        let err = AppError::Upstream {
            service: "Payment gateway",
            message: "401 bad key rzp_live_xxx".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.user_message().contains("rzp_live"));
    }

    #[test]
    fn validation_errors_list_offending_fields() {
        let signup = Signup {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let err: AppError = signup.validate().unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Invalid value for: email, password");
    }
}
