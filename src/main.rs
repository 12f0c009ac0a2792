use axum::{extract::Extension, response::Json as RespJson, routing::get, Router};
use dotenv::dotenv;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod db;
mod error;
mod model;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_utils;

use config::Config;
use routes::auth::auth_router;
use routes::bookings::bookings_router;
use routes::calendar::calendar_router;
use routes::contact::contact_router;
use routes::content::content_router;
use routes::email::email_router;
use routes::payments::payments_router;
use routes::pricing::pricing_router;
use routes::rooms::rooms_router;
use routes::settings::{settings_router, stats_router};
use routes::testimonials::testimonials_router;
use routes::users::users_router;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn health() -> RespJson<serde_json::Value> {
    RespJson(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let serve_dir = ServeDir::new(&static_dir).not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    Router::new()
        .merge(auth_router())
        .merge(rooms_router())
        .merge(pricing_router())
        .merge(bookings_router())
        .merge(calendar_router())
        .merge(content_router())
        .merge(testimonials_router())
        .merge(contact_router())
        .merge(payments_router())
        .merge(email_router())
        .merge(stats_router())
        .nest("/api/admin/users", users_router())
        .nest("/api/admin/settings", settings_router())
        .route("/api/health", get(health))
        // Semua path lain dilayani oleh build frontend
        .fallback_service(serve_dir)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("resort_be=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "Starting resort backend");
    if config.is_development() {
        tracing::warn!("Development mode: unset secrets use placeholder values");
    }

    let pool = db::connect(&config.database_url).await?;
    db::migrate(&pool).await?;
    tracing::info!("Database migrations applied");

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(pool, config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_server;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn health_check_responds() {
        let server = test_server();
        let response = server.get("/api/health").await;
        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn bearer_token_is_checked_before_path() {
        let server = test_server();
        let response = server
            .put("/api/admin/bookings/not-a-uuid")
            .authorization_bearer("forged")
            .json(&serde_json::json!({ "status": "confirmed" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
