use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::services::mailer::Mailer;

/// Shared by every request through an `Extension` layer.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub mailer: Arc<Mailer>,
    /// Outbound client for the payment gateway, calendar feeds and reviews API
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self, AppError> {
        let mailer = Mailer::new(&config)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("resort-be/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal {
                operation: format!("build HTTP client: {e}"),
            })?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            mailer: Arc::new(mailer),
            http,
        })
    }
}
