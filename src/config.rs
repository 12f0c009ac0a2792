//! Server configuration, read from the environment (and `.env` in development).

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must not be empty in {environment} environment")]
    EmptySecret { name: &'static str, environment: String },
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// development | staging | production
    pub environment: String,
    /// Built web client served for every non-API path
    pub static_dir: String,
    /// Public URL of the site, used in links sent by email
    pub public_base_url: String,
    pub resort_name: String,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub payment: PaymentConfig,
    /// Third-party reviews endpoint; approved testimonials are served when unset
    pub reviews_api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub reset_token_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub enum EmailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
    /// Writes every message to a directory instead of sending it
    File { path: String },
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub transport: EmailTransportConfig,
    pub from_email: String,
    pub from_name: String,
    /// Inbox notified about new contact messages
    pub notify_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_base: String,
    pub key_id: String,
    pub key_secret: String,
    pub currency: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// A secret must be set and non-empty outside development.
    fn require_secret(name: &'static str, environment: &str) -> Result<String, ConfigError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(ConfigError::Missing(name));
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(ConfigError::EmptySecret {
                name,
                environment: environment.to_string(),
            });
        }
        Ok(val)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = var_or("ENVIRONMENT", "development");

        let transport = match optional_var("SMTP_HOST") {
            Some(host) => EmailTransportConfig::Smtp {
                host,
                port: parse_var("SMTP_PORT", 587)?,
                username: var_or("SMTP_USERNAME", ""),
                password: Self::require_secret("SMTP_PASSWORD", &environment)?,
                use_tls: parse_var("SMTP_USE_TLS", true)?,
            },
            None => EmailTransportConfig::File {
                path: var_or("EMAIL_FILE_DIR", "emails"),
            },
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            host: var_or("HOST", "127.0.0.1"),
            port: parse_var("PORT", 8000)?,
            static_dir: var_or("STATIC_DIR", "../fe/dist"),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            resort_name: var_or("RESORT_NAME", "The Resort"),
            auth: AuthConfig {
                jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
                jwt_ttl_hours: parse_var("JWT_TTL_HOURS", 24)?,
                reset_token_ttl_minutes: parse_var("RESET_TOKEN_TTL_MINUTES", 60)?,
            },
            email: EmailConfig {
                transport,
                from_email: var_or("EMAIL_FROM", "bookings@resort.local"),
                from_name: var_or("EMAIL_FROM_NAME", "Resort Reservations"),
                notify_email: optional_var("ADMIN_NOTIFY_EMAIL"),
            },
            payment: PaymentConfig {
                api_base: var_or("PAYMENT_API_BASE", "https://api.razorpay.com")
                    .trim_end_matches('/')
                    .to_string(),
                key_id: Self::require_secret("PAYMENT_KEY_ID", &environment)?,
                key_secret: Self::require_secret("PAYMENT_KEY_SECRET", &environment)?,
                currency: var_or("PAYMENT_CURRENCY", "INR"),
            },
            reviews_api_url: optional_var("REVIEWS_API_URL"),
            environment,
        })
    }
}
