//! # API Configuration Module
//!
//! This module handles loading and managing configuration for the EventDesk API server.
//! It retrieves configuration values from environment variables and provides defaults
//! where appropriate.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `JWT_SECRET`: Secret used to sign and verify access tokens (required)
//! - `JWT_TTL_HOURS`: Access token lifetime in hours (default: 24)
//! - `JWT_REFRESH_TTL_HOURS`: Refresh token lifetime in hours (default: 168)
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `EVENTS_TIMEZONE`: IANA timezone that defines "today" for event statuses (default: "UTC")

use chrono_tz::Tz;
use eyre::{eyre, Result, WrapErr};
use std::env;
use tracing::Level;

/// Configuration for the EventDesk API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use eventdesk_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Secret for signing access tokens
    pub jwt_secret: String,

    /// Access token lifetime in hours
    pub token_ttl_hours: i64,

    /// Refresh token lifetime in hours
    pub refresh_ttl_hours: i64,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Timezone whose calendar date decides upcoming / ongoing / past
    pub timezone: Tz,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is not set
    /// - `API_PORT` cannot be parsed as a u16
    /// - `EVENTS_TIMEZONE` is not a known IANA timezone
    pub fn from_env() -> Result<Self> {
        // Network settings
        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Database settings
        let database_url = env::var("DATABASE_URL")
            .wrap_err("DATABASE_URL environment variable must be set")?;

        // Logging settings
        let log_level = parse_log_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

        // CORS settings
        let cors_origins = env::var("API_CORS_ORIGINS").ok().map(|origins| {
            origins.split(',').map(|s| s.trim().to_string()).collect()
        });

        // Security settings
        let jwt_secret = env::var("JWT_SECRET")
            .wrap_err("JWT_SECRET environment variable must be set")?;
        let token_ttl_hours = env::var("JWT_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .wrap_err("Invalid JWT_TTL_HOURS value")?;
        let refresh_ttl_hours = env::var("JWT_REFRESH_TTL_HOURS")
            .unwrap_or_else(|_| "168".to_string())
            .parse()
            .wrap_err("Invalid JWT_REFRESH_TTL_HOURS value")?;

        // Performance settings
        let request_timeout = env::var("API_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        // Event calendar
        let timezone = parse_timezone(&env::var("EVENTS_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()))?;

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            jwt_secret,
            token_ttl_hours,
            refresh_ttl_hours,
            request_timeout,
            timezone,
        })
    }

    /// Returns the server address as a string (e.g., "127.0.0.1:8080")
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn parse_log_level(raw: &str) -> Level {
    match raw {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.parse::<Tz>()
        .map_err(|e| eyre!("Invalid EVENTS_TIMEZONE value {}: {}", raw, e))
}
