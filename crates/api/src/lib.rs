//! # EventDesk API
//!
//! The API crate provides the web server for the EventDesk event-management
//! service: event browsing, admin event management, join/skip participation
//! and bearer-token authentication.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into store calls
//! - **Middleware**: Caller identity extraction and error responses
//! - **Config**: Handle environment and application configuration
//!
//! Handlers only see the `EventStore` / `UserStore` traits from
//! `eventdesk-db`, so tests can run the full router against mocks.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Authentication and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use eventdesk_db::store::{EventStore, PgStore, UserStore};
use eyre::Result;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::middleware::auth::AuthSettings;

/// Shared application state that is accessible to all request handlers
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use eventdesk_api::{middleware::auth::AuthSettings, ApiState};
/// use eventdesk_db::store::PgStore;
///
/// # fn example(pool: sqlx::PgPool) {
/// let store = Arc::new(PgStore::new(pool));
/// let state = ApiState {
///     events: store.clone(),
///     users: store,
///     auth: AuthSettings::new("secret", chrono::Duration::hours(24)),
///     timezone: chrono_tz::Tz::UTC,
/// };
/// let app = eventdesk_api::app(Arc::new(state));
/// # }
/// ```
pub struct ApiState {
    pub events: Arc<dyn EventStore>,
    pub users: Arc<dyn UserStore>,
    pub auth: AuthSettings,
    /// Zone whose calendar date counts as "today" for event statuses
    pub timezone: Tz,
}

impl ApiState {
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

/// Builds the router with every endpoint, without server-level layers.
pub fn app(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Registration, login and profile
        .merge(routes::auth::routes())
        // Event management and participation
        .merge(routes::events::routes())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_origin(allowed)
        .allow_credentials(true)
}

/// Starts the API server with the provided configuration and database connection
///
/// Installs the tracing subscriber, wires `PgStore` behind the store traits,
/// applies CORS, request tracing and the request timeout, then serves until
/// the listener fails.
pub async fn start_server(config: config::ApiConfig, db_pool: PgPool) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = Arc::new(PgStore::new(db_pool));
    let state = Arc::new(ApiState {
        events: store.clone(),
        users: store,
        auth: AuthSettings::new(
            config.jwt_secret.clone(),
            chrono::Duration::hours(config.token_ttl_hours),
        )
        .with_refresh_ttl(chrono::Duration::hours(config.refresh_ttl_hours)),
        timezone: config.timezone,
    });

    let app = app(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Server listening on http://{} (events timezone {})",
        addr, config.timezone
    );
    axum::serve(listener, app).await?;

    Ok(())
}
