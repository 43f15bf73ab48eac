//! Recomputes and persists every event's status for today's date.
//!
//! Meant to run from cron shortly after midnight in `EVENTS_TIMEZONE`, so
//! stored statuses stay correct even when nobody reads the listing.

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use dotenv::dotenv;
use eventdesk_api::config::{parse_log_level, parse_timezone};
use eventdesk_db::store::{EventStore, PgStore};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let log_level = parse_log_level(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database_url = std::env::var("DATABASE_URL")
        .wrap_err("DATABASE_URL environment variable must be set")?;
    let timezone = parse_timezone(&std::env::var("EVENTS_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()))?;

    let db_pool = eventdesk_db::create_pool(&database_url).await?;
    let store = PgStore::new(db_pool);

    let today = Utc::now().with_timezone(&timezone).date_naive();
    let changes = store.refresh_statuses(today).await?;

    for change in &changes {
        info!(
            "Event {} ({}) moved from {} to {}",
            change.title, change.event_id, change.from, change.to
        );
    }
    info!("Updated status for {} events as of {}", changes.len(), today);

    Ok(())
}
