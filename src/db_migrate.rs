use color_eyre::eyre::{Result, WrapErr};
use dotenv::dotenv;
use eventdesk_db::schema::initialize_database;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .wrap_err("DATABASE_URL environment variable must be set")?;

    println!("Connecting to database...");
    let db_pool = eventdesk_db::create_pool(&database_url).await?;

    println!("Creating users, events and event_participations tables...");
    initialize_database(&db_pool).await?;
    println!("Database schema initialized successfully.");

    Ok(())
}
