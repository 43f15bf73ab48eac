use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

/// Prepared statements accept a single command, so each index is its own query.
pub const INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_events_date_time ON events(date, time)",
    "CREATE INDEX IF NOT EXISTS idx_events_created_by ON events(created_by)",
    "CREATE INDEX IF NOT EXISTS idx_event_participations_event_id ON event_participations(event_id)",
    "CREATE INDEX IF NOT EXISTS idx_event_participations_user_id ON event_participations(user_id)",
];

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email VARCHAR(254) NOT NULL UNIQUE,
            first_name VARCHAR(30) NOT NULL,
            last_name VARCHAR(30) NOT NULL,
            student_id VARCHAR(20) NULL,
            user_type VARCHAR(10) NOT NULL DEFAULT 'student',
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_user_type CHECK (user_type IN ('admin', 'student'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create events table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title VARCHAR(200) NOT NULL,
            description TEXT NOT NULL,
            date DATE NOT NULL,
            time TIME NOT NULL,
            location VARCHAR(200) NOT NULL,
            max_participants INTEGER NOT NULL,
            current_participants INTEGER NOT NULL DEFAULT 0,
            category VARCHAR(100) NOT NULL,
            status VARCHAR(10) NOT NULL DEFAULT 'upcoming',
            created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT positive_capacity CHECK (max_participants > 0),
            CONSTRAINT non_negative_participants CHECK (current_participants >= 0),
            CONSTRAINT valid_event_status CHECK (status IN ('upcoming', 'ongoing', 'past'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create event_participations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS event_participations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            event_id UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            status VARCHAR(10) NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT unique_user_event UNIQUE (user_id, event_id),
            CONSTRAINT valid_participation_status CHECK (status IN ('pending', 'joined', 'skipped'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
