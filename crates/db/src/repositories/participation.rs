use crate::models::DbParticipation;
use eventdesk_core::models::participation::ParticipationStatus;
use eyre::Result;
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

/// Reads the (user, event) participation and locks it until the transaction ends.
pub async fn find_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<Option<DbParticipation>> {
    let participation = sqlx::query_as::<_, DbParticipation>(
        r#"
        SELECT id, user_id, event_id, status, created_at, updated_at
        FROM event_participations
        WHERE user_id = $1 AND event_id = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(participation)
}

/// Inserts a participation. A concurrent insert for the same pair fails with a
/// unique violation, which callers resolve by retrying as an update.
pub async fn create_participation(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
    status: ParticipationStatus,
) -> Result<DbParticipation> {
    let id = Uuid::new_v4();

    let participation = sqlx::query_as::<_, DbParticipation>(
        r#"
        INSERT INTO event_participations (id, user_id, event_id, status)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, event_id, status, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(event_id)
    .bind(status.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(participation)
}

pub async fn update_participation_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: ParticipationStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE event_participations
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// A user's participations, newest first.
pub async fn get_participations_by_user<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<DbParticipation>>
where
    E: Executor<'e, Database = Postgres>,
{
    let participations = sqlx::query_as::<_, DbParticipation>(
        r#"
        SELECT id, user_id, event_id, status, created_at, updated_at
        FROM event_participations
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(participations)
}
