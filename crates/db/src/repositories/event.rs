use crate::models::{DbEvent, DbEventCapacity, DbEventSchedule};
use chrono::NaiveDate;
use eventdesk_core::{
    clock,
    models::event::{CreateEventRequest, EventStatus, StatusChange, UpdateEventRequest},
};
use eyre::{Result, WrapErr};
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

/// Event columns joined with the creator summary, ready for `DbEvent`.
const EVENT_SELECT: &str = r#"
    SELECT e.id, e.title, e.description, e.date, e.time, e.location,
           e.max_participants, e.current_participants, e.category, e.status,
           e.created_by, e.created_at, e.updated_at,
           u.email AS creator_email, u.first_name AS creator_first_name,
           u.last_name AS creator_last_name, u.student_id AS creator_student_id,
           u.user_type AS creator_user_type
    FROM events e
    JOIN users u ON u.id = e.created_by
"#;

pub async fn create_event<'e, E>(
    executor: E,
    created_by: Uuid,
    request: &CreateEventRequest,
    status: EventStatus,
) -> Result<Uuid>
where
    E: Executor<'e, Database = Postgres>,
{
    let id = Uuid::new_v4();

    tracing::debug!(
        "Creating event: id={}, title={}, date={}, status={}",
        id, request.title, request.date, status
    );

    sqlx::query(
        r#"
        INSERT INTO events (id, title, description, date, time, location,
                            max_participants, current_participants, category, status, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10)
        "#,
    )
    .bind(id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.date)
    .bind(request.time)
    .bind(&request.location)
    .bind(request.max_participants)
    .bind(&request.category)
    .bind(status.as_str())
    .bind(created_by)
    .execute(executor)
    .await?;

    Ok(id)
}

pub async fn get_event_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<DbEvent>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("{EVENT_SELECT} WHERE e.id = $1");

    let event = sqlx::query_as::<_, DbEvent>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(event)
}

/// All events ordered by date then time.
pub async fn list_events<'e, E>(executor: E) -> Result<Vec<DbEvent>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("{EVENT_SELECT} ORDER BY e.date ASC, e.time ASC");

    let events = sqlx::query_as::<_, DbEvent>(&sql)
        .fetch_all(executor)
        .await?;

    Ok(events)
}

pub async fn get_events_by_ids<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<DbEvent>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("{EVENT_SELECT} WHERE e.id = ANY($1)");

    let events = sqlx::query_as::<_, DbEvent>(&sql)
        .bind(ids)
        .fetch_all(executor)
        .await?;

    Ok(events)
}

/// Applies the present fields of `changes`. Returns false when the event does not exist.
pub async fn update_event<'e, E>(executor: E, id: Uuid, changes: &UpdateEventRequest) -> Result<bool>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE events
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            date = COALESCE($4, date),
            time = COALESCE($5, time),
            location = COALESCE($6, location),
            max_participants = COALESCE($7, max_participants),
            category = COALESCE($8, category),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(changes.title.as_deref())
    .bind(changes.description.as_deref())
    .bind(changes.date)
    .bind(changes.time)
    .bind(changes.location.as_deref())
    .bind(changes.max_participants)
    .bind(changes.category.as_deref())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes an event and, by cascade, its participations.
pub async fn delete_event<'e, E>(executor: E, id: Uuid) -> Result<bool>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Reads the capacity columns and holds the row lock until the transaction ends.
pub async fn lock_event_capacity(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<DbEventCapacity>> {
    let capacity = sqlx::query_as::<_, DbEventCapacity>(
        r#"
        SELECT id, max_participants, current_participants
        FROM events
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(capacity)
}

pub async fn set_participant_count(conn: &mut PgConnection, id: Uuid, count: i32) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE events
        SET current_participants = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(count)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes `status` unless another writer already changed it away from `expected`.
pub async fn update_status<'e, E>(
    executor: E,
    id: Uuid,
    expected: &str,
    status: EventStatus,
) -> Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE events
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(id)
    .bind(expected)
    .bind(status.as_str())
    .execute(executor)
    .await?;

    Ok(())
}

/// Recomputes every event's status for `today`, writing only the rows that changed.
pub async fn refresh_statuses(conn: &mut PgConnection, today: NaiveDate) -> Result<Vec<StatusChange>> {
    let schedules = sqlx::query_as::<_, DbEventSchedule>(
        "SELECT id, title, date, status FROM events",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut changes = Vec::new();
    for schedule in schedules {
        let stored = schedule
            .status
            .parse::<EventStatus>()
            .wrap_err_with(|| format!("Corrupt status on event {}", schedule.id))?;

        if let Some(fresh) = clock::status_change(stored, schedule.date, today) {
            update_status(&mut *conn, schedule.id, &schedule.status, fresh).await?;
            changes.push(StatusChange {
                event_id: schedule.id,
                title: schedule.title,
                from: stored,
                to: fresh,
            });
        }
    }

    if !changes.is_empty() {
        tracing::debug!("Refreshed {} event statuses for {}", changes.len(), today);
    }

    Ok(changes)
}
