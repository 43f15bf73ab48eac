use crate::models::DbUser;
use eventdesk_core::models::user::NewUser;
use eyre::Result;
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, first_name, last_name, student_id, user_type, password_hash, created_at, updated_at";

pub async fn create_user<'e, E>(executor: E, user: &NewUser) -> Result<DbUser>
where
    E: Executor<'e, Database = Postgres>,
{
    let id = Uuid::new_v4();

    tracing::debug!(
        "Creating user: id={}, email={}, user_type={}",
        id, user.email, user.user_type
    );

    let sql = format!(
        r#"
        INSERT INTO users (id, email, first_name, last_name, student_id, user_type, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {USER_COLUMNS}
        "#
    );

    let db_user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.student_id.as_deref())
        .bind(user.user_type.as_str())
        .bind(&user.password_hash)
        .fetch_one(executor)
        .await?;

    Ok(db_user)
}

pub async fn get_user_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<DbUser>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

    let db_user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(db_user)
}

pub async fn get_user_by_email<'e, E>(executor: E, email: &str) -> Result<Option<DbUser>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");

    let db_user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(email)
        .fetch_optional(executor)
        .await?;

    Ok(db_user)
}

/// True when the user exists. The row is share-locked until the transaction
/// ends, so it cannot be deleted underneath rows that reference it.
pub async fn lock_user(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR SHARE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(found.is_some())
}
