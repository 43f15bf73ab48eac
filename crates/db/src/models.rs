use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eventdesk_core::models::{
    event::{Event, EventStatus},
    participation::ParticipationStatus,
    user::{UserSummary, UserType},
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: Option<String>,
    pub user_type: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    pub fn summary(&self) -> Result<UserSummary> {
        Ok(UserSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            user_type: parse_user_type(&self.user_type)?,
            student_id: self.student_id.clone(),
        })
    }
}

/// An events row joined with its creator's public columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbEvent {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub max_participants: i32,
    pub current_participants: i32,
    pub category: String,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator_email: String,
    pub creator_first_name: String,
    pub creator_last_name: String,
    pub creator_student_id: Option<String>,
    pub creator_user_type: String,
}

impl TryFrom<DbEvent> for Event {
    type Error = eyre::Report;

    fn try_from(row: DbEvent) -> Result<Self> {
        let status = row
            .status
            .parse::<EventStatus>()
            .wrap_err_with(|| format!("Corrupt status on event {}", row.id))?;

        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.date,
            time: row.time,
            location: row.location,
            max_participants: row.max_participants,
            current_participants: row.current_participants,
            category: row.category,
            status,
            created_by: UserSummary {
                id: row.created_by,
                first_name: row.creator_first_name,
                last_name: row.creator_last_name,
                email: row.creator_email,
                user_type: parse_user_type(&row.creator_user_type)?,
                student_id: row.creator_student_id,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Capacity columns read under the event row lock.
#[derive(Debug, Clone, FromRow)]
pub struct DbEventCapacity {
    pub id: Uuid,
    pub max_participants: i32,
    pub current_participants: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbEventSchedule {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbParticipation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbParticipation {
    pub fn status(&self) -> Result<ParticipationStatus> {
        self.status
            .parse::<ParticipationStatus>()
            .wrap_err_with(|| format!("Corrupt status on participation {}", self.id))
    }
}

fn parse_user_type(raw: &str) -> Result<UserType> {
    raw.parse::<UserType>()
        .wrap_err_with(|| format!("Corrupt user type: {}", raw))
}
