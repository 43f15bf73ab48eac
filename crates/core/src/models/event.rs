use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::errors::EventError;
use crate::models::participation::ParticipationStatus;
use crate::models::user::UserSummary;

/// Temporal classification of an event relative to the current date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Past,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Past => "past",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(EventStatus::Upcoming),
            "ongoing" => Ok(EventStatus::Ongoing),
            "past" => Ok(EventStatus::Past),
            other => Err(EventError::Validation(format!("Unknown event status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub max_participants: i32,
    pub current_participants: i32,
    pub category: String,
    pub status: EventStatus,
    pub created_by: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub max_participants: i32,
    pub category: String,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), EventError> {
        require_text("title", &self.title)?;
        require_text("location", &self.location)?;
        require_text("category", &self.category)?;
        require_capacity(self.max_participants)
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location: Option<String>,
    pub max_participants: Option<i32>,
    pub category: Option<String>,
}

impl UpdateEventRequest {
    pub fn validate(&self) -> Result<(), EventError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(location) = &self.location {
            require_text("location", location)?;
        }
        if let Some(category) = &self.category {
            require_text("category", category)?;
        }
        if let Some(max) = self.max_participants {
            require_capacity(max)?;
        }
        Ok(())
    }
}

impl From<CreateEventRequest> for UpdateEventRequest {
    fn from(request: CreateEventRequest) -> Self {
        Self {
            title: Some(request.title),
            description: Some(request.description),
            date: Some(request.date),
            time: Some(request.time),
            location: Some(request.location),
            max_participants: Some(request.max_participants),
            category: Some(request.category),
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), EventError> {
    if value.trim().is_empty() {
        return Err(EventError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_capacity(max_participants: i32) -> Result<(), EventError> {
    if max_participants < 1 {
        return Err(EventError::Validation(
            "max_participants must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListQuery {
    pub status: Option<String>,
}

/// An event as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentEventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub user_participation_status: ParticipationStatus,
}

/// A persisted status change produced by a refresh pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub event_id: Uuid,
    pub title: String,
    pub from: EventStatus,
    pub to: EventStatus,
}
