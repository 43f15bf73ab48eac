use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::errors::EventError;
use crate::models::event::Event;
use crate::models::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    Pending,
    Joined,
    Skipped,
}

impl ParticipationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Pending => "pending",
            ParticipationStatus::Joined => "joined",
            ParticipationStatus::Skipped => "skipped",
        }
    }

    /// Whether this status occupies a counted slot on the event.
    pub fn holds_slot(&self) -> bool {
        matches!(self, ParticipationStatus::Joined)
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipationStatus {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ParticipationStatus::Pending),
            "joined" => Ok(ParticipationStatus::Joined),
            "skipped" => Ok(ParticipationStatus::Skipped),
            other => Err(EventError::Validation(format!(
                "Unknown participation status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    pub id: Uuid,
    pub user: UserSummary,
    pub event: Event,
    pub status: ParticipationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

impl JoinOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            JoinOutcome::Joined => "Successfully joined event",
            JoinOutcome::AlreadyJoined => "Already joined this event",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    Skipped,
}

impl SkipOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SkipOutcome::Skipped => "Event skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl From<JoinOutcome> for MessageResponse {
    fn from(outcome: JoinOutcome) -> Self {
        Self {
            message: outcome.message().to_string(),
        }
    }
}

impl From<SkipOutcome> for MessageResponse {
    fn from(outcome: SkipOutcome) -> Self {
        Self {
            message: outcome.message().to_string(),
        }
    }
}
