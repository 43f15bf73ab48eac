use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::errors::EventError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    #[default]
    Student,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Admin => "admin",
            UserType::Student => "student",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserType::Admin),
            "student" => Ok(UserType::Student),
            other => Err(EventError::Validation(format!("Unknown user type: {}", other))),
        }
    }
}

/// Public view of a user, embedded in events and participations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_type: UserType,
    pub student_id: Option<String>,
}

/// A user row about to be inserted. The password is already hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: Option<String>,
    pub user_type: UserType,
    pub password_hash: String,
}

/// Stored login material for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCredentials {
    pub user: UserSummary,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), EventError> {
        if !self.email.contains('@') {
            return Err(EventError::Validation("A valid email is required".to_string()));
        }
        if self.password.len() < 8 {
            return Err(EventError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        if self.password != self.password_confirm {
            return Err(EventError::Validation("Passwords do not match".to_string()));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(EventError::Validation(
                "First and last name are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub access: String,
    pub expires_at: DateTime<Utc>,
    pub refresh: String,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// A new access token minted from a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    pub expires_at: DateTime<Utc>,
}
