#![allow(dead_code)]

use std::sync::Arc;

use axum::http::HeaderValue;
use axum_test::TestServer;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use eventdesk_api::{app, middleware::auth::{self, AuthSettings}, ApiState};
use eventdesk_core::{
    access::Identity,
    models::{
        event::{CreateEventRequest, Event, EventStatus},
        user::{UserSummary, UserType},
    },
};
use eventdesk_db::mock::stores::{MockEventStore, MockUserStore};
use fake::{
    faker::{internet::en::SafeEmail, lorem::en::Sentence, name::en::FirstName, name::en::LastName},
    Fake,
};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Mock stores plus the settings needed to mint tokens the server accepts.
pub struct TestContext {
    pub events: MockEventStore,
    pub users: MockUserStore,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            events: MockEventStore::new(),
            users: MockUserStore::new(),
        }
    }

    /// Consumes the configured mocks and serves the full router over them.
    pub fn server(self) -> TestServer {
        let state = Arc::new(ApiState {
            events: Arc::new(self.events),
            users: Arc::new(self.users),
            auth: auth_settings(),
            timezone: chrono_tz::Tz::UTC,
        });

        TestServer::new(app(state)).expect("Failed to build test server")
    }
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings::new(TEST_SECRET, Duration::hours(1))
}

pub fn admin() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        user_type: UserType::Admin,
    }
}

pub fn student() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        user_type: UserType::Student,
    }
}

/// `Authorization` header value for `identity`.
pub fn bearer(identity: &Identity) -> HeaderValue {
    let (token, _) = auth::issue_token(&auth_settings(), identity).expect("Failed to issue token");
    HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid header value")
}

pub fn summary(identity: &Identity) -> UserSummary {
    UserSummary {
        id: identity.id,
        first_name: FirstName().fake(),
        last_name: LastName().fake(),
        email: SafeEmail().fake(),
        user_type: identity.user_type,
        student_id: match identity.user_type {
            UserType::Student => Some("S1024".to_string()),
            UserType::Admin => None,
        },
    }
}

pub fn sample_event(status: EventStatus) -> Event {
    Event {
        id: Uuid::new_v4(),
        title: "Spring Fashion Show".to_string(),
        description: Sentence(3..8).fake(),
        date: NaiveDate::from_ymd_opt(2024, 4, 12).unwrap(),
        time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        location: "Main Auditorium".to_string(),
        max_participants: 200,
        current_participants: 12,
        category: "Fashion".to_string(),
        status,
        created_by: summary(&admin()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn create_request() -> CreateEventRequest {
    CreateEventRequest {
        title: "Wellness Workshop".to_string(),
        description: "Self-care and meditation".to_string(),
        date: NaiveDate::from_ymd_opt(2030, 4, 19).unwrap(),
        time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        location: "Wellness Center".to_string(),
        max_participants: 50,
        category: "Health".to_string(),
    }
}
