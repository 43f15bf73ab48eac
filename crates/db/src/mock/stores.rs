use async_trait::async_trait;
use chrono::NaiveDate;
use eventdesk_core::{
    errors::EventResult,
    models::{
        event::{
            CreateEventRequest, Event, StatusChange, StudentEventResponse, UpdateEventRequest,
        },
        participation::{JoinOutcome, Participation, SkipOutcome},
        user::{NewUser, UserCredentials, UserSummary},
    },
};
use mockall::mock;
use uuid::Uuid;

use crate::store::{EventStore, UserStore};

// Mock stores for testing
mock! {
    pub EventStore {}

    #[async_trait]
    impl EventStore for EventStore {
        async fn list_events(&self, today: NaiveDate) -> EventResult<Vec<Event>>;

        async fn get_event(&self, id: Uuid, today: NaiveDate) -> EventResult<Event>;

        async fn create_event(
            &self,
            created_by: Uuid,
            request: CreateEventRequest,
            today: NaiveDate,
        ) -> EventResult<Event>;

        async fn update_event(
            &self,
            id: Uuid,
            changes: UpdateEventRequest,
            today: NaiveDate,
        ) -> EventResult<Event>;

        async fn delete_event(&self, id: Uuid) -> EventResult<()>;

        async fn refresh_statuses(&self, today: NaiveDate) -> EventResult<Vec<StatusChange>>;

        async fn join_event(&self, user_id: Uuid, event_id: Uuid) -> EventResult<JoinOutcome>;

        async fn skip_event(&self, user_id: Uuid, event_id: Uuid) -> EventResult<SkipOutcome>;

        async fn participations_for_user(
            &self,
            user_id: Uuid,
            today: NaiveDate,
        ) -> EventResult<Vec<Participation>>;

        async fn list_events_for_viewer(
            &self,
            viewer: Option<Uuid>,
            today: NaiveDate,
        ) -> EventResult<Vec<StudentEventResponse>>;

        async fn ping(&self) -> EventResult<()>;
    }
}

mock! {
    pub UserStore {}

    #[async_trait]
    impl UserStore for UserStore {
        async fn create_user(&self, user: NewUser) -> EventResult<UserSummary>;

        async fn get_user(&self, id: Uuid) -> EventResult<Option<UserSummary>>;

        async fn find_credentials(&self, email: String) -> EventResult<Option<UserCredentials>>;
    }
}
