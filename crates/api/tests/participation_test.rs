mod test_utils;

use axum::http::{header::AUTHORIZATION, StatusCode};
use chrono::Utc;
use eventdesk_core::{
    errors::EventError,
    models::{
        event::EventStatus,
        participation::{JoinOutcome, MessageResponse, Participation, ParticipationStatus, SkipOutcome},
    },
};
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use test_log::test;
use uuid::Uuid;

use test_utils::{bearer, sample_event, student, summary, TestContext};

#[test(tokio::test)]
async fn test_join_event() {
    let mut ctx = TestContext::new();
    let caller = student();
    let event_id = Uuid::new_v4();
    ctx.events
        .expect_join_event()
        .with(eq(caller.id), eq(event_id))
        .times(1)
        .return_once(|_, _| Ok(JoinOutcome::Joined));

    let response = ctx
        .server()
        .post(&format!("/api/events/{}/join/", event_id))
        .add_header(AUTHORIZATION, bearer(&caller))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<MessageResponse>().message,
        "Successfully joined event"
    );
}

#[test(tokio::test)]
async fn test_join_twice_reports_already_joined() {
    let mut ctx = TestContext::new();
    ctx.events
        .expect_join_event()
        .times(1)
        .return_once(|_, _| Ok(JoinOutcome::AlreadyJoined));

    let response = ctx
        .server()
        .post(&format!("/api/events/{}/join/", Uuid::new_v4()))
        .add_header(AUTHORIZATION, bearer(&student()))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<MessageResponse>().message,
        "Already joined this event"
    );
}

#[test(tokio::test)]
async fn test_join_full_event_is_bad_request() {
    let mut ctx = TestContext::new();
    ctx.events
        .expect_join_event()
        .times(1)
        .return_once(|_, _| Err(EventError::Capacity("Event is full".to_string())));

    let response = ctx
        .server()
        .post(&format!("/api/events/{}/join/", Uuid::new_v4()))
        .add_header(AUTHORIZATION, bearer(&student()))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<serde_json::Value>(),
        serde_json::json!({ "error": "Event is full" })
    );
}

#[test(tokio::test)]
async fn test_join_missing_event() {
    let mut ctx = TestContext::new();
    ctx.events
        .expect_join_event()
        .times(1)
        .return_once(|_, id| Err(EventError::NotFound(format!("Event with ID {} not found", id))));

    let response = ctx
        .server()
        .post(&format!("/api/events/{}/join/", Uuid::new_v4()))
        .add_header(AUTHORIZATION, bearer(&student()))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[test(tokio::test)]
async fn test_join_requires_authentication() {
    let mut ctx = TestContext::new();
    ctx.events.expect_join_event().never();

    let response = ctx
        .server()
        .post(&format!("/api/events/{}/join/", Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[test(tokio::test)]
async fn test_skip_event() {
    let mut ctx = TestContext::new();
    let caller = student();
    let event_id = Uuid::new_v4();
    ctx.events
        .expect_skip_event()
        .with(eq(caller.id), eq(event_id))
        .times(1)
        .return_once(|_, _| Ok(SkipOutcome::Skipped));

    let response = ctx
        .server()
        .post(&format!("/api/events/{}/skip/", event_id))
        .add_header(AUTHORIZATION, bearer(&caller))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<MessageResponse>().message, "Event skipped");
}

#[test(tokio::test)]
async fn test_skip_requires_authentication() {
    let mut ctx = TestContext::new();
    ctx.events.expect_skip_event().never();

    let response = ctx
        .server()
        .post(&format!("/api/events/{}/skip/", Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[test(tokio::test)]
async fn test_my_participations() {
    let mut ctx = TestContext::new();
    let caller = student();
    let participation = Participation {
        id: Uuid::new_v4(),
        user: summary(&caller),
        event: sample_event(EventStatus::Upcoming),
        status: ParticipationStatus::Joined,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let expected = vec![participation.clone()];
    ctx.events
        .expect_participations_for_user()
        .withf(move |user_id, _| *user_id == caller.id)
        .times(1)
        .return_once(move |_, _| Ok(vec![participation]));

    let response = ctx
        .server()
        .get("/api/events/my-participations/")
        .add_header(AUTHORIZATION, bearer(&caller))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Vec<Participation>>(), expected);
}

#[test(tokio::test)]
async fn test_my_participations_requires_authentication() {
    let mut ctx = TestContext::new();
    ctx.events.expect_participations_for_user().never();

    let response = ctx.server().get("/api/events/my-participations/").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}
