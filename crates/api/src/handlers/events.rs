use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use eventdesk_core::{
    catalog::{self, StatusFilter},
    models::event::{
        CreateEventRequest, Event, EventListQuery, StudentEventResponse, UpdateEventRequest,
    },
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    middleware::{
        auth::{CurrentViewer, EventManager},
        error_handling::AppError,
    },
    ApiState,
};

/// Public listing, optionally narrowed by `?status=`.
#[axum::debug_handler]
pub async fn list_events(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let filter = StatusFilter::parse(query.status.as_deref());
    let events = state.events.list_events(state.today()).await?;

    Ok(Json(catalog::filter_events(events, filter)))
}

#[axum::debug_handler]
pub async fn create_event(
    State(state): State<Arc<ApiState>>,
    EventManager(admin): EventManager,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    payload.validate()?;

    let event = state
        .events
        .create_event(admin.id, payload, state.today())
        .await?;
    info!("Admin {} created event {}", admin.id, event.id);

    Ok((StatusCode::CREATED, Json(event)))
}

#[axum::debug_handler]
pub async fn get_event(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = state.events.get_event(id, state.today()).await?;
    Ok(Json(event))
}

/// PUT: every field is required.
#[axum::debug_handler]
pub async fn replace_event(
    State(state): State<Arc<ApiState>>,
    EventManager(_admin): EventManager,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<Event>, AppError> {
    payload.validate()?;

    let event = state
        .events
        .update_event(id, UpdateEventRequest::from(payload), state.today())
        .await?;
    Ok(Json(event))
}

/// PATCH: absent fields are left untouched.
#[axum::debug_handler]
pub async fn update_event(
    State(state): State<Arc<ApiState>>,
    EventManager(_admin): EventManager,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    payload.validate()?;

    let event = state.events.update_event(id, payload, state.today()).await?;
    Ok(Json(event))
}

#[axum::debug_handler]
pub async fn delete_event(
    State(state): State<Arc<ApiState>>,
    EventManager(admin): EventManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.events.delete_event(id).await?;
    info!("Admin {} deleted event {}", admin.id, id);

    Ok(StatusCode::NO_CONTENT)
}

/// Every event paired with the caller's participation status.
#[axum::debug_handler]
pub async fn list_student_events(
    State(state): State<Arc<ApiState>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<Json<Vec<StudentEventResponse>>, AppError> {
    let viewer_id = viewer.identity().map(|identity| identity.id);
    let events = state
        .events
        .list_events_for_viewer(viewer_id, state.today())
        .await?;

    Ok(Json(events))
}
