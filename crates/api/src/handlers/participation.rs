use axum::{
    extract::{Path, State},
    Json,
};
use eventdesk_core::models::participation::{MessageResponse, Participation};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    middleware::{auth::Authenticated, error_handling::AppError},
    ApiState,
};

#[axum::debug_handler]
pub async fn join_event(
    State(state): State<Arc<ApiState>>,
    Authenticated(identity): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let outcome = state.events.join_event(identity.id, id).await?;
    info!("User {} join on event {}: {:?}", identity.id, id, outcome);

    Ok(Json(outcome.into()))
}

#[axum::debug_handler]
pub async fn skip_event(
    State(state): State<Arc<ApiState>>,
    Authenticated(identity): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let outcome = state.events.skip_event(identity.id, id).await?;
    info!("User {} skipped event {}", identity.id, id);

    Ok(Json(outcome.into()))
}

#[axum::debug_handler]
pub async fn my_participations(
    State(state): State<Arc<ApiState>>,
    Authenticated(identity): Authenticated,
) -> Result<Json<Vec<Participation>>, AppError> {
    let participations = state
        .events
        .participations_for_user(identity.id, state.today())
        .await?;

    Ok(Json(participations))
}
