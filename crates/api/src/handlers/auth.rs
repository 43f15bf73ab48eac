use axum::{extract::State, http::StatusCode, Json};
use eventdesk_core::{
    access::Identity,
    errors::EventError,
    models::user::{
        AuthResponse, LoginRequest, NewUser, RefreshRequest, RefreshResponse, RegisterRequest,
        UserSummary,
    },
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    middleware::{
        auth::{self, Authenticated},
        error_handling::AppError,
    },
    ApiState,
};

fn auth_response(state: &ApiState, user: UserSummary) -> Result<AuthResponse, AppError> {
    let identity = Identity {
        id: user.id,
        user_type: user.user_type,
    };
    let (access, expires_at) = auth::issue_token(&state.auth, &identity)?;
    let (refresh, refresh_expires_at) = auth::issue_refresh_token(&state.auth, &identity)?;

    Ok(AuthResponse {
        user,
        access,
        expires_at,
        refresh,
        refresh_expires_at,
    })
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.validate()?;

    // Hash before storage
    let password_hash = auth::hash_password(&payload.password)
        .map_err(|e| EventError::Internal(e.into()))?;

    let user = state
        .users
        .create_user(NewUser {
            email: payload.email.trim().to_lowercase(),
            first_name: payload.first_name,
            last_name: payload.last_name,
            student_id: payload.student_id,
            user_type: payload.user_type,
            password_hash,
        })
        .await?;
    info!("Registered {} {}", user.user_type, user.id);

    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || EventError::Authentication("Invalid email or password".to_string());

    let Some(credentials) = state
        .users
        .find_credentials(payload.email.trim().to_lowercase())
        .await?
    else {
        warn!("Login attempt for unknown email");
        return Err(invalid().into());
    };

    let matches = auth::verify_password(&payload.password, &credentials.password_hash)
        .map_err(|e| EventError::Internal(e.into()))?;
    if !matches {
        warn!("Failed login for user {}", credentials.user.id);
        return Err(invalid().into());
    }

    Ok(Json(auth_response(&state, credentials.user)?))
}

#[axum::debug_handler]
pub async fn profile(
    State(state): State<Arc<ApiState>>,
    Authenticated(identity): Authenticated,
) -> Result<Json<UserSummary>, AppError> {
    let user = state
        .users
        .get_user(identity.id)
        .await?
        .ok_or_else(|| EventError::NotFound(format!("User with ID {} not found", identity.id)))?;

    Ok(Json(user))
}

/// Exchanges a refresh token for a new access token.
///
/// The user is looked up again so deleted accounts cannot keep minting
/// tokens, and the new token carries the current user type.
#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let claimed = auth::decode_refresh_token(&state.auth, &payload.refresh)?;

    let Some(user) = state.users.get_user(claimed.id).await? else {
        warn!("Refresh token presented for missing user {}", claimed.id);
        return Err(EventError::Authentication("User account no longer exists".to_string()).into());
    };

    let identity = Identity {
        id: user.id,
        user_type: user.user_type,
    };
    let (access, expires_at) = auth::issue_token(&state.auth, &identity)?;

    Ok(Json(RefreshResponse { access, expires_at }))
}
