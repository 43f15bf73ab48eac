use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/auth/register/", post(handlers::auth::register))
        .route("/api/auth/login/", post(handlers::auth::login))
        .route("/api/auth/profile/", get(handlers::auth::profile))
        .route("/api/auth/token/refresh/", post(handlers::auth::refresh_token))
}
