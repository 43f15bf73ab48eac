use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/events/",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/api/events/student/",
            get(handlers::events::list_student_events),
        )
        .route(
            "/api/events/my-participations/",
            get(handlers::participation::my_participations),
        )
        .route(
            "/api/events/:id/",
            get(handlers::events::get_event)
                .put(handlers::events::replace_event)
                .patch(handlers::events::update_event)
                .delete(handlers::events::delete_event),
        )
        .route("/api/events/:id/join/", post(handlers::participation::join_event))
        .route("/api/events/:id/skip/", post(handlers::participation::skip_event))
}
