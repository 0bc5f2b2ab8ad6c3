use axum::{
    Json, Router, middleware,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use crate::identity::resolve_identity;
use crate::state::AppState;
use crate::{auth, enrollments, events, users};

/// Every API route. Identity resolution runs on all of them; handlers that
/// need a caller call `Identity::require`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::status))
        .route(
            "/user",
            post(users::register).get(users::profile).put(users::update_profile),
        )
        .route("/user/{id}", delete(users::delete_account))
        .route(
            "/event",
            post(events::create_event).get(events::list_events).put(events::update_event),
        )
        // Reads address events by slug, deletes by numeric id.
        .route("/event/{key}", get(events::get_event).delete(events::delete_event))
        .route("/user-events", post(enrollments::enroll).get(enrollments::my_events))
        .route("/user-events/{user_id}/{event_id}", delete(enrollments::unenroll))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_identity))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
