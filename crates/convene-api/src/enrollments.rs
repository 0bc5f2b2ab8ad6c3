use axum::{
    Extension, Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
};
use tracing::{debug, info};

use convene_db::enrollments::{EnrollOutcome, UnenrollOutcome};
use convene_types::api::{EnrollRequest, EnrollResponse, EnrolledEvent};
use convene_types::models::Role;

use crate::error::ApiError;
use crate::identity::Identity;
use crate::state::AppState;

/// Enroll the caller as a participant. A `userId` naming anyone else is
/// refused; nobody can sign another user up.
pub async fn enroll(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<EnrollRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EnrollResponse>), ApiError> {
    let user_id = identity.require()?.id;
    let Json(req) = payload?;

    if req.user_id.is_some_and(|requested| requested != user_id) {
        debug!("User {} tried to enroll user {:?}", user_id, req.user_id);
        return Err(ApiError::Forbidden);
    }

    let event_id = req.event_id;
    let outcome = state
        .db(move |db| db.enroll(user_id, event_id, Role::Participant))
        .await?;

    let (status, role, already_enrolled) = match outcome {
        EnrollOutcome::Enrolled => {
            info!("User {} enrolled in event {}", user_id, event_id);
            (StatusCode::CREATED, Role::Participant, false)
        }
        EnrollOutcome::AlreadyEnrolled(role) => (StatusCode::OK, role, true),
        EnrollOutcome::EventNotFound => return Err(ApiError::NotFound("Event not found".into())),
    };

    Ok((
        status,
        Json(EnrollResponse {
            event_id,
            role,
            already_enrolled,
        }),
    ))
}

/// Remove the caller's own enrollment. Idempotent; the host cannot leave.
pub async fn unenroll(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let caller = identity.require()?.id;
    let Path((user_id, event_id)) = path?;

    if user_id != caller {
        return Err(ApiError::Forbidden);
    }

    match state.db(move |db| db.unenroll(user_id, event_id)).await? {
        UnenrollOutcome::Removed => {
            info!("User {} left event {}", user_id, event_id);
            Ok(StatusCode::NO_CONTENT)
        }
        UnenrollOutcome::NotEnrolled => Ok(StatusCode::NO_CONTENT),
        UnenrollOutcome::HostCannotLeave => Err(ApiError::Conflict(
            "The host cannot leave their own event; delete it instead".into(),
        )),
    }
}

pub async fn my_events(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<EnrolledEvent>>, ApiError> {
    let user_id = identity.require()?.id;
    let rows = state.db(move |db| db.user_enrollments(user_id)).await?;

    Ok(Json(
        rows.into_iter()
            .map(|(row, role)| EnrolledEvent {
                event: row.into_event(Some(true)),
                role,
            })
            .collect(),
    ))
}
