use axum::{
    Extension, Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use convene_db::models::UserPatch;
use convene_types::api::{RegisterRequest, RegisterResponse, UpdateUserRequest, UserSummary};
use convene_types::models::UserProfile;

use crate::error::ApiError;
use crate::guard::authorize;
use crate::identity::Identity;
use crate::state::AppState;
use crate::validate::{MAX_IMAGE_URL, MAX_NAME, Validator};

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".into())
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    let name = v.required_text("name", &req.name, MAX_NAME);
    let email = v.email("email", &req.email);
    v.password("password", &req.password);
    let image = v.url("image", req.image.as_deref(), MAX_IMAGE_URL);
    v.finish()?;

    let id = state
        .credentials
        .register(name.clone(), email.clone(), req.password, image.clone())
        .await?;
    info!("Registered user {}", id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserSummary { name, email, image },
        }),
    ))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = identity.require()?.id;
    let user = state
        .db(move |db| db.get_user_by_id(id))
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user.profile()))
}

/// Sparse update of the caller's own profile.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = identity.require()?.id;
    let Json(req) = payload?;

    let mut v = Validator::new();
    let patch = UserPatch {
        name: req.name.as_deref().map(|name| v.required_text("name", name, MAX_NAME)),
        email: req.email.as_deref().map(|email| v.email("email", email)),
        image: req
            .image
            .map(|image| v.url("image", image.as_deref(), MAX_IMAGE_URL)),
    };
    v.finish()?;

    let user = state
        .db(move |db| db.update_user(id, &patch))
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => ApiError::Conflict("An account with this email already exists".into()),
            other => other,
        })?
        .ok_or_else(user_not_found)?;

    info!("User {} updated their profile", id);
    Ok(Json(user.profile()))
}

/// Delete an account. Only the account itself may do this; its sessions,
/// hosted events and enrollments go with it.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
    path: Result<Path<i64>, PathRejection>,
) -> Result<(StatusCode, CookieJar), ApiError> {
    let principal = identity.require()?.clone();
    let Path(id) = path?;

    let target = state
        .db(move |db| db.get_user_by_id(id))
        .await?
        .ok_or_else(user_not_found)?;
    authorize(&principal, &target).into_result()?;

    state
        .db(move |db| db.delete_user(id))
        .await?
        .ok_or_else(user_not_found)?;

    let jar = jar.add(state.sessions.removal_cookie());
    Ok((StatusCode::NO_CONTENT, jar))
}
