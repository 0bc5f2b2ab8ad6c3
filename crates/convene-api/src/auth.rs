use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use convene_types::api::{LoginRequest, LoginResponse, MessageResponse};
use convene_types::models::Principal;

use crate::error::ApiError;
use crate::identity::Identity;
use crate::sessions::SESSION_COOKIE;
use crate::state::AppState;
use crate::validate::Validator;

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    let email = v.email("email", &req.email);
    if req.password.is_empty() {
        v.reject("password", "must not be empty");
    }
    v.finish()?;

    let principal = state.credentials.verify(&email, &req.password).await?;

    // A fresh id on every login; whatever session the browser held is dropped.
    if let Some(previous) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.destroy(previous.value()).await {
            warn!("Failed to drop previous session on login: {}", e);
        }
    }

    let session = state.sessions.create(&principal).await?;
    info!("User {} logged in", principal.id);

    let jar = jar.add(state.sessions.cookie(&session));
    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".into(),
            user: principal,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let principal = identity.require()?;

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await?;
    }
    info!("User {} logged out", principal.id);

    let jar = jar.add(state.sessions.removal_cookie());
    Ok((
        jar,
        Json(MessageResponse {
            message: "Logout successful".into(),
        }),
    ))
}

pub async fn status(Extension(identity): Extension<Identity>) -> Result<Json<Principal>, ApiError> {
    Ok(Json(identity.require()?.clone()))
}
