use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::{JsonRejection, PathRejection, QueryRejection}},
    http::StatusCode,
};
use tracing::info;

use convene_db::models::{EventPatch, NewEvent};
use convene_types::api::{
    CreateEventRequest, EventListQuery, EventWriteResponse, MediaDescriptor, UpdateEventRequest, UploadTicket,
};
use convene_types::models::Event;

use crate::error::ApiError;
use crate::guard::authorize;
use crate::identity::Identity;
use crate::media::{MediaField, reserve_upload};
use crate::state::AppState;
use crate::validate::{MAX_DESCRIPTION, MAX_LOCATION, MAX_RESUME, MAX_TITLE, Validator};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

fn event_not_found() -> ApiError {
    ApiError::NotFound("Event not found".into())
}

/// Presign an upload for `media`, recording the ticket. Returns the public
/// URL the column should hold.
fn reserve(
    state: &AppState,
    field: MediaField,
    media: &MediaDescriptor,
    uploads: &mut Vec<UploadTicket>,
) -> Result<String, ApiError> {
    let ticket = reserve_upload(state.media.as_ref(), field, media)?;
    let public_url = ticket.public_url.clone();
    uploads.push(ticket);
    Ok(public_url)
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventWriteResponse>), ApiError> {
    let host_id = identity.require()?.id;
    let Json(req) = payload?;

    let mut v = Validator::new();
    let title = v.required_text("title", &req.title, MAX_TITLE);
    let description = v.optional_text("description", req.description.as_deref(), MAX_DESCRIPTION);
    let resume = v.optional_text("resume", req.resume.as_deref(), MAX_RESUME);
    let location = v.optional_text("location", req.location.as_deref(), MAX_LOCATION);
    let date = v.date("date", req.date.as_deref());
    v.finish()?;

    let mut uploads = Vec::new();
    let thumbnail_url = match &req.thumbnail {
        Some(media) => Some(reserve(&state, MediaField::Thumbnail, media, &mut uploads)?),
        None => None,
    };
    let banner_url = match &req.banner {
        Some(media) => Some(reserve(&state, MediaField::Banner, media, &mut uploads)?),
        None => None,
    };

    let new = NewEvent {
        title,
        host_id,
        thumbnail_url,
        banner_url,
        description,
        resume,
        location,
        date,
    };
    let row = state.db(move |db| db.create_event(&new)).await?;

    Ok((
        StatusCode::CREATED,
        Json(EventWriteResponse {
            event: row.into_event(Some(true)),
            uploads,
        }),
    ))
}

/// Public read. Authenticated callers also learn whether they are enrolled.
pub async fn get_event(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(slug): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let event = match identity.principal() {
        Some(principal) => {
            let viewer = principal.id;
            state
                .db(move |db| db.get_event_for_viewer(&slug, viewer))
                .await?
                .map(|(row, enrolled)| row.into_event(Some(enrolled)))
        }
        None => state
            .db(move |db| db.get_event_by_slug(&slug))
            .await?
            .map(|row| row.into_event(None)),
    };

    event.map(Json).ok_or_else(event_not_found)
}

pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventListQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let Query(q) = query?;
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = q.offset.unwrap_or(0);
    let search = q
        .query
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let rows = state
        .db(move |db| db.list_events(search.as_deref(), limit, offset))
        .await?;
    Ok(Json(rows.into_iter().map(|row| row.into_event(None)).collect()))
}

/// Sparse update, host only.
pub async fn update_event(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Json<EventWriteResponse>, ApiError> {
    let principal = identity.require()?.clone();
    let Json(req) = payload?;
    let id = req.id;

    let mut v = Validator::new();
    let title = match req.title {
        Some(Some(title)) => Some(v.required_text("title", &title, MAX_TITLE)),
        Some(None) => {
            v.reject("title", "must not be null");
            None
        }
        None => None,
    };
    let mut patch = EventPatch {
        title,
        description: req
            .description
            .map(|d| v.optional_text("description", d.as_deref(), MAX_DESCRIPTION)),
        resume: req
            .resume
            .map(|r| v.optional_text("resume", r.as_deref(), MAX_RESUME)),
        location: req
            .location
            .map(|l| v.optional_text("location", l.as_deref(), MAX_LOCATION)),
        date: req.date.map(|d| v.date("date", d.as_deref())),
        ..EventPatch::default()
    };
    v.finish()?;

    let current = state
        .db(move |db| db.get_event(id))
        .await?
        .ok_or_else(event_not_found)?;
    authorize(&principal, &current).into_result()?;

    let mut uploads = Vec::new();
    patch.thumbnail_url = match &req.thumbnail {
        Some(Some(media)) => Some(Some(reserve(&state, MediaField::Thumbnail, media, &mut uploads)?)),
        Some(None) => Some(None),
        None => None,
    };
    patch.banner_url = match &req.banner {
        Some(Some(media)) => Some(Some(reserve(&state, MediaField::Banner, media, &mut uploads)?)),
        Some(None) => Some(None),
        None => None,
    };

    let row = state
        .db(move |db| db.update_event(id, &patch))
        .await?
        .ok_or_else(event_not_found)?;
    info!("Event {} updated by host {}", id, principal.id);

    Ok(Json(EventWriteResponse {
        event: row.into_event(Some(true)),
        uploads,
    }))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let principal = identity.require()?.clone();
    let Path(id) = path?;

    let event = state
        .db(move |db| db.get_event(id))
        .await?
        .ok_or_else(event_not_found)?;
    authorize(&principal, &event).into_result()?;

    if !state.db(move |db| db.delete_event(id)).await? {
        return Err(event_not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
