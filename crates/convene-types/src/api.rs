use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Event, Principal, Role};

/// Keeps an explicit JSON `null` distinguishable from a missing key.
///
/// Used with `#[serde(default, deserialize_with = "explicit")]` on
/// `Option<Option<T>>` fields: missing key → `None`, `null` → `Some(None)`,
/// value → `Some(Some(v))`.
pub fn explicit<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- Errors --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: Principal,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: UserSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "explicit")]
    pub image: Option<Option<String>>,
}

// -- Events --

/// What the client intends to upload; the server answers with an [`UploadTicket`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaDescriptor {
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub title: String,
    pub thumbnail: Option<MediaDescriptor>,
    pub banner: Option<MediaDescriptor>,
    pub description: Option<String>,
    pub resume: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
}

/// Sparse update. A missing key leaves the column untouched, `null` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    pub id: i64,
    #[serde(default, deserialize_with = "explicit")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub thumbnail: Option<Option<MediaDescriptor>>,
    #[serde(default, deserialize_with = "explicit")]
    pub banner: Option<Option<MediaDescriptor>>,
    #[serde(default, deserialize_with = "explicit")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub resume: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub date: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTicket {
    pub field: String,
    pub upload_url: String,
    pub public_url: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventWriteResponse {
    pub event: Event,
    pub uploads: Vec<UploadTicket>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// -- Enrollments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrollRequest {
    #[serde(alias = "eventId")]
    pub event_id: i64,
    /// Accepted for compatibility with older clients; must be the caller.
    #[serde(default, alias = "userId")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub event_id: i64,
    pub role: Role,
    pub already_enrolled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrolledEvent {
    #[serde(flatten)]
    pub event: Event,
    pub role: Role,
}
