//! Row types. These map directly to SQLite rows and stay separate from the
//! convene-types wire models so the store layer owns its own shapes.

use convene_types::models::{Event, Principal, Role, UserProfile};
use rusqlite::Row;
use rusqlite::types::Type;

pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub(crate) const COLUMNS: &'static str = "id, name, email, password_hash, image, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            image: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            image: self.image.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub thumbnail_url: Option<String>,
    pub banner_url: Option<String>,
    pub host_id: i64,
    pub description: Option<String>,
    pub resume: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub created_at: String,
}

impl EventRow {
    pub(crate) const COLUMNS: &'static str = "e.id, e.title, e.slug, e.thumbnail_url, e.banner_url, e.host_id, \
         e.description, e.resume, e.location, e.date, e.created_at";
    pub(crate) const WIDTH: usize = 11;

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            thumbnail_url: row.get(3)?,
            banner_url: row.get(4)?,
            host_id: row.get(5)?,
            description: row.get(6)?,
            resume: row.get(7)?,
            location: row.get(8)?,
            date: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    /// Wire representation. `is_enrolled` is `None` for anonymous viewers.
    pub fn into_event(self, is_enrolled: Option<bool>) -> Event {
        Event {
            id: self.id,
            title: self.title,
            slug: self.slug,
            thumbnail_url: self.thumbnail_url,
            banner_url: self.banner_url,
            host_id: self.host_id,
            description: self.description,
            resume: self.resume,
            location: self.location,
            date: self.date,
            is_enrolled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRow {
    pub user_id: i64,
    pub event_id: i64,
    pub role: Role,
}

pub(crate) fn role_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Role> {
    let raw: String = row.get(idx)?;
    raw.parse::<Role>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Fields for a new event. The slug is derived by the store.
pub struct NewEvent {
    pub title: String,
    pub host_id: i64,
    pub thumbnail_url: Option<String>,
    pub banner_url: Option<String>,
    pub description: Option<String>,
    pub resume: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
}

/// Sparse event update. `None` leaves a column untouched; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Default, Clone)]
pub struct EventPatch {
    pub title: Option<String>,
    pub thumbnail_url: Option<Option<String>>,
    pub banner_url: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub resume: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub date: Option<Option<String>>,
}

/// Sparse profile update.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<Option<String>>,
}
