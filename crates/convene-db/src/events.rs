use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use convene_types::models::Role;
use convene_types::slug::{slugify, with_suffix};

use crate::Database;
use crate::models::{EventPatch, EventRow, NewEvent};

/// Upper bound on `-N` suffixes tried before giving up on a slug.
const MAX_SLUG_ATTEMPTS: u32 = 1000;

impl Database {
    /// Insert an event and its host enrollment row as one unit.
    pub fn create_event(&self, new: &NewEvent) -> Result<EventRow> {
        let event = self.with_tx(|tx| {
            let slug = unique_slug(tx, &slugify(&new.title), None)?;

            tx.execute(
                "INSERT INTO events
                    (title, slug, thumbnail_url, banner_url, host_id, description, resume, location, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    new.title,
                    slug,
                    new.thumbnail_url,
                    new.banner_url,
                    new.host_id,
                    new.description,
                    new.resume,
                    new.location,
                    new.date,
                ],
            )?;
            let event_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO enrollments (user_id, event_id, role) VALUES (?1, ?2, ?3)",
                rusqlite::params![new.host_id, event_id, Role::Host.as_str()],
            )?;

            match query_event_by_id(tx, event_id)? {
                Some(row) => Ok(row),
                None => bail!("Event {} vanished inside its own transaction", event_id),
            }
        })?;

        info!("Event {} ({}) created by user {}", event.id, event.slug, event.host_id);
        Ok(event)
    }

    pub fn get_event(&self, id: i64) -> Result<Option<EventRow>> {
        self.with_conn(|conn| query_event_by_id(conn, id))
    }

    pub fn get_event_by_slug(&self, slug: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM events e WHERE e.slug = ?1", EventRow::COLUMNS);
            Ok(conn.query_row(&sql, [slug], EventRow::from_row).optional()?)
        })
    }

    /// Event by slug plus whether `viewer_id` holds any enrollment in it.
    pub fn get_event_for_viewer(&self, slug: &str, viewer_id: i64) -> Result<Option<(EventRow, bool)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, en.user_id IS NOT NULL
                 FROM events e
                 LEFT JOIN enrollments en ON en.event_id = e.id AND en.user_id = ?2
                 WHERE e.slug = ?1",
                EventRow::COLUMNS
            );
            let row = conn
                .query_row(&sql, rusqlite::params![slug, viewer_id], |row| {
                    Ok((EventRow::from_row(row)?, row.get::<_, bool>(EventRow::WIDTH)?))
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Events whose title contains `search` (case-insensitive), newest first.
    pub fn list_events(&self, search: Option<&str>, limit: u32, offset: u32) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let pattern = search.map(|s| format!("%{}%", escape_like(s)));
            let sql = format!(
                "SELECT {} FROM events e
                 WHERE ?1 IS NULL OR e.title LIKE ?1 ESCAPE '\\'
                 ORDER BY e.id DESC
                 LIMIT ?2 OFFSET ?3",
                EventRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![pattern, limit, offset], EventRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Apply a sparse update. A new title regenerates the slug in the same
    /// statement. Returns `None` when the event does not exist.
    pub fn update_event(&self, id: i64, patch: &EventPatch) -> Result<Option<EventRow>> {
        self.with_tx(|tx| {
            let Some(current) = query_event_by_id(tx, id)? else {
                return Ok(None);
            };

            let slug = match &patch.title {
                Some(title) if *title != current.title => {
                    let base = slugify(title);
                    Some(unique_slug(tx, &base, Some(id))?)
                }
                _ => None,
            };

            let assignments = patch.assignments(slug);
            if assignments.is_empty() {
                return Ok(Some(current));
            }
            assignments.execute(tx, "events", "id", id)?;

            query_event_by_id(tx, id)
        })
    }

    /// Delete an event and every enrollment row pointing at it.
    /// Returns `false` when there was nothing to delete.
    pub fn delete_event(&self, id: i64) -> Result<bool> {
        let deleted = self.with_tx(|tx| {
            let enrollments = tx.execute("DELETE FROM enrollments WHERE event_id = ?1", [id])?;
            let events = tx.execute("DELETE FROM events WHERE id = ?1", [id])?;
            if events > 0 {
                info!("Deleted event {} and {} enrollment rows", id, enrollments);
            }
            Ok(events > 0)
        })?;
        Ok(deleted)
    }
}

pub(crate) fn query_event_by_id(conn: &Connection, id: i64) -> Result<Option<EventRow>> {
    let sql = format!("SELECT {} FROM events e WHERE e.id = ?1", EventRow::COLUMNS);
    Ok(conn.query_row(&sql, [id], EventRow::from_row).optional()?)
}

/// First free slug among `base`, `base-2`, `base-3`, ... ignoring `exclude_id`.
fn unique_slug(conn: &Connection, base: &str, exclude_id: Option<i64>) -> Result<String> {
    let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM events WHERE slug = ?1 AND id IS NOT ?2)")?;
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = with_suffix(base, attempt);
        let taken: bool = stmt.query_row(rusqlite::params![candidate, exclude_id], |r| r.get(0))?;
        if !taken {
            return Ok(candidate);
        }
    }
    bail!("No free slug for '{}' after {} attempts", base, MAX_SLUG_ATTEMPTS)
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
