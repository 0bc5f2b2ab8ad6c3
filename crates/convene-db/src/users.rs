use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::Database;
use crate::models::{UserPatch, UserRow};

/// Row counts removed alongside a deleted user.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UserTeardown {
    pub sessions: usize,
    pub hosted_events: usize,
    pub enrollments: usize,
}

impl Database {
    /// Insert a user and return its store-assigned id.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        image: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (name, email, password_hash, image) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![name, email, password_hash, image],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE email = ?1", UserRow::COLUMNS);
            Ok(conn.query_row(&sql, [email], UserRow::from_row).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Apply a sparse profile update and refresh the principal snapshot held
    /// by every live session of that user, in one transaction.
    ///
    /// Returns `None` when the user does not exist.
    pub fn update_user(&self, id: i64, patch: &UserPatch) -> Result<Option<UserRow>> {
        self.with_tx(|tx| {
            let Some(current) = query_user_by_id(tx, id)? else {
                return Ok(None);
            };

            let assignments = patch.assignments();
            if assignments.is_empty() {
                return Ok(Some(current));
            }
            assignments.execute(tx, "users", "id", id)?;

            let Some(updated) = query_user_by_id(tx, id)? else {
                return Ok(None);
            };
            let principal = serde_json::to_string(&updated.principal())?;
            tx.execute(
                "UPDATE sessions SET principal = ?1 WHERE user_id = ?2",
                rusqlite::params![principal, id],
            )?;

            Ok(Some(updated))
        })
    }

    /// Remove a user and everything that references it.
    ///
    /// Order matters: sessions first so no session can outlive its
    /// principal, then the user's hosted events (their enrollments, then the
    /// events), then the user's own enrollments, and finally the user row.
    /// Returns `None` when the user does not exist.
    pub fn delete_user(&self, id: i64) -> Result<Option<UserTeardown>> {
        let teardown = self.with_tx(|tx| {
            if query_user_by_id(tx, id)?.is_none() {
                return Ok(None);
            }

            let sessions = tx.execute("DELETE FROM sessions WHERE user_id = ?1", [id])?;

            let mut enrollments = tx.execute(
                "DELETE FROM enrollments
                 WHERE event_id IN (SELECT id FROM events WHERE host_id = ?1)",
                [id],
            )?;
            let hosted_events = tx.execute("DELETE FROM events WHERE host_id = ?1", [id])?;
            enrollments += tx.execute("DELETE FROM enrollments WHERE user_id = ?1", [id])?;

            tx.execute("DELETE FROM users WHERE id = ?1", [id])?;

            Ok(Some(UserTeardown {
                sessions,
                hosted_events,
                enrollments,
            }))
        })?;

        if let Some(t) = &teardown {
            info!(
                "Deleted user {} ({} sessions, {} hosted events, {} enrollments)",
                id, t.sessions, t.hosted_events, t.enrollments
            );
        }
        Ok(teardown)
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", UserRow::COLUMNS);
    Ok(conn.query_row(&sql, [id], UserRow::from_row).optional()?)
}
