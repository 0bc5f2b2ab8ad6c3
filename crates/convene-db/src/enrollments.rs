use anyhow::Result;
use rusqlite::OptionalExtension;

use convene_types::models::Role;

use crate::Database;
use crate::events::query_event_by_id;
use crate::models::{EnrollmentRow, EventRow, role_at};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled,
    /// A row already existed; carries the role it holds.
    AlreadyEnrolled(Role),
    EventNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnenrollOutcome {
    Removed,
    NotEnrolled,
    /// The host row is tied to the event's lifetime and cannot be dropped alone.
    HostCannotLeave,
}

impl Database {
    /// Idempotent: a second call for the same pair reports the existing row
    /// instead of inserting a duplicate.
    pub fn enroll(&self, user_id: i64, event_id: i64, role: Role) -> Result<EnrollOutcome> {
        self.with_tx(|tx| {
            if query_event_by_id(tx, event_id)?.is_none() {
                return Ok(EnrollOutcome::EventNotFound);
            }

            let inserted = tx.execute(
                "INSERT INTO enrollments (user_id, event_id, role) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, event_id) DO NOTHING",
                rusqlite::params![user_id, event_id, role.as_str()],
            )?;
            if inserted == 1 {
                return Ok(EnrollOutcome::Enrolled);
            }

            let existing = tx.query_row(
                "SELECT role FROM enrollments WHERE user_id = ?1 AND event_id = ?2",
                [user_id, event_id],
                |row| role_at(row, 0),
            )?;
            Ok(EnrollOutcome::AlreadyEnrolled(existing))
        })
    }

    pub fn unenroll(&self, user_id: i64, event_id: i64) -> Result<UnenrollOutcome> {
        self.with_tx(|tx| {
            let role = tx
                .query_row(
                    "SELECT role FROM enrollments WHERE user_id = ?1 AND event_id = ?2",
                    [user_id, event_id],
                    |row| role_at(row, 0),
                )
                .optional()?;

            match role {
                None => Ok(UnenrollOutcome::NotEnrolled),
                Some(Role::Host) => Ok(UnenrollOutcome::HostCannotLeave),
                Some(Role::Participant) => {
                    tx.execute(
                        "DELETE FROM enrollments WHERE user_id = ?1 AND event_id = ?2",
                        [user_id, event_id],
                    )?;
                    Ok(UnenrollOutcome::Removed)
                }
            }
        })
    }

    /// Every event `user_id` is enrolled in, with the role held, newest first.
    pub fn user_enrollments(&self, user_id: i64) -> Result<Vec<(EventRow, Role)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, en.role
                 FROM enrollments en
                 JOIN events e ON e.id = en.event_id
                 WHERE en.user_id = ?1
                 ORDER BY e.id DESC",
                EventRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok((EventRow::from_row(row)?, role_at(row, EventRow::WIDTH)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn event_enrollments(&self, event_id: i64) -> Result<Vec<EnrollmentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, event_id, role FROM enrollments WHERE event_id = ?1 ORDER BY user_id",
            )?;
            let rows = stmt
                .query_map([event_id], |row| {
                    Ok(EnrollmentRow {
                        user_id: row.get(0)?,
                        event_id: row.get(1)?,
                        role: role_at(row, 2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
