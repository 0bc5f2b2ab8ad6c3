use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use convene_types::models::Principal;

use crate::Database;

impl Database {
    pub fn insert_session(
        &self,
        id_hash: &str,
        principal: &Principal,
        created_at: i64,
        expires_at: i64,
    ) -> Result<()> {
        let payload = serde_json::to_string(principal)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id_hash, user_id, principal, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id_hash, principal.id, payload, created_at, expires_at],
            )?;
            Ok(())
        })
    }

    /// Resolve a live session on a reader connection. Sessions already past
    /// `now` resolve to `None` even before the sweep has removed them.
    ///
    /// The expiry only slides to `new_expires_at` when that moves it forward
    /// by more than `slack` seconds, so most lookups never touch the writer.
    pub fn resolve_session(
        &self,
        id_hash: &str,
        now: i64,
        new_expires_at: i64,
        slack: i64,
    ) -> Result<Option<Principal>> {
        let found: Option<(String, i64)> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT principal, expires_at FROM sessions WHERE id_hash = ?1 AND expires_at > ?2",
                    rusqlite::params![id_hash, now],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        })?;
        let Some((payload, expires_at)) = found else {
            return Ok(None);
        };

        if new_expires_at - expires_at > slack {
            self.with_conn_mut(|conn| {
                conn.execute(
                    "UPDATE sessions SET expires_at = MAX(expires_at, ?2) WHERE id_hash = ?1",
                    rusqlite::params![id_hash, new_expires_at],
                )?;
                Ok(())
            })?;
        }

        let principal = serde_json::from_str(&payload).context("Corrupt session principal")?;
        Ok(Some(principal))
    }

    #[cfg(test)]
    pub(crate) fn session_expiry(&self, id_hash: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT expires_at FROM sessions WHERE id_hash = ?1", [id_hash], |row| row.get(0))
                .optional()?)
        })
    }

    /// Returns the number of rows removed (0 or 1).
    pub fn delete_session(&self, id_hash: &str) -> Result<usize> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM sessions WHERE id_hash = ?1", [id_hash])?))
    }

    pub fn purge_expired_sessions(&self, now: i64) -> Result<usize> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::TempDb;

    use super::*;

    fn principal(db: &Database) -> Principal {
        let id = db.create_user("Ada", "ada@example.com", "hash", None).unwrap();
        db.get_user_by_id(id).unwrap().unwrap().principal()
    }

    #[test]
    fn resolve_slides_expiry_for_live_sessions() {
        let db = TempDb::new();
        let p = principal(&db);
        db.insert_session("abc", &p, 100, 200).unwrap();

        assert_eq!(db.resolve_session("abc", 150, 250, 0).unwrap(), Some(p.clone()));
        assert_eq!(db.session_expiry("abc").unwrap(), Some(250));
        // expiry moved to 250, so 220 is still live
        assert_eq!(db.resolve_session("abc", 220, 320, 0).unwrap(), Some(p));
    }

    #[test]
    fn resolve_skips_the_write_within_slack() {
        let db = TempDb::new();
        let p = principal(&db);
        db.insert_session("abc", &p, 0, 1000).unwrap();

        assert!(db.resolve_session("abc", 100, 1100, 300).unwrap().is_some());
        assert_eq!(db.session_expiry("abc").unwrap(), Some(1000));

        assert!(db.resolve_session("abc", 500, 1500, 300).unwrap().is_some());
        assert_eq!(db.session_expiry("abc").unwrap(), Some(1500));
    }

    #[test]
    fn resolve_never_shortens_expiry() {
        let db = TempDb::new();
        let p = principal(&db);
        db.insert_session("abc", &p, 0, 1000).unwrap();

        assert!(db.resolve_session("abc", 100, 400, -1000).unwrap().is_some());
        assert_eq!(db.session_expiry("abc").unwrap(), Some(1000));
    }

    #[test]
    fn expired_sessions_do_not_resolve_and_are_purged() {
        let db = TempDb::new();
        let p = principal(&db);
        db.insert_session("old", &p, 0, 100).unwrap();
        db.insert_session("new", &p, 0, 1000).unwrap();

        assert!(db.resolve_session("old", 100, 200, 0).unwrap().is_none());
        assert_eq!(db.purge_expired_sessions(100).unwrap(), 1);
        assert_eq!(db.purge_expired_sessions(100).unwrap(), 0);
        assert!(db.resolve_session("new", 100, 200, 0).unwrap().is_some());
    }

    #[test]
    fn delete_is_idempotent() {
        let db = TempDb::new();
        let p = principal(&db);
        db.insert_session("s", &p, 0, 100).unwrap();
        assert_eq!(db.delete_session("s").unwrap(), 1);
        assert_eq!(db.delete_session("s").unwrap(), 0);
        assert!(db.resolve_session("s", 1, 100, 0).unwrap().is_none());
    }
}
