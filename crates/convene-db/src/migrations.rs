use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, events, enrollments, sessions)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash   TEXT NOT NULL,
                image           TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- No ON DELETE CASCADE anywhere: dependent rows are removed
            -- explicitly, inside the same transaction, before their parent.
            CREATE TABLE events (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                slug            TEXT NOT NULL UNIQUE,
                thumbnail_url   TEXT,
                banner_url      TEXT,
                host_id         INTEGER NOT NULL REFERENCES users(id),
                description     TEXT,
                resume          TEXT,
                location        TEXT,
                date            TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_events_host ON events(host_id);

            CREATE TABLE enrollments (
                user_id     INTEGER NOT NULL REFERENCES users(id),
                event_id    INTEGER NOT NULL REFERENCES events(id),
                role        TEXT NOT NULL CHECK (role IN ('host', 'participant')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, event_id)
            );

            CREATE INDEX idx_enrollments_event ON enrollments(event_id);

            -- At most one host row per event
            CREATE UNIQUE INDEX idx_enrollments_single_host
                ON enrollments(event_id) WHERE role = 'host';

            -- Sessions are keyed by the SHA-256 of the cookie value, never the value itself.
            -- Timestamps are unix seconds so expiry comparisons stay integer comparisons.
            CREATE TABLE sessions (
                id_hash     TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                principal   TEXT NOT NULL,
                created_at  INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);
            CREATE INDEX idx_sessions_expiry ON sessions(expires_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn second_host_row_for_same_event_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (name, email, password_hash) VALUES ('a', 'a@x.io', 'h'), ('b', 'b@x.io', 'h');
             INSERT INTO events (title, slug, host_id) VALUES ('E', 'e', 1);
             INSERT INTO enrollments (user_id, event_id, role) VALUES (1, 1, 'host');",
        )
        .unwrap();

        let second = conn.execute(
            "INSERT INTO enrollments (user_id, event_id, role) VALUES (2, 1, 'host')",
            [],
        );
        assert!(second.is_err());
    }
}
