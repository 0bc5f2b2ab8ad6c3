pub mod enrollments;
pub mod events;
pub mod migrations;
pub mod models;
pub mod patch;
pub mod sessions;
pub mod users;

use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Transaction};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite store with one writer and a small round-robin pool of read-only
/// connections. WAL mode lets readers run while the writer holds a
/// transaction; readers only ever observe committed state.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run a read-only closure on the next reader connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| anyhow::anyhow!("Reader lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run a single-statement write on the writer connection.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` inside a transaction on the writer connection.
    ///
    /// Commits when `f` returns `Ok`; any error drops the transaction, which
    /// rolls back every statement `f` executed.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e))?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// True when `err` wraps a SQLite UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
    const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _)) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::TempDb;
    use super::*;

    #[test]
    fn failed_transaction_rolls_back_every_statement() {
        let db = TempDb::new();
        let user_id = db.create_user("Ada", "ada@example.com", "hash", None).unwrap();

        let result: Result<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO events (title, slug, host_id) VALUES ('Half', 'half', ?1)",
                [user_id],
            )?;
            anyhow::bail!("enrollment insert failed");
        });
        assert!(result.is_err());

        assert!(db.get_event_by_slug("half").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = TempDb::new();
        db.create_user("Ada", "ada@example.com", "hash", None).unwrap();
        let err = db
            .create_user("Other Ada", "ada@example.com", "hash2", None)
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let err = anyhow::anyhow!("plain failure");
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn readers_see_committed_writes() {
        let db = TempDb::new();
        let id = db.create_user("Ada", "ada@example.com", "hash", None).unwrap();
        for _ in 0..READER_POOL_SIZE {
            assert_eq!(db.get_user_by_id(id).unwrap().unwrap().email, "ada@example.com");
        }
    }
}
