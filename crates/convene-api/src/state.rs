use std::sync::Arc;

use tracing::error;

use convene_db::Database;

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::media::MediaStore;
use crate::sessions::SessionRegistry;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub credentials: Credentials,
    pub sessions: SessionRegistry,
    pub media: Arc<dyn MediaStore>,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, sessions: SessionRegistry, media: Arc<dyn MediaStore>) -> AppState {
        Arc::new(Self {
            credentials: Credentials::new(db.clone()),
            db,
            sessions,
            media,
        })
    }

    /// Run a store operation on the blocking pool.
    pub async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        blocking(move || f(&db)).await.map_err(ApiError::from)
    }
}

/// Move synchronous work (SQLite, Argon2) off the async workers.
pub(crate) async fn blocking<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("blocking task failed: {}", e)
    })?
}
