use std::time::Duration;

use tracing::warn;

use convene_api::sessions::SessionRegistry;

/// Background task that deletes expired sessions.
///
/// Lookups already ignore expired rows; this only keeps the table small.
/// Errors are logged and the loop keeps going.
pub async fn run_sweep_loop(sessions: SessionRegistry, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        if let Err(e) = sessions.sweep().await {
            warn!("Session sweep error: {}", e);
        }
    }
}
