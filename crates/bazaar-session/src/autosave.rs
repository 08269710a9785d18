//! # Session Autosave
//!
//! Periodic persistence of the live billing session. Every tick takes a
//! snapshot (only if something changed) and writes it through the session
//! repository. A failed write is logged and swallowed: autosave is crash
//! insurance, and the next tick retries with fresher state anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bazaar_db::Database;

use crate::state::SessionState;

/// Default autosave cadence.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Handle to a running autosave loop.
pub struct AutosaveHandle {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Stops the loop after one final flush of any unsaved state.
    pub async fn shutdown(self) {
        self.stop.notify_one();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Autosave task did not shut down cleanly");
        }
    }
}

/// Spawns the autosave loop.
pub fn spawn_autosave(
    state: SessionState,
    db: Database,
    interval: Duration,
) -> AutosaveHandle {
    let stop = Arc::new(Notify::new());
    let stop_signal = stop.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh start
        // doesn't write an empty snapshot.
        ticker.tick().await;

        info!(interval_secs = interval.as_secs(), "Autosave loop started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    save_if_dirty(&state, &db).await;
                }
                _ = stop_signal.notified() => {
                    save_if_dirty(&state, &db).await;
                    info!("Autosave loop stopped");
                    break;
                }
            }
        }
    });

    AutosaveHandle { stop, task }
}

async fn save_if_dirty(state: &SessionState, db: &Database) {
    let Some(snapshot) = state.snapshot_if_dirty().await else {
        return;
    };
    match db.sessions().save(&snapshot).await {
        Ok(()) => debug!(cells = snapshot.cells.len(), "Session autosaved"),
        Err(e) => warn!(error = %e, "Session autosave failed"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{Catalog, Product, ProductVariant};
    use bazaar_db::DbConfig;

    fn catalog() -> Catalog {
        Catalog::new(vec![Product {
            id: "p1".into(),
            design_id: "D-1".into(),
            name: "Kurta".into(),
            tax_rate_bps: 500,
            active: true,
            variants: vec![ProductVariant {
                id: "v1".into(),
                label: "S".into(),
                sku: "KUR-S".into(),
                barcode: None,
                price_paise: 10000,
                stock_qty: 10,
            }],
        }])
    }

    #[tokio::test]
    async fn test_autosave_writes_dirty_state() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = SessionState::new(catalog());
        let handle = spawn_autosave(state.clone(), db.clone(), Duration::from_millis(20));

        state
            .with_session_mut(|session, catalog| {
                session.add_customer("A");
                session.set_quantity(catalog, "A", "v1", 3);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = db.sessions().load().await.unwrap().unwrap();
        assert_eq!(snapshot.cells[0].qty, 3);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_idle_session_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = SessionState::new(catalog());
        let handle = spawn_autosave(state.clone(), db.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(db.sessions().load().await.unwrap().is_none());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_state() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = SessionState::new(catalog());
        let handle = spawn_autosave(state.clone(), db.clone(), Duration::from_secs(3600));

        state
            .with_session_mut(|session, catalog| {
                session.add_customer("A");
                session.set_quantity(catalog, "A", "v1", 2);
            })
            .await;

        // The hour-long interval never fires; shutdown must flush.
        handle.shutdown().await;
        let snapshot = db.sessions().load().await.unwrap().unwrap();
        assert_eq!(snapshot.cells[0].qty, 2);
    }
}
