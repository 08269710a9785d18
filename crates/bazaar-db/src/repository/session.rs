//! # Session Repository
//!
//! Persistence for the billing session snapshot: a single-row table
//! holding the serialized [`SessionSnapshot`](bazaar_core::SessionSnapshot)
//! blob. Written by the autosave loop and on every checkout; read once at
//! startup to restore an interrupted session.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use bazaar_core::SessionSnapshot;

use crate::error::{DbError, DbResult};

/// Repository for the persisted billing session.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Saves the snapshot, replacing whatever was stored before.
    pub async fn save(&self, snapshot: &SessionSnapshot) -> DbResult<()> {
        let payload = snapshot
            .to_json()
            .map_err(|e| DbError::CorruptRow(e.to_string()))?;

        sqlx::query(
            "INSERT INTO session_state (id, payload, saved_at)
             VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 payload = excluded.payload,
                 saved_at = excluded.saved_at",
        )
        .bind(&payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(bytes = payload.len(), "Session snapshot saved");
        Ok(())
    }

    /// Loads the stored snapshot, applying schema migrations.
    ///
    /// Returns `Ok(None)` when no session was ever saved. A blob that no
    /// longer parses is treated as absent (with a warning) rather than
    /// blocking startup: the operator starts with a fresh session instead
    /// of a dead application.
    pub async fn load(&self) -> DbResult<Option<SessionSnapshot>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM session_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match SessionSnapshot::from_json(&payload) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session snapshot");
                Ok(None)
            }
        }
    }

    /// Deletes the stored snapshot.
    pub async fn clear(&self) -> DbResult<()> {
        sqlx::query("DELETE FROM session_state WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
