//! # Shared Session State
//!
//! The mutex-guarded [`Session`] plus the catalog it prices against,
//! shared between command handlers and the autosave loop.
//!
//! ## Dirtiness Tracking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every mutation bumps `generation`.                                     │
//! │                                                                         │
//! │  Autosave tick:                                                         │
//! │    snapshot_if_dirty()                                                  │
//! │      ├── generation == saved_generation → None (skip the write)        │
//! │      └── otherwise → Some(snapshot), saved_generation = generation     │
//! │                                                                         │
//! │  An idle session costs zero database writes.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use bazaar_core::{Catalog, Session, SessionSnapshot};

struct Inner {
    session: Session,
    catalog: Catalog,
    /// Bumped on every mutation.
    generation: u64,
    /// Generation captured by the last snapshot.
    saved_generation: u64,
}

/// Cloneable handle to the one live billing session.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Mutex<Inner>>,
}

/// Exclusive hold on the session for multi-step operations that must
/// appear atomic to the autosave loop and other handlers. May be held
/// across awaits; the checkout commit holds one from order build
/// through persistence to cart teardown.
pub struct SessionGuard<'a> {
    inner: tokio::sync::MutexGuard<'a, Inner>,
}

impl SessionGuard<'_> {
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Mutating access; marks the session dirty for the autosave loop.
    pub fn session_mut(&mut self) -> &mut Session {
        self.inner.generation += 1;
        &mut self.inner.session
    }

    /// Takes a snapshot and marks the state clean, so the autosave loop
    /// does not rewrite what the caller is about to persist.
    pub fn snapshot(&mut self) -> SessionSnapshot {
        self.inner.saved_generation = self.inner.generation;
        self.inner.session.snapshot()
    }
}

impl SessionState {
    /// Fresh session against the given catalog.
    pub fn new(catalog: Catalog) -> Self {
        SessionState {
            inner: Arc::new(Mutex::new(Inner {
                session: Session::new(),
                catalog,
                generation: 0,
                saved_generation: 0,
            })),
        }
    }

    /// Session restored from a persisted snapshot (startup path). Cells
    /// are re-clamped against the given catalog, so a snapshot that
    /// predates a restock or a sale on another terminal can never hold
    /// more than the stock that actually remains.
    pub fn restore(catalog: Catalog, snapshot: SessionSnapshot) -> Self {
        info!(
            customers = snapshot.customer_ids.len(),
            cells = snapshot.cells.len(),
            "Restoring billing session from snapshot"
        );
        SessionState {
            inner: Arc::new(Mutex::new(Inner {
                session: Session::restore(snapshot, &catalog),
                catalog,
                generation: 0,
                saved_generation: 0,
            })),
        }
    }

    /// Locks the session for a multi-step critical section.
    pub async fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            inner: self.inner.lock().await,
        }
    }

    /// Read access to the session and catalog.
    pub async fn with_session<R>(&self, f: impl FnOnce(&Session, &Catalog) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.session, &inner.catalog)
    }

    /// Mutating access; marks the session dirty for the autosave loop.
    pub async fn with_session_mut<R>(&self, f: impl FnOnce(&mut Session, &Catalog) -> R) -> R {
        let mut inner = self.inner.lock().await;
        let result = {
            let Inner {
                session, catalog, ..
            } = &mut *inner;
            f(session, catalog)
        };
        inner.generation += 1;
        result
    }

    /// Replaces the catalog after product management changes (restock,
    /// price edit). Existing grid cells stay; subsequent bounds and
    /// pricing use the new data.
    pub async fn replace_catalog(&self, catalog: Catalog) {
        let mut inner = self.inner.lock().await;
        inner.catalog = catalog;
        inner.generation += 1;
    }

    /// Takes a snapshot only if something changed since the last one.
    pub async fn snapshot_if_dirty(&self) -> Option<SessionSnapshot> {
        let mut inner = self.inner.lock().await;
        if inner.generation == inner.saved_generation {
            return None;
        }
        inner.saved_generation = inner.generation;
        Some(inner.session.snapshot())
    }

    /// Takes a snapshot unconditionally (shutdown path).
    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        inner.saved_generation = inner.generation;
        inner.session.snapshot()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
