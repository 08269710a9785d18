//! # Bazaar Session
//!
//! Orchestration layer for Bazaar POS: owns the live billing session,
//! drives checkout across core and database, and keeps the session
//! durable via periodic autosave.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         bazaar-session                                  │
//! │                                                                         │
//! │  state ──────── SessionState: Mutex<Session + Catalog>, dirtiness      │
//! │  checkout ───── CheckoutService: preview / commit / teardown           │
//! │  autosave ───── 5s tick, snapshot-if-dirty, warn-and-continue          │
//! │  error ──────── PosError: CoreError + DbError under one surface        │
//! │                                                                         │
//! │  Startup: Database::new → load_catalog → sessions().load              │
//! │           → SessionState::restore (or ::new) → spawn_autosave          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod autosave;
pub mod checkout;
pub mod error;
pub mod state;

pub use autosave::{spawn_autosave, AutosaveHandle, AUTOSAVE_INTERVAL};
pub use checkout::CheckoutService;
pub use error::{PosError, PosResult};
pub use state::{SessionGuard, SessionState};

use tracing::info;
use tracing_subscriber::EnvFilter;

use bazaar_db::Database;

/// Initializes structured logging. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Builds the session state at startup: loads the catalog, restores the
/// persisted session if one exists, otherwise starts fresh.
pub async fn bootstrap(db: &Database) -> PosResult<SessionState> {
    let catalog = db.catalog().load_catalog().await?;
    let state = match db.sessions().load().await? {
        Some(snapshot) => SessionState::restore(catalog, snapshot),
        None => {
            info!("No persisted session, starting fresh");
            SessionState::new(catalog)
        }
    };
    Ok(state)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{Money, Product, ProductVariant};
    use bazaar_db::DbConfig;

    #[tokio::test]
    async fn test_bootstrap_restores_persisted_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .upsert_product(&Product {
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
            })
            .await
            .unwrap();

        // First launch: fresh, then the operator builds up a cart.
        let state = bootstrap(&db).await.unwrap();
        state
            .with_session_mut(|session, catalog| {
                session.add_customer("A");
                session.set_quantity(catalog, "A", "v1", 3);
                session.set_advance("A", Money::from_rupees(50)).unwrap();
            })
            .await;
        db.sessions().save(&state.snapshot().await).await.unwrap();

        // Second launch: the cart is back.
        let restored = bootstrap(&db).await.unwrap();
        let (qty, advance) = restored
            .with_session(|session, _| {
                (session.grid().quantity("A", "v1"), session.advance_for("A"))
            })
            .await;
        assert_eq!(qty, 3);
        assert_eq!(advance, Money::from_rupees(50));
    }
}
