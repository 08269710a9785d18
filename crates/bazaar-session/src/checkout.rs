//! # Checkout Service
//!
//! Drives the checkout commit across the session and the database:
//! build the frozen order (pure, in bazaar-core), persist it atomically
//! (bazaar-db), and only then tear the cart down.
//!
//! ## Failure Semantics
//! A persistence failure aborts the commit: no order row, no stock
//! decrement, and the session keeps the cart untouched so the operator
//! can adjust quantities and retry. The teardown step is unreachable
//! unless the transaction committed.
//!
//! ## Atomicity
//! The whole commit runs under one hold of the session lock. The
//! autosave loop and concurrent edits never observe the window where
//! the order is already durable but the cart still stands; a snapshot
//! written during checkout reflects either the full cart or the
//! torn-down session, nothing in between.

use tracing::{info, warn};

use bazaar_core::{CheckoutPreview, Order};
use bazaar_db::{Database, OrderRepository};

use crate::error::PosResult;
use crate::state::SessionState;

/// Orchestrates preview and checkout for the active billing session.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    state: SessionState,
}

impl CheckoutService {
    pub fn new(db: Database, state: SessionState) -> Self {
        CheckoutService { db, state }
    }

    /// The checkout drawer view for one customer, computed by the same
    /// formulas the persisted order will use.
    pub async fn preview(&self, customer_id: &str) -> PosResult<CheckoutPreview> {
        self.state
            .with_session(|session, catalog| session.preview(customer_id, catalog))
            .await
            .map_err(Into::into)
    }

    /// Commits a customer's cart into a persisted order.
    ///
    /// ## Steps
    /// 1. Load the customer record (name and addresses are denormalized
    ///    onto the order)
    /// 2. Build the frozen order from the live session (pure)
    /// 3. Persist order + stock decrements in one transaction
    /// 4. Tear down the customer's cart
    /// 5. Save a fresh session snapshot (best effort)
    ///
    /// Steps 2-4 hold the session lock, so no other task can edit or
    /// snapshot the cart between the order becoming durable and the
    /// teardown.
    pub async fn checkout(&self, customer_id: &str, operator: &str) -> PosResult<Order> {
        let customer = self.db.catalog().get_customer(customer_id).await?;
        let order_no = OrderRepository::generate_order_no();

        let mut guard = self.state.lock().await;
        let (order, cells) =
            guard
                .session()
                .build_order(&customer, guard.catalog(), order_no, operator)?;

        // The one fallible side-effecting step. On error the guard
        // drops and the session is still holding the cart.
        self.db.orders().commit_order(&order, &cells).await?;

        guard.session_mut().teardown_customer(customer_id);
        let snapshot = guard.snapshot();
        drop(guard);

        // The order is durable; a failed snapshot write only costs the
        // next autosave tick.
        if let Err(e) = self.db.sessions().save(&snapshot).await {
            warn!(error = %e, "Post-checkout session save failed");
        }

        info!(
            order_no = %order.order_no,
            customer = %order.customer_name,
            grand_total_paise = order.grand_total_paise,
            "Checkout complete"
        );
        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
