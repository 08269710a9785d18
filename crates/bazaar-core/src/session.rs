//! # Billing Session Aggregate
//!
//! One explicit object owning everything a billing session holds: the
//! selected customers and products, the allocation grid, and the
//! per-customer checkout state (order details, custom items, discounts,
//! advances). One aggregate a controller owns instead of state scattered
//! across modules; persistence is an injected port (see `bazaar-db`),
//! never a hardcoded storage key.
//!
//! ## Checkout Commit Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Checkout for customer X                           │
//! │                                                                         │
//! │  1. build_order(X)    ── price X's cells + custom items (pure)         │
//! │  2.                   ── totals, discount, advance, payment status     │
//! │  3.                   ── Order { status: Created, items frozen }       │
//! │  4. persist           ── order insert + stock decrement (bazaar-db,    │
//! │                          one transaction) ◄── MAY FAIL                 │
//! │  5. teardown_customer ── only after 4 succeeded; clears X's cells,     │
//! │                          custom items, discount, advance               │
//! │                                                                         │
//! │  A failure in 4 must leave the session untouched: a half-committed     │
//! │  checkout would silently lose the cart without a durable order.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::{CoreError, CoreResult};
use crate::grid::AllocationGrid;
use crate::money::Money;
use crate::pricing;
use crate::snapshot::{SessionSnapshot, SCHEMA_VERSION};
use crate::types::{
    Customer, CustomLineItem, GridCell, Order, OrderItem, OrderStatus, OrderType, PaymentStatus,
    Product,
};
use crate::validation;

// =============================================================================
// Order Details
// =============================================================================

/// Order-specific details captured in the checkout drawer. Denormalized
/// onto the order at commit, not the live customer record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub group: Option<String>,
    pub marketer: Option<String>,
    pub transporter: Option<String>,
    pub delivery_address: Option<String>,
    pub note: Option<String>,
}

// =============================================================================
// Checkout Preview
// =============================================================================

/// Everything the checkout drawer displays for one customer. Computed by
/// the exact formulas the persisted order will use.
#[derive(Debug, Clone)]
pub struct CheckoutPreview {
    pub items: Vec<OrderItem>,
    pub item_value: Money,
    pub gst_value: Money,
    pub discount: Money,
    pub grand_total: Money,
    pub advance: Money,
    pub due: Money,
}

// =============================================================================
// Session
// =============================================================================

/// The active billing session: all virtual carts plus their checkout
/// state. Purely in-memory; `snapshot`/`restore` bridge to persistence.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Selected customer ids, in column order.
    customers: Vec<String>,

    /// Selected product ids, in row order.
    products: Vec<String>,

    grid: AllocationGrid,

    order_details: HashMap<String, OrderDetails>,
    custom_items: HashMap<String, Vec<CustomLineItem>>,
    /// Flat-discount amounts (paise) as last shown per customer, so a
    /// restored session displays the same figure without recomputing.
    discounts: HashMap<String, i64>,
    /// Advances collected (paise) per customer.
    advance_amounts: HashMap<String, i64>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    // -------------------------------------------------------------------------
    // Selection management
    // -------------------------------------------------------------------------

    pub fn customers(&self) -> &[String] {
        &self.customers
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn grid(&self) -> &AllocationGrid {
        &self.grid
    }

    /// Adds a customer column. Idempotent.
    pub fn add_customer(&mut self, customer_id: impl Into<String>) {
        let id = customer_id.into();
        if !self.customers.contains(&id) {
            self.customers.push(id);
        }
    }

    /// Adds a product row. Idempotent.
    pub fn add_product(&mut self, product_id: impl Into<String>) {
        let id = product_id.into();
        if !self.products.contains(&id) {
            self.products.push(id);
        }
    }

    /// Removes a customer and all of their session state. Grid cells go
    /// first, then the per-customer maps, then the selection entry;
    /// never the other way around, or orphaned cells could survive.
    ///
    /// Irreversible within the session; callers confirm interactively
    /// when [`Session::removal_needs_confirmation`] says so.
    pub fn remove_customer(&mut self, customer_id: &str) {
        self.grid.remove_customer(customer_id);
        self.order_details.remove(customer_id);
        self.custom_items.remove(customer_id);
        self.discounts.remove(customer_id);
        self.advance_amounts.remove(customer_id);
        self.customers.retain(|c| c != customer_id);
    }

    /// Removes a product row and every cell on it.
    pub fn remove_product(&mut self, product: &Product) {
        self.grid.remove_product(product);
        self.products.retain(|p| p != &product.id);
    }

    /// Whether removing this customer would discard nonzero allocated
    /// quantity or custom items (and so deserves a confirmation prompt).
    /// Zero-state removals skip confirmation.
    pub fn removal_needs_confirmation(&self, customer_id: &str) -> bool {
        self.grid.customer_has_cells(customer_id)
            || self
                .custom_items
                .get(customer_id)
                .is_some_and(|items| !items.is_empty())
    }

    /// Whether removing this product would discard nonzero allocations.
    pub fn product_removal_needs_confirmation(&self, product: &Product) -> bool {
        product.variants.iter().any(|v| self.grid.allocated(&v.id) > 0)
    }

    // -------------------------------------------------------------------------
    // Grid edits
    // -------------------------------------------------------------------------

    /// Sets a grid quantity through the bounded setter; returns the
    /// applied quantity after clamping.
    pub fn set_quantity(
        &mut self,
        catalog: &Catalog,
        customer_id: &str,
        variant_id: &str,
        qty: i64,
    ) -> i64 {
        self.grid.set_quantity(catalog, customer_id, variant_id, qty)
    }

    // -------------------------------------------------------------------------
    // Per-customer checkout state
    // -------------------------------------------------------------------------

    fn ensure_in_session(&self, customer_id: &str) -> CoreResult<()> {
        if self.customers.iter().any(|c| c == customer_id) {
            Ok(())
        } else {
            Err(CoreError::CustomerNotInSession(customer_id.to_string()))
        }
    }

    /// Adds a validated custom line item to a customer's cart.
    pub fn add_custom_item(&mut self, customer_id: &str, item: CustomLineItem) -> CoreResult<()> {
        self.ensure_in_session(customer_id)?;
        validation::validate_custom_item(&item)?;
        self.custom_items
            .entry(customer_id.to_string())
            .or_default()
            .push(item);
        Ok(())
    }

    /// Removes a custom line item by id. A no-op if absent.
    pub fn remove_custom_item(&mut self, customer_id: &str, item_id: &str) {
        if let Some(items) = self.custom_items.get_mut(customer_id) {
            items.retain(|i| i.id != item_id);
            if items.is_empty() {
                self.custom_items.remove(customer_id);
            }
        }
    }

    pub fn custom_items_for(&self, customer_id: &str) -> &[CustomLineItem] {
        self.custom_items
            .get(customer_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_order_details(
        &mut self,
        customer_id: &str,
        details: OrderDetails,
    ) -> CoreResult<()> {
        self.ensure_in_session(customer_id)?;
        self.order_details.insert(customer_id.to_string(), details);
        Ok(())
    }

    pub fn order_details_for(&self, customer_id: &str) -> Option<&OrderDetails> {
        self.order_details.get(customer_id)
    }

    /// Records the advance collected for a customer. Zero clears the
    /// entry. The caller validates the amount against the grand total
    /// (same formula as the preview) before committing.
    pub fn set_advance(&mut self, customer_id: &str, advance: Money) -> CoreResult<()> {
        self.ensure_in_session(customer_id)?;
        validation::validate_advance_amount(advance)?;
        if advance.is_zero() {
            self.advance_amounts.remove(customer_id);
        } else {
            self.advance_amounts
                .insert(customer_id.to_string(), advance.paise());
        }
        Ok(())
    }

    pub fn advance_for(&self, customer_id: &str) -> Money {
        Money::from_paise(
            self.advance_amounts
                .get(customer_id)
                .copied()
                .unwrap_or(0),
        )
    }

    /// Records the flat-discount amount shown for a customer so the
    /// session snapshot round-trips the displayed figure. The value is
    /// always derived via [`pricing::flat_discount`].
    pub fn set_discount(&mut self, customer_id: &str, discount: Money) {
        if discount.is_zero() {
            self.discounts.remove(customer_id);
        } else {
            self.discounts
                .insert(customer_id.to_string(), discount.paise());
        }
    }

    pub fn discount_for(&self, customer_id: &str) -> Money {
        Money::from_paise(self.discounts.get(customer_id).copied().unwrap_or(0))
    }

    // -------------------------------------------------------------------------
    // Pricing
    // -------------------------------------------------------------------------

    /// Prices a customer's slice of the grid plus their custom items.
    ///
    /// Fails if any cell references a variant missing from the catalog:
    /// the session and the catalog must describe the same world.
    pub fn priced_items(&self, customer_id: &str, catalog: &Catalog) -> CoreResult<Vec<OrderItem>> {
        let mut items = Vec::new();
        for cell in self.grid.cells_for_customer(customer_id) {
            let (product, variant) = catalog
                .variant(&cell.variant_id)
                .ok_or_else(|| CoreError::VariantNotFound(cell.variant_id.clone()))?;
            items.push(pricing::price_cell(product, variant, &cell));
        }
        for custom in self.custom_items_for(customer_id) {
            items.push(pricing::price_custom_item(custom));
        }
        Ok(items)
    }

    /// Computes the checkout drawer view for one customer, via the same
    /// formulas the persisted order will use.
    pub fn preview(&self, customer_id: &str, catalog: &Catalog) -> CoreResult<CheckoutPreview> {
        self.ensure_in_session(customer_id)?;
        let items = self.priced_items(customer_id, catalog)?;

        let mut item_value = Money::zero();
        let mut gst_value = Money::zero();
        for item in &items {
            item_value += Money::from_paise(item.value_paise);
            gst_value += Money::from_paise(item.gst_paise);
        }

        let discount = pricing::flat_discount(item_value);
        let grand_total = pricing::grand_total(item_value, gst_value);
        let advance = self.advance_for(customer_id);
        let due = pricing::due_amount(grand_total, advance);

        Ok(CheckoutPreview {
            items,
            item_value,
            gst_value,
            discount,
            grand_total,
            advance,
            due,
        })
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Steps 1-3 of the checkout commit: builds the frozen [`Order`] and
    /// returns it together with the committed cells whose stock the
    /// persistence layer must deduct.
    ///
    /// Pure: the session is not modified. The caller persists the order
    /// and only then calls [`Session::teardown_customer`].
    pub fn build_order(
        &self,
        customer: &Customer,
        catalog: &Catalog,
        order_no: impl Into<String>,
        created_by: impl Into<String>,
    ) -> CoreResult<(Order, Vec<GridCell>)> {
        self.ensure_in_session(&customer.id)?;

        let cells = self.grid.cells_for_customer(&customer.id);
        let preview = self.preview(&customer.id, catalog)?;
        if preview.items.is_empty() {
            return Err(CoreError::EmptyCart(customer.id.clone()));
        }

        validation::validate_advance_within_total(preview.advance, preview.grand_total)?;

        let details = self
            .order_details
            .get(&customer.id)
            .cloned()
            .unwrap_or_default();
        let now = Utc::now();

        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_no: order_no.into(),
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
            group: details.group,
            marketer: details.marketer,
            transporter: details.transporter,
            delivery_address: details
                .delivery_address
                .or_else(|| customer.delivery_address.clone()),
            note: details.note,
            item_value_paise: preview.item_value.paise(),
            gst_value_paise: preview.gst_value.paise(),
            grand_total_paise: preview.grand_total.paise(),
            advance_paise: preview.advance.paise(),
            payment_status: PaymentStatus::at_checkout(preview.advance),
            status: OrderStatus::Created,
            order_type: OrderType::Pos,
            items: preview.items,
            created_at: now,
            updated_at: now,
            created_by: created_by.into(),
        };

        Ok((order, cells))
    }

    /// Step 5 of the checkout commit: cart teardown. Clears the
    /// customer's cells, custom items, discount, advance, and order
    /// details, and drops the column from the selection.
    ///
    /// Must only run after persistence succeeded.
    pub fn teardown_customer(&mut self, customer_id: &str) {
        self.remove_customer(customer_id);
    }

    // -------------------------------------------------------------------------
    // Persistence bridge
    // -------------------------------------------------------------------------

    /// Captures the full session state for the session store.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            schema_version: SCHEMA_VERSION,
            customer_ids: self.customers.clone(),
            product_ids: self.products.clone(),
            cells: self.grid.cells(),
            order_details: self.order_details.clone(),
            custom_items: self.custom_items.clone(),
            discounts: self.discounts.clone(),
            advance_amounts: self.advance_amounts.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuilds a session from a (already migrated) snapshot. The grid is
    /// reconstructed through [`AllocationGrid::from_cells`], which clamps
    /// every cell against the given catalog: a snapshot that predates a
    /// restock or a sale on another terminal can never hold more than
    /// the stock that actually remains.
    pub fn restore(snapshot: SessionSnapshot, catalog: &Catalog) -> Session {
        Session {
            customers: snapshot.customer_ids,
            products: snapshot.product_ids,
            grid: AllocationGrid::from_cells(catalog, snapshot.cells),
            order_details: snapshot.order_details,
            custom_items: snapshot.custom_items,
            discounts: snapshot.discounts,
            advance_amounts: snapshot.advance_amounts,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
