//! # Allocation Grid
//!
//! The sparse `(customer, variant) → quantity` map representing every
//! customer's in-progress cart simultaneously, all drawn against the one
//! shared stock pool in the [`Catalog`](crate::catalog::Catalog).
//!
//! ## Grid Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 The Billing Grid (sparse matrix)                        │
//! │                                                                         │
//! │               KUR-S   KUR-M   SAR-F                                    │
//! │  Customer A     4       ·       1                                      │
//! │  Customer B     ·       3       ·                                      │
//! │  Customer C     2       1       ·                                      │
//! │                                                                         │
//! │  Only non-zero cells are stored. Setting a cell to 0 removes it,       │
//! │  which implicitly restores stock: availability is always re-derived    │
//! │  from the remaining cells, never tracked separately.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bounded Setter
//! `set_quantity` clamps every request to
//! `[0, max_allowed_for_customer]` using the same bound function the UI
//! uses for its input controls. Out-of-range requests are a caller
//! contract violation and are clamped silently rather than raised; the
//! grid must never be left in an invalid state.
//!
//! ## Allocated Index
//! Alongside the cell map the grid maintains a `variant_id → total
//! allocated` index, updated on every mutation. Availability queries are
//! O(1) instead of rescanning the full cell list; observable behavior is
//! identical.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::Catalog;
use crate::money::Money;
use crate::pricing;
use crate::types::{GridCell, Product};

/// Per-customer, per-product running totals for a grid column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductAggregate {
    /// Total quantity across the product's variants.
    pub total_qty: i64,
    /// Total line amount (value + GST, per-line rounded).
    pub total: Money,
}

/// The in-session, uncommitted allocation state for all customers.
#[derive(Debug, Clone, Default)]
pub struct AllocationGrid {
    /// `(customer_id, variant_id) → qty`, qty always > 0.
    /// BTreeMap keeps iteration order deterministic.
    cells: BTreeMap<(String, String), i64>,

    /// `variant_id → Σ qty` across all customers. Kept in lockstep with
    /// `cells` by every mutation.
    allocated: HashMap<String, i64>,
}

impl AllocationGrid {
    /// Creates an empty grid.
    pub fn new() -> Self {
        AllocationGrid::default()
    }

    /// Rebuilds a grid from persisted cells (session restore).
    ///
    /// Every cell goes through the bounded setter, so a stale snapshot
    /// can never allocate more than the current catalog's stock: excess
    /// quantities are clamped, non-positive quantities and cells for
    /// variants the catalog no longer knows are dropped. Cells are
    /// applied in (customer, variant) order, so when stock shrank the
    /// earlier column keeps its holding and the later one is clamped.
    pub fn from_cells(catalog: &Catalog, cells: Vec<GridCell>) -> Self {
        let mut grid = AllocationGrid::new();
        for cell in cells {
            grid.set_quantity(catalog, &cell.customer_id, &cell.variant_id, cell.qty);
        }
        grid
    }

    /// Sets the quantity a customer holds for a variant, clamped to
    /// `[0, max_allowed_for_customer]`.
    ///
    /// ## Behavior
    /// - `qty <= 0` (or clamped to 0): removes the cell; a no-op if the
    ///   cell was already absent
    /// - cell exists: replaces its quantity
    /// - cell absent: inserts it
    ///
    /// Returns the quantity actually applied after clamping.
    pub fn set_quantity(
        &mut self,
        catalog: &Catalog,
        customer_id: &str,
        variant_id: &str,
        qty: i64,
    ) -> i64 {
        // Re-read the bound against the *current* cell set, not a stale
        // snapshot: edits in another customer's column must be visible.
        let bound = catalog.max_allowed_for_customer(customer_id, variant_id, self);
        let qty = qty.clamp(0, bound.max(0));

        if qty == 0 {
            self.remove_cell(customer_id, variant_id);
        } else {
            self.remove_cell(customer_id, variant_id);
            self.insert_cell(customer_id.to_string(), variant_id.to_string(), qty);
        }
        qty
    }

    /// The quantity a customer holds for a variant (0 if absent).
    pub fn quantity(&self, customer_id: &str, variant_id: &str) -> i64 {
        self.cells
            .get(&(customer_id.to_string(), variant_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total allocated across all customers for a variant (0 if none).
    pub fn allocated(&self, variant_id: &str) -> i64 {
        self.allocated.get(variant_id).copied().unwrap_or(0)
    }

    /// Deletes every cell for a customer.
    ///
    /// Used on cart removal and post-checkout cleanup; must run before
    /// the customer leaves the selected-customer list so no orphaned
    /// cells remain.
    pub fn remove_customer(&mut self, customer_id: &str) {
        let keys: Vec<_> = self
            .cells
            .keys()
            .filter(|(c, _)| c == customer_id)
            .cloned()
            .collect();
        for (customer, variant) in keys {
            self.remove_cell(&customer, &variant);
        }
    }

    /// Deletes every cell belonging to any of a product's variants.
    ///
    /// Used when a product is removed from the active billing session.
    pub fn remove_product(&mut self, product: &Product) {
        let keys: Vec<_> = self
            .cells
            .keys()
            .filter(|(_, v)| product.owns_variant(v))
            .cloned()
            .collect();
        for (customer, variant) in keys {
            self.remove_cell(&customer, &variant);
        }
    }

    /// All cells, in deterministic (customer, variant) order.
    pub fn cells(&self) -> Vec<GridCell> {
        self.cells
            .iter()
            .map(|((customer_id, variant_id), qty)| GridCell {
                customer_id: customer_id.clone(),
                variant_id: variant_id.clone(),
                qty: *qty,
            })
            .collect()
    }

    /// The cells held by one customer.
    pub fn cells_for_customer(&self, customer_id: &str) -> Vec<GridCell> {
        self.cells
            .iter()
            .filter(|((c, _), _)| c == customer_id)
            .map(|((customer_id, variant_id), qty)| GridCell {
                customer_id: customer_id.clone(),
                variant_id: variant_id.clone(),
                qty: *qty,
            })
            .collect()
    }

    /// True if the customer holds any quantity at all.
    pub fn customer_has_cells(&self, customer_id: &str) -> bool {
        self.cells.keys().any(|(c, _)| c == customer_id)
    }

    /// Per-customer running totals for one product's column: quantity and
    /// line amount summed across the product's variants.
    pub fn aggregate_for_customer_product(
        &self,
        catalog: &Catalog,
        customer_id: &str,
        product_id: &str,
    ) -> ProductAggregate {
        let Some(product) = catalog.product(product_id) else {
            return ProductAggregate::default();
        };

        let mut agg = ProductAggregate::default();
        for variant in &product.variants {
            let qty = self.quantity(customer_id, &variant.id);
            if qty > 0 {
                let line = pricing::line_totals(variant.price(), qty, product.tax_rate());
                agg.total_qty += qty;
                agg.total += line.total;
            }
        }
        agg
    }

    /// Compact occupancy summary for a product's header: every variant
    /// with a nonzero cross-customer total as `"<count> <label>"`, joined
    /// with `" + "`.
    ///
    /// Example: `"4 S + 3 M"`.
    pub fn variant_summary(&self, product: &Product) -> String {
        let parts: Vec<String> = product
            .variants
            .iter()
            .filter_map(|variant| {
                let total = self.allocated(&variant.id);
                (total > 0).then(|| format!("{} {}", total, variant.label))
            })
            .collect();
        parts.join(" + ")
    }

    /// Number of stored (non-zero) cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if no customer holds anything.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // -------------------------------------------------------------------------
    // Internal mutation helpers - the only two places cells change,
    // so the allocated index cannot drift from the cell map.
    // -------------------------------------------------------------------------

    fn insert_cell(&mut self, customer_id: String, variant_id: String, qty: i64) {
        debug_assert!(qty > 0);
        *self.allocated.entry(variant_id.clone()).or_insert(0) += qty;
        self.cells.insert((customer_id, variant_id), qty);
    }

    fn remove_cell(&mut self, customer_id: &str, variant_id: &str) {
        let key = (customer_id.to_string(), variant_id.to_string());
        if let Some(qty) = self.cells.remove(&key) {
            let entry = self.allocated.entry(variant_id.to_string()).or_insert(0);
            *entry -= qty;
            if *entry <= 0 {
                self.allocated.remove(variant_id);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductVariant;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Product {
                id: "p1".into(),
                design_id: "D-1".into(),
                name: "Kurta".into(),
                tax_rate_bps: 500,
                active: true,
                variants: vec![
                    ProductVariant {
                        id: "v1".into(),
                        label: "S".into(),
                        sku: "KUR-S".into(),
                        barcode: None,
                        price_paise: 10000,
                        stock_qty: 10,
                    },
                    ProductVariant {
                        id: "v2".into(),
                        label: "M".into(),
                        sku: "KUR-M".into(),
                        barcode: None,
                        price_paise: 20000,
                        stock_qty: 5,
                    },
                ],
            },
            Product {
                id: "p2".into(),
                design_id: "D-2".into(),
                name: "Saree".into(),
                tax_rate_bps: 1200,
                active: true,
                variants: vec![ProductVariant {
                    id: "v3".into(),
                    label: "Free".into(),
                    sku: "SAR-F".into(),
                    barcode: None,
                    price_paise: 50000,
                    stock_qty: 2,
                }],
            },
        ])
    }

    /// Recomputes the allocated total for a variant straight from the
    /// cell list, to cross-check the incremental index.
    fn rescan_allocated(grid: &AllocationGrid, variant_id: &str) -> i64 {
        grid.cells()
            .iter()
            .filter(|c| c.variant_id == variant_id)
            .map(|c| c.qty)
            .sum()
    }

    #[test]
    fn test_set_and_get_quantity() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();

        assert_eq!(grid.set_quantity(&catalog, "A", "v1", 4), 4);
        assert_eq!(grid.quantity("A", "v1"), 4);
        assert_eq!(grid.quantity("A", "v2"), 0);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_set_quantity_replaces() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();

        grid.set_quantity(&catalog, "A", "v1", 4);
        grid.set_quantity(&catalog, "A", "v1", 2);
        assert_eq!(grid.quantity("A", "v1"), 2);
        assert_eq!(grid.allocated("v1"), 2);
    }

    #[test]
    fn test_zero_removes_cell_and_is_idempotent() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();

        grid.set_quantity(&catalog, "A", "v1", 4);
        grid.set_quantity(&catalog, "A", "v1", 0);
        assert_eq!(grid.quantity("A", "v1"), 0);
        assert!(grid.is_empty());

        // Zero-set on an already-absent cell is a no-op.
        let before = grid.cells();
        grid.set_quantity(&catalog, "A", "v1", 0);
        assert_eq!(grid.cells(), before);
    }

    #[test]
    fn test_setter_clamps_to_shared_pool() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();

        // v2 stock is 5. A takes 3, B asks for 5 and is clamped to 2.
        assert_eq!(grid.set_quantity(&catalog, "A", "v2", 3), 3);
        assert_eq!(grid.set_quantity(&catalog, "B", "v2", 5), 2);
        assert_eq!(grid.allocated("v2"), 5);

        // A may grow only back into what it already holds.
        assert_eq!(grid.set_quantity(&catalog, "A", "v2", 10), 3);
    }

    #[test]
    fn test_stock_conservation_over_mutation_sequence() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();

        // Arbitrary interleaved edits across customers and variants; the
        // sum per variant must never exceed its stock.
        let edits = [
            ("A", "v1", 7),
            ("B", "v1", 9),
            ("A", "v1", 2),
            ("C", "v1", 4),
            ("B", "v2", 5),
            ("A", "v2", 3),
            ("B", "v1", 0),
            ("C", "v3", 9),
            ("A", "v3", 9),
        ];
        for (customer, variant, qty) in edits {
            grid.set_quantity(&catalog, customer, variant, qty);
            for (v, stock) in [("v1", 10), ("v2", 5), ("v3", 2)] {
                assert!(grid.allocated(v) <= stock, "variant {v} over-allocated");
                assert_eq!(grid.allocated(v), rescan_allocated(&grid, v), "index drift on {v}");
            }
        }
    }

    #[test]
    fn test_negative_request_clamps_to_zero() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();
        grid.set_quantity(&catalog, "A", "v1", 3);
        assert_eq!(grid.set_quantity(&catalog, "A", "v1", -5), 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_unknown_variant_never_stored() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();
        assert_eq!(grid.set_quantity(&catalog, "A", "ghost", 3), 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_remove_customer() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();
        grid.set_quantity(&catalog, "A", "v1", 4);
        grid.set_quantity(&catalog, "A", "v2", 1);
        grid.set_quantity(&catalog, "B", "v1", 2);

        grid.remove_customer("A");
        assert!(!grid.customer_has_cells("A"));
        assert_eq!(grid.quantity("B", "v1"), 2);
        assert_eq!(grid.allocated("v1"), 2);
        assert_eq!(grid.allocated("v2"), 0);
    }

    #[test]
    fn test_remove_product() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();
        grid.set_quantity(&catalog, "A", "v1", 4);
        grid.set_quantity(&catalog, "A", "v3", 1);
        grid.set_quantity(&catalog, "B", "v2", 2);

        grid.remove_product(catalog.product("p1").unwrap());
        assert_eq!(grid.quantity("A", "v1"), 0);
        assert_eq!(grid.quantity("B", "v2"), 0);
        assert_eq!(grid.quantity("A", "v3"), 1);
    }

    #[test]
    fn test_removal_frees_stock_for_others() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();

        grid.set_quantity(&catalog, "A", "v3", 2); // exhausts v3
        assert_eq!(grid.set_quantity(&catalog, "B", "v3", 1), 0);

        grid.remove_customer("A");
        assert_eq!(grid.set_quantity(&catalog, "B", "v3", 1), 1);
    }

    #[test]
    fn test_aggregate_for_customer_product() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();
        grid.set_quantity(&catalog, "A", "v1", 3); // 3 × ₹100 @5% = 315.00
        grid.set_quantity(&catalog, "A", "v2", 1); // 1 × ₹200 @5% = 210.00
        grid.set_quantity(&catalog, "B", "v1", 2); // other customer, ignored

        let agg = grid.aggregate_for_customer_product(&catalog, "A", "p1");
        assert_eq!(agg.total_qty, 4);
        assert_eq!(agg.total.paise(), 31500 + 21000);
    }

    #[test]
    fn test_variant_summary() {
        let catalog = catalog();
        let mut grid = AllocationGrid::new();
        grid.set_quantity(&catalog, "A", "v1", 4);
        grid.set_quantity(&catalog, "B", "v1", 2);
        grid.set_quantity(&catalog, "B", "v2", 3);

        let product = catalog.product("p1").unwrap();
        assert_eq!(grid.variant_summary(product), "6 S + 3 M");

        grid.remove_customer("B");
        assert_eq!(grid.variant_summary(product), "4 S");

        grid.remove_customer("A");
        assert_eq!(grid.variant_summary(product), "");
    }

    #[test]
    fn test_from_cells_drops_non_positive() {
        let catalog = catalog();
        let grid = AllocationGrid::from_cells(
            &catalog,
            vec![
                GridCell {
                    customer_id: "A".into(),
                    variant_id: "v1".into(),
                    qty: 4,
                },
                GridCell {
                    customer_id: "B".into(),
                    variant_id: "v1".into(),
                    qty: 0,
                },
                GridCell {
                    customer_id: "C".into(),
                    variant_id: "v2".into(),
                    qty: -2,
                },
            ],
        );
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.allocated("v1"), 4);
    }

    #[test]
    fn test_from_cells_clamps_to_current_stock() {
        let catalog = catalog();
        // A snapshot written while v2 had more stock than its current 5,
        // plus a cell for a variant that no longer exists.
        let grid = AllocationGrid::from_cells(
            &catalog,
            vec![
                GridCell {
                    customer_id: "A".into(),
                    variant_id: "v2".into(),
                    qty: 4,
                },
                GridCell {
                    customer_id: "B".into(),
                    variant_id: "v2".into(),
                    qty: 4,
                },
                GridCell {
                    customer_id: "C".into(),
                    variant_id: "ghost".into(),
                    qty: 3,
                },
            ],
        );
        assert_eq!(grid.quantity("A", "v2"), 4);
        assert_eq!(grid.quantity("B", "v2"), 1);
        assert_eq!(grid.quantity("C", "ghost"), 0);
        assert_eq!(grid.allocated("v2"), 5);
        assert_eq!(catalog.available_stock("v2", &grid), 0);
    }
}
