//! # Catalog / Stock Ledger
//!
//! Source of truth for variant pricing and total stock. Answers
//! availability queries factoring in every in-progress cart.
//!
//! ## Availability Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              One Shared Stock Pool, Many Virtual Carts                  │
//! │                                                                         │
//! │  variant "KUR-M"  stock_qty = 10                                       │
//! │                                                                         │
//! │  Customer A holds 4 ┐                                                  │
//! │  Customer B holds 3 ├── allocated(KUR-M) = 7                           │
//! │  Customer C holds 0 ┘                                                  │
//! │                                                                         │
//! │  available_stock          = 10 − 7 = 3                                 │
//! │  max_allowed (customer A) =  3 + 4 = 7   ← may keep what it holds      │
//! │  max_allowed (customer C) =  3 + 0 = 3                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Availability is always *derived* from the live cell set, never tracked
//! separately, so there is no stock-restore step to forget. The ledger is
//! pure reads; stock only mutates in the database layer at checkout commit.

use std::collections::HashMap;

use crate::grid::AllocationGrid;
use crate::types::{Product, ProductVariant};

/// Read-only product/variant catalog with a variant ownership index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    /// variant_id → index into `products`.
    variant_owner: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog from the product list delivered by product
    /// management (REST API / seed data).
    pub fn new(products: Vec<Product>) -> Self {
        let mut variant_owner = HashMap::new();
        for (idx, product) in products.iter().enumerate() {
            for variant in &product.variants {
                variant_owner.insert(variant.id.clone(), idx);
            }
        }
        Catalog {
            products,
            variant_owner,
        }
    }

    /// All products, active or not.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Products offered when adding new selections. Already-allocated
    /// inactive variants stay visible through their existing grid cells.
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Looks up a product by id.
    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    /// Looks up a variant and its owning product.
    pub fn variant(&self, variant_id: &str) -> Option<(&Product, &ProductVariant)> {
        let idx = *self.variant_owner.get(variant_id)?;
        let product = &self.products[idx];
        let variant = product.variant(variant_id)?;
        Some((product, variant))
    }

    /// Stock of a variant still free to allocate, given everything
    /// currently held by any in-progress cart.
    ///
    /// `stock_qty − Σ qty over all cells for the variant`. Never negative
    /// when every mutation goes through the grid's bounded setter.
    /// Unknown variants have no stock.
    pub fn available_stock(&self, variant_id: &str, grid: &AllocationGrid) -> i64 {
        match self.variant(variant_id) {
            Some((_, variant)) => variant.stock_qty - grid.allocated(variant_id),
            None => 0,
        }
    }

    /// The most a given customer may set for a variant: whatever is still
    /// free **plus** what the customer already holds. A customer is never
    /// blocked by its own existing allocation.
    ///
    /// This is the single bound used by both the input control and the
    /// grid setter, so the two can never drift apart.
    pub fn max_allowed_for_customer(
        &self,
        customer_id: &str,
        variant_id: &str,
        grid: &AllocationGrid,
    ) -> i64 {
        self.available_stock(variant_id, grid) + grid.quantity(customer_id, variant_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductVariant;

    fn test_catalog() -> Catalog {
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
                        price_paise: 9900,
                        stock_qty: 10,
                    },
                    ProductVariant {
                        id: "v2".into(),
                        label: "M".into(),
                        sku: "KUR-M".into(),
                        barcode: None,
                        price_paise: 10900,
                        stock_qty: 4,
                    },
                ],
            },
            Product {
                id: "p2".into(),
                design_id: "D-2".into(),
                name: "Saree".into(),
                tax_rate_bps: 1200,
                active: false,
                variants: vec![ProductVariant {
                    id: "v3".into(),
                    label: "Free".into(),
                    sku: "SAR-F".into(),
                    barcode: None,
                    price_paise: 250000,
                    stock_qty: 2,
                }],
            },
        ])
    }

    #[test]
    fn test_variant_lookup() {
        let catalog = test_catalog();
        let (product, variant) = catalog.variant("v3").unwrap();
        assert_eq!(product.id, "p2");
        assert_eq!(variant.sku, "SAR-F");
        assert!(catalog.variant("missing").is_none());
    }

    #[test]
    fn test_active_products_filter() {
        let catalog = test_catalog();
        let active: Vec<_> = catalog.active_products().map(|p| p.id.as_str()).collect();
        assert_eq!(active, vec!["p1"]);
    }

    #[test]
    fn test_available_stock_empty_grid() {
        let catalog = test_catalog();
        let grid = AllocationGrid::new();
        assert_eq!(catalog.available_stock("v1", &grid), 10);
        assert_eq!(catalog.available_stock("missing", &grid), 0);
    }

    #[test]
    fn test_max_allowed_counts_own_holding() {
        let catalog = test_catalog();
        let mut grid = AllocationGrid::new();
        grid.set_quantity(&catalog, "A", "v2", 3);
        grid.set_quantity(&catalog, "B", "v2", 1);

        // v2 stock 4: A holds 3, B holds 1, pool is empty.
        assert_eq!(catalog.available_stock("v2", &grid), 0);
        // A may keep its 3; B may keep its 1; neither can grow.
        assert_eq!(catalog.max_allowed_for_customer("A", "v2", &grid), 3);
        assert_eq!(catalog.max_allowed_for_customer("B", "v2", &grid), 1);
        // A newcomer gets nothing.
        assert_eq!(catalog.max_allowed_for_customer("C", "v2", &grid), 0);
    }
}
