//! # Order Pricing Engine
//!
//! Deterministic price computation from allocated cells and custom items
//! to the final payable amounts.
//!
//! ## Computation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pricing Pipeline                                    │
//! │                                                                         │
//! │  per line:   value = price × qty                                       │
//! │              gst   = value × rate      (rounded per line)              │
//! │              total = value + gst                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  aggregates: item_value = Σ value      (sums of rounded lines)         │
//! │              gst_value  = Σ gst                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  discount    = item_value × 5%         (pre-tax value only)            │
//! │  grand_total = item_value − discount + gst_value                       │
//! │  due_amount  = grand_total − advance                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding happens **per line, before aggregation**. Aggregating unrounded
//! values first would produce different penny-level results; every surface
//! that shows a grand total (cart preview, checkout drawer, order detail,
//! persisted order) goes through these same functions.
//!
//! Custom items always carry a fixed 5% GST regardless of any product's
//! configured rate: a deliberate special case, since ad-hoc items have no
//! catalog rate to reference.

use uuid::Uuid;

use crate::money::Money;
use crate::types::{CustomLineItem, GridCell, OrderItem, Product, ProductVariant, TaxRate, CUSTOM_VARIANT_ID};

// =============================================================================
// Constants
// =============================================================================

/// GST rate applied to every custom line item: 5%.
pub const CUSTOM_ITEM_TAX_BPS: u32 = 500;

/// Flat discount on the pre-tax item value: 5%.
pub const FLAT_DISCOUNT_BPS: u32 = 500;

// =============================================================================
// Line Computation
// =============================================================================

/// Value / GST / total for one priced line, each rounded at the paise
/// level before any aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineTotals {
    pub value: Money,
    pub gst: Money,
    pub total: Money,
}

/// Prices one line: `value = price × qty`, `gst = value × rate` (rounded
/// half away from zero at the paise level), `total = value + gst`.
pub fn line_totals(unit_price: Money, qty: i64, tax_rate: TaxRate) -> LineTotals {
    let value = unit_price.multiply_quantity(qty);
    let gst = value.calculate_gst(tax_rate);
    LineTotals {
        value,
        gst,
        total: value + gst,
    }
}

/// Prices a custom line item with the fixed 5% GST fast path.
pub fn custom_line_totals(item: &CustomLineItem) -> LineTotals {
    line_totals(
        Money::from_paise(item.unit_price_paise),
        item.quantity,
        TaxRate::from_bps(CUSTOM_ITEM_TAX_BPS),
    )
}

// =============================================================================
// Order Aggregates
// =============================================================================

/// Aggregate totals for an order: integer sums of already-rounded lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    pub item_value: Money,
    pub gst_value: Money,
    /// Σ line totals (= item_value + gst_value).
    pub total: Money,
}

/// Sums per-line totals. The lines are already rounded, so the sums are
/// exact and reconcile with every partial view of the same data.
pub fn order_totals(lines: &[LineTotals]) -> OrderTotals {
    let mut totals = OrderTotals::default();
    for line in lines {
        totals.item_value += line.value;
        totals.gst_value += line.gst;
        totals.total += line.total;
    }
    totals
}

/// Flat 5% discount on the pre-tax item value only.
pub fn flat_discount(item_value: Money) -> Money {
    item_value.percentage(FLAT_DISCOUNT_BPS)
}

/// Post-discount, post-tax payable amount:
/// `(item_value − discount) + gst_value`.
pub fn grand_total(item_value: Money, gst_value: Money) -> Money {
    item_value - flat_discount(item_value) + gst_value
}

/// Grand total minus the advance already collected.
pub fn due_amount(grand_total: Money, advance: Money) -> Money {
    grand_total - advance
}

// =============================================================================
// Order Item Construction
// =============================================================================

/// Prices a grid cell into a frozen order line, snapshotting the product
/// name, design code, variant label, and unit price at checkout time.
pub fn price_cell(product: &Product, variant: &ProductVariant, cell: &GridCell) -> OrderItem {
    let line = line_totals(variant.price(), cell.qty, product.tax_rate());
    OrderItem {
        id: Uuid::new_v4().to_string(),
        variant_id: variant.id.clone(),
        product_name: product.name.clone(),
        design_id: product.design_id.clone(),
        variant_label: variant.label.clone(),
        price_paise: variant.price_paise,
        qty: cell.qty,
        tax_rate_bps: product.tax_rate_bps,
        value_paise: line.value.paise(),
        gst_paise: line.gst.paise(),
        total_paise: line.total.paise(),
    }
}

/// Prices a custom item into a frozen order line carrying the
/// [`CUSTOM_VARIANT_ID`] sentinel and the fixed 5% GST.
pub fn price_custom_item(item: &CustomLineItem) -> OrderItem {
    let line = custom_line_totals(item);
    OrderItem {
        id: Uuid::new_v4().to_string(),
        variant_id: CUSTOM_VARIANT_ID.to_string(),
        product_name: item.name.clone(),
        design_id: String::new(),
        variant_label: String::new(),
        price_paise: item.unit_price_paise,
        qty: item.quantity,
        tax_rate_bps: CUSTOM_ITEM_TAX_BPS,
        value_paise: line.value.paise(),
        gst_paise: line.gst.paise(),
        total_paise: line.total.paise(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductVariant;

    #[test]
    fn test_line_totals_exact() {
        // ₹100 × 3 @ 5% → value 300.00, gst 15.00, total 315.00
        let line = line_totals(Money::from_rupees(100), 3, TaxRate::from_bps(500));
        assert_eq!(line.value.paise(), 30000);
        assert_eq!(line.gst.paise(), 1500);
        assert_eq!(line.total.paise(), 31500);
    }

    #[test]
    fn test_line_totals_rounds_per_line() {
        // ₹33.33 × 1 @ 5% → gst 1.6665 → ₹1.67, total ₹35.00
        let line = line_totals(Money::from_paise(3333), 1, TaxRate::from_bps(500));
        assert_eq!(line.value.paise(), 3333);
        assert_eq!(line.gst.paise(), 167);
        assert_eq!(line.total.paise(), 3500);
    }

    #[test]
    fn test_aggregates_are_sums_of_rounded_lines() {
        // Three ₹33.33 lines: per-line gst rounds to 1.67 each, so the
        // aggregate is 5.01, not 5.00 as unrounded aggregation would give.
        let line = line_totals(Money::from_paise(3333), 1, TaxRate::from_bps(500));
        let totals = order_totals(&[line, line, line]);
        assert_eq!(totals.item_value.paise(), 9999);
        assert_eq!(totals.gst_value.paise(), 501);
        assert_eq!(totals.total.paise(), 10500);
    }

    #[test]
    fn test_grand_total_formula() {
        // item_value ₹1000, gst ₹50: grand = 1000×0.95 + 50 = ₹1000
        let grand = grand_total(Money::from_rupees(1000), Money::from_rupees(50));
        assert_eq!(grand.paise(), 100000);

        // advance ₹400 → due ₹600
        let due = due_amount(grand, Money::from_rupees(400));
        assert_eq!(due.paise(), 60000);
    }

    #[test]
    fn test_flat_discount_is_pre_tax_only() {
        let item_value = Money::from_rupees(1000);
        assert_eq!(flat_discount(item_value).paise(), 5000 * 1); // ₹50
        // GST plays no part in the discount base.
        assert_eq!(
            grand_total(item_value, Money::from_rupees(120)).paise(),
            95000 + 12000
        );
    }

    #[test]
    fn test_custom_item_gst_always_five_percent() {
        // price ₹200 → gst ₹10, total ₹210, even though the surrounding
        // cart may contain 12%-taxed products.
        let item = CustomLineItem::new("c1", "Fall & Pico", 1, Money::from_rupees(200));
        let line = custom_line_totals(&item);
        assert_eq!(line.gst.paise(), 1000);
        assert_eq!(line.total.paise(), 21000);
    }

    #[test]
    fn test_price_cell_snapshots_product_data() {
        let product = Product {
            id: "p1".into(),
            design_id: "D-9".into(),
            name: "Lehenga".into(),
            tax_rate_bps: 1200,
            active: true,
            variants: vec![ProductVariant {
                id: "v1".into(),
                label: "L".into(),
                sku: "LEH-L".into(),
                barcode: None,
                price_paise: 150000,
                stock_qty: 3,
            }],
        };
        let cell = GridCell {
            customer_id: "A".into(),
            variant_id: "v1".into(),
            qty: 2,
        };

        let item = price_cell(&product, &product.variants[0], &cell);
        assert_eq!(item.product_name, "Lehenga");
        assert_eq!(item.design_id, "D-9");
        assert_eq!(item.variant_label, "L");
        assert_eq!(item.qty, 2);
        assert_eq!(item.value_paise, 300000);
        assert_eq!(item.gst_paise, 36000); // 12%
        assert_eq!(item.total_paise, 336000);
        assert!(!item.is_custom());
    }

    #[test]
    fn test_price_custom_item_uses_sentinel() {
        let item = price_custom_item(&CustomLineItem::new(
            "c1",
            "Tassels",
            3,
            Money::from_rupees(50),
        ));
        assert_eq!(item.variant_id, CUSTOM_VARIANT_ID);
        assert_eq!(item.tax_rate_bps, CUSTOM_ITEM_TAX_BPS);
        assert_eq!(item.value_paise, 15000);
        assert_eq!(item.gst_paise, 750);
        assert!(item.is_custom());
    }
}
