//! # Domain Types
//!
//! Core domain types used throughout Bazaar POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  design_id      │   │  name / phone   │   │  order_no       │       │
//! │  │  tax_rate_bps   │   │  gst_number     │   │  status         │       │
//! │  │  variants[]     │   │  addresses      │   │  items[]        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ProductVariant  │   │    GridCell     │   │ CustomLineItem  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  label / sku    │   │  customer_id    │   │  name           │       │
//! │  │  price_paise    │   │  variant_id     │   │  quantity       │       │
//! │  │  stock_qty      │   │  qty (> 0)      │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (design_id, order_no, sku) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 500 bps = 5% GST, 1200 bps = 12% GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Catalog Entities
// =============================================================================

/// A sellable size/option of a product, with its own price and stock.
///
/// `stock_qty` is the total stock owned by the business, shared by all
/// in-progress carts. It only changes through a checkout commit (deduction)
/// or an administrative restock; the core reads it, never writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Size/variant name shown on the billing grid ("S", "M", "40x44").
    pub label: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Unit price in paise, excluding tax.
    pub price_paise: i64,

    /// Total stock owned by the business (NOT per-customer).
    pub stock_qty: i64,
}

impl ProductVariant {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

/// A product with an ordered list of variants.
///
/// Variants belong exclusively to one product. The product's GST rate
/// applies uniformly to all its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-facing design code ("D-1042").
    pub design_id: String,

    /// Display name.
    pub name: String,

    /// GST rate in basis points, applied to every variant.
    pub tax_rate_bps: u32,

    /// Whether the product is offered in selection UIs.
    /// Already-allocated inactive variants remain visible for
    /// in-progress carts.
    pub active: bool,

    /// Ordered list of variants.
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Returns the GST rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Looks up a variant by id.
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// True if the given variant belongs to this product.
    pub fn owns_variant(&self, variant_id: &str) -> bool {
        self.variant(variant_id).is_some()
    }
}

/// A customer. Independent of any cart; at most one *active* cart per
/// customer exists in the allocation grid at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub delivery_address: Option<String>,
    pub billing_address: Option<String>,
    pub gst_number: Option<String>,
    pub tag: Option<String>,
}

// =============================================================================
// Allocation Grid Entities
// =============================================================================

/// One non-zero entry in the allocation grid: `(customer, variant) → qty`.
///
/// Cells with `qty == 0` are removed, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub customer_id: String,
    pub variant_id: String,
    pub qty: i64,
}

/// An ad-hoc charge added during checkout, not tied to any catalog variant.
///
/// `price = quantity × unit_price`. GST is always a fixed 5% of `price`
/// regardless of any product's configured tax rate; custom items have no
/// catalog rate to reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomLineItem {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub price_paise: i64,
}

impl CustomLineItem {
    /// Creates a custom item, deriving `price` from quantity × unit price.
    pub fn new(id: impl Into<String>, name: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        CustomLineItem {
            id: id.into(),
            name: name.into(),
            quantity,
            unit_price_paise: unit_price.paise(),
            price_paise: unit_price.paise() * quantity,
        }
    }

    /// Returns the total price (quantity × unit price) as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Order lifecycle state machine.
///
/// ```text
/// created ──► confirmed ──► printed ──► dispatched (terminal)
///    │
///    └──────► cancelled (terminal)
/// ```
///
/// Customer info, notes, and custom items are only mutable while the
/// order is still `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Freshly checked out, awaiting acceptance.
    Created,
    /// Accepted by order management.
    Confirmed,
    /// Pick list / invoice printed.
    Printed,
    /// Handed to the transporter.
    Dispatched,
    /// Rejected or cancelled.
    Cancelled,
}

impl OrderStatus {
    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Illegal transitions are no-ops for the caller (bulk operations
    /// filter, they never error).
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Confirmed) | (Created, Cancelled) | (Confirmed, Printed) | (Printed, Dispatched)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Dispatched | OrderStatus::Cancelled)
    }

    /// Whether order details (customer info, note, custom items) may
    /// still be edited.
    pub fn is_editable(self) -> bool {
        self == OrderStatus::Created
    }

    /// Database/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Printed => "printed",
            OrderStatus::Dispatched => "dispatched",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the database/wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(OrderStatus::Created),
            "confirmed" => Some(OrderStatus::Confirmed),
            "printed" => Some(OrderStatus::Printed),
            "dispatched" => Some(OrderStatus::Dispatched),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Created
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment status of an order.
///
/// At checkout only `Pending` and `Paid` are ever derived; `Partial` is
/// reachable solely through a later manual edit in order management.
/// Once `Paid`, the status is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derivation used by the checkout commit: any advance marks the
    /// order paid, otherwise pending. `Partial` is never produced here.
    pub fn at_checkout(advance: Money) -> Self {
        if advance.is_positive() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        }
    }

    /// Whether a manual transition from `self` to `next` is legal.
    /// Only forward movement is allowed; `Paid` is terminal.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, Partial) | (Pending, Paid) | (Partial, Paid))
    }

    /// Database/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Parses the database/wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Order Type
// =============================================================================

/// Where the order originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OrderType {
    #[serde(rename = "POS")]
    Pos,
    Online,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Pos => "POS",
            OrderType::Online => "Online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "POS" => Some(OrderType::Pos),
            "Online" => Some(OrderType::Online),
            _ => None,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// Sentinel `variant_id` for ad-hoc custom line items on an order.
pub const CUSTOM_VARIANT_ID: &str = "custom";

/// The normalized, priced line on an order.
/// Uses the snapshot pattern: product data is frozen at checkout time,
/// so later catalog edits never change a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,

    /// Variant id, or [`CUSTOM_VARIANT_ID`] for ad-hoc items.
    pub variant_id: String,

    /// Product name at checkout (frozen).
    pub product_name: String,

    /// Design code at checkout (frozen).
    pub design_id: String,

    /// Variant label at checkout (frozen).
    pub variant_label: String,

    /// Unit price in paise at checkout (frozen).
    pub price_paise: i64,

    pub qty: i64,

    /// GST rate applied to this line.
    pub tax_rate_bps: u32,

    /// price × qty.
    pub value_paise: i64,

    /// GST on `value`, rounded per line.
    pub gst_paise: i64,

    /// value + gst.
    pub total_paise: i64,
}

impl OrderItem {
    /// True if this line is an ad-hoc custom item.
    pub fn is_custom(&self) -> bool {
        self.variant_id == CUSTOM_VARIANT_ID
    }
}

/// A persisted order, created atomically at checkout.
///
/// `items` are frozen at creation; `status`, `payment_status`, and `note`
/// remain mutable afterward through order management.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,

    /// Human-facing order number ("ORD-1724912345678-041").
    pub order_no: String,

    pub customer_id: String,

    /// Customer name snapshot (denormalized, not the live record).
    pub customer_name: String,

    pub group: Option<String>,
    pub marketer: Option<String>,
    pub transporter: Option<String>,
    pub delivery_address: Option<String>,
    pub note: Option<String>,

    /// Sum of line values (pre-tax, pre-discount).
    pub item_value_paise: i64,

    /// Sum of line GST amounts.
    pub gst_value_paise: i64,

    /// (item_value − flat discount) + gst_value.
    pub grand_total_paise: i64,

    /// Advance collected at checkout.
    pub advance_paise: i64,

    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub order_type: OrderType,

    pub items: Vec<OrderItem>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    pub created_by: String,
}

impl Order {
    /// Grand total as Money.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    /// Amount still due: grand total minus the advance.
    #[inline]
    pub fn due_amount(&self) -> Money {
        Money::from_paise(self.grand_total_paise - self.advance_paise)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
