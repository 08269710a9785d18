//! # Bazaar Core
//!
//! Pure business logic for the Bazaar POS billing grid: money arithmetic,
//! the catalog/stock ledger, the multi-customer allocation grid, the order
//! pricing engine, and the billing session aggregate.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          bazaar-core                                    │
//! │                                                                         │
//! │  money ──────── integer paise arithmetic, half-away-from-zero rounding │
//! │  types ──────── products, variants, customers, orders, status machines │
//! │  catalog ────── stock ledger: availability derived from live cells     │
//! │  grid ───────── sparse customer × variant allocation matrix            │
//! │  pricing ────── cells + custom items → frozen order lines & totals     │
//! │  session ────── the aggregate: carts, checkout state, build_order      │
//! │  snapshot ───── versioned persistable image of a session               │
//! │  validation ─── input checks at the service boundary                   │
//! │                                                                         │
//! │  No I/O, no async, no database: everything here is deterministic and   │
//! │  unit-testable. Persistence lives in bazaar-db, orchestration in       │
//! │  bazaar-session.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Invariant
//! All amounts are integer paise (`i64`). Floating point never touches a
//! price; percentage math rounds half away from zero at the paise level,
//! per line, before aggregation.

pub mod catalog;
pub mod error;
pub mod grid;
pub mod money;
pub mod pricing;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod validation;

pub use catalog::Catalog;
pub use error::{CoreError, CoreResult, ValidationError};
pub use grid::{AllocationGrid, ProductAggregate};
pub use money::Money;
pub use session::{CheckoutPreview, OrderDetails, Session};
pub use snapshot::{SessionSnapshot, SCHEMA_VERSION};
pub use types::{
    Customer, CustomLineItem, GridCell, Order, OrderItem, OrderStatus, OrderType, PaymentStatus,
    Product, ProductVariant, TaxRate, CUSTOM_VARIANT_ID,
};
