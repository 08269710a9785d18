//! # Repository Module
//!
//! Database repository implementations for Bazaar POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service layer                                                         │
//! │       │                                                                 │
//! │       │  db.orders().commit_order(&order, &cells)                      │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── commit_order(&self, order, cells)   ← one transaction            │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── update_status(&self, id, status)                                  │
//! │  └── ...                                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  SQL is isolated here; callers see typed domain structs and DbError.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products, variants, customers
//! - [`order::OrderRepository`] - Order commit, retrieval, status machine
//! - [`session::SessionRepository`] - Billing session snapshot blob

pub mod catalog;
pub mod order;
pub mod session;
