//! # Bazaar DB
//!
//! SQLite persistence layer for Bazaar POS.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           bazaar-db                                     │
//! │                                                                         │
//! │  pool ────────── DbConfig + Database (SqlitePool, WAL, migrations)     │
//! │  migrations ──── embedded SQL migrations (sqlx::migrate!)              │
//! │  error ───────── DbError: typed constraint/conflict categorization     │
//! │  repository ──── catalog / order / session repositories                │
//! │                                                                         │
//! │  The checkout commit (order insert + guarded stock decrements) is      │
//! │  one transaction here; bazaar-core hands over a frozen Order plus      │
//! │  the committed cells and never touches SQL itself.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::catalog::CatalogRepository;
pub use repository::order::OrderRepository;
pub use repository::session::SessionRepository;
