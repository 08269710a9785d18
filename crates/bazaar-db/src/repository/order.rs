//! # Order Repository
//!
//! Order persistence and the order status state machine.
//!
//! ## Checkout Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   commit_order (one transaction)                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    for each committed cell:                                             │
//! │      UPDATE product_variants                                            │
//! │      SET stock_qty = stock_qty - qty                                    │
//! │      WHERE id = ? AND stock_qty >= qty   ← guarded decrement           │
//! │           │                                                             │
//! │           ├── 0 rows → StockConflict → ROLLBACK (no order, no deduct)  │
//! │           ▼                                                             │
//! │    INSERT INTO orders (...)                                             │
//! │    INSERT INTO order_items (...) × N                                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The session tears its cart down only after COMMIT returns; a failed   │
//! │  persist leaves stock, order store, and cart exactly as they were.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Machine
//! ```text
//! created ──accept──► confirmed ──print──► printed ──dispatch──► dispatched
//!    │
//!    └──reject/cancel──► cancelled
//!
//! cancelled and dispatched are terminal. Transition legality lives in
//! bazaar-core (OrderStatus::can_transition_to); this repository enforces
//! it against the stored row and guards the UPDATE with the expected
//! current status so a concurrent edit cannot slip through.
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

use bazaar_core::{GridCell, Order, OrderItem, OrderStatus, OrderType, PaymentStatus};

use crate::error::{DbError, DbResult};

/// Process-wide sequence for the order number suffix.
static ORDER_SEQ: AtomicU64 = AtomicU64::new(0);

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    order_no: String,
    customer_id: String,
    customer_name: String,
    customer_group: Option<String>,
    marketer: Option<String>,
    transporter: Option<String>,
    delivery_address: Option<String>,
    note: Option<String>,
    item_value_paise: i64,
    gst_value_paise: i64,
    grand_total_paise: i64,
    advance_paise: i64,
    payment_status: String,
    status: String,
    order_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: String,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> DbResult<Order> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown order status '{}'", self.status)))?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            DbError::CorruptRow(format!("unknown payment status '{}'", self.payment_status))
        })?;
        let order_type = OrderType::parse(&self.order_type)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown order type '{}'", self.order_type)))?;

        Ok(Order {
            id: self.id,
            order_no: self.order_no,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            group: self.customer_group,
            marketer: self.marketer,
            transporter: self.transporter,
            delivery_address: self.delivery_address,
            note: self.note,
            item_value_paise: self.item_value_paise,
            gst_value_paise: self.gst_value_paise,
            grand_total_paise: self.grand_total_paise,
            advance_paise: self.advance_paise,
            payment_status,
            status,
            order_type,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: String,
    variant_id: String,
    product_name: String,
    design_id: String,
    variant_label: String,
    price_paise: i64,
    qty: i64,
    tax_rate_bps: i64,
    value_paise: i64,
    gst_paise: i64,
    total_paise: i64,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            design_id: row.design_id,
            variant_label: row.variant_label,
            price_paise: row.price_paise,
            qty: row.qty,
            tax_rate_bps: row.tax_rate_bps as u32,
            value_paise: row.value_paise,
            gst_paise: row.gst_paise,
            total_paise: row.total_paise,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order commit, retrieval, and status management.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Generates the next order number: `ORD-<unix millis>-<seq>`.
    ///
    /// The three-digit suffix comes from a monotonic process-wide counter,
    /// so two checkouts within the same millisecond still get distinct
    /// numbers (the UNIQUE index on `order_no` backs this up).
    pub fn generate_order_no() -> String {
        let millis = Utc::now().timestamp_millis();
        let seq = ORDER_SEQ.fetch_add(1, Ordering::Relaxed) % 1000;
        format!("ORD-{millis}-{seq:03}")
    }

    // -------------------------------------------------------------------------
    // Checkout commit
    // -------------------------------------------------------------------------

    /// Persists a checkout atomically: stock decrements for every
    /// committed cell, the order row, and its items, all in one
    /// transaction.
    ///
    /// ## Errors
    /// - [`DbError::StockConflict`] if any variant no longer holds the
    ///   committed quantity; nothing is persisted and nothing is deducted
    /// - [`DbError::UniqueViolation`] on a duplicate order number
    pub async fn commit_order(&self, order: &Order, cells: &[GridCell]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for cell in cells {
            let result = sqlx::query(
                "UPDATE product_variants
                 SET stock_qty = stock_qty - ?
                 WHERE id = ? AND stock_qty >= ?",
            )
            .bind(cell.qty)
            .bind(&cell.variant_id)
            .bind(cell.qty)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                warn!(
                    variant_id = %cell.variant_id,
                    qty = cell.qty,
                    "Stock conflict during checkout, rolling back"
                );
                return Err(DbError::StockConflict {
                    variant_id: cell.variant_id.clone(),
                    requested: cell.qty,
                });
            }
        }

        sqlx::query(
            "INSERT INTO orders
                 (id, order_no, customer_id, customer_name, customer_group, marketer,
                  transporter, delivery_address, note, item_value_paise, gst_value_paise,
                  grand_total_paise, advance_paise, payment_status, status, order_type,
                  created_at, updated_at, created_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(&order.order_no)
        .bind(&order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.group)
        .bind(&order.marketer)
        .bind(&order.transporter)
        .bind(&order.delivery_address)
        .bind(&order.note)
        .bind(order.item_value_paise)
        .bind(order.gst_value_paise)
        .bind(order.grand_total_paise)
        .bind(order.advance_paise)
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(order.order_type.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(&order.created_by)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items
                     (id, order_id, variant_id, product_name, design_id, variant_label,
                      price_paise, qty, tax_rate_bps, value_paise, gst_paise, total_paise)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(&item.variant_id)
            .bind(&item.product_name)
            .bind(&item.design_id)
            .bind(&item.variant_label)
            .bind(item.price_paise)
            .bind(item.qty)
            .bind(item.tax_rate_bps as i64)
            .bind(item.value_paise)
            .bind(item.gst_paise)
            .bind(item.total_paise)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            order_no = %order.order_no,
            grand_total_paise = order.grand_total_paise,
            "Order committed"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Retrieval
    // -------------------------------------------------------------------------

    async fn load_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, variant_id, product_name, design_id, variant_label,
                    price_paise, qty, tax_rate_bps, value_paise, gst_paise, total_paise
             FROM order_items
             WHERE order_id = ?
             ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    /// Loads one order with its items.
    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Order> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, order_no, customer_id, customer_name, customer_group, marketer,
                    transporter, delivery_address, note, item_value_paise, gst_value_paise,
                    grand_total_paise, advance_paise, payment_status, status, order_type,
                    created_at, updated_at, created_by
             FROM orders
             WHERE id = ?",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| DbError::not_found("Order", order_id))?;
        let items = self.load_items(order_id).await?;
        row.into_order(items)
    }

    /// Most recent orders first, items included.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT id, order_no, customer_id, customer_name, customer_group, marketer,
                    transporter, delivery_address, note, item_value_paise, gst_value_paise,
                    grand_total_paise, advance_paise, payment_status, status, order_type,
                    created_at, updated_at, created_by
             FROM orders
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(&row.id).await?;
            orders.push(row.into_order(items)?);
        }
        Ok(orders)
    }

    // -------------------------------------------------------------------------
    // Status machine
    // -------------------------------------------------------------------------

    async fn current_status(&self, order_id: &str) -> DbResult<OrderStatus> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        let status = status.ok_or_else(|| DbError::not_found("Order", order_id))?;
        OrderStatus::parse(&status)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown order status '{status}'")))
    }

    /// Applies one legal status transition.
    ///
    /// The UPDATE is guarded with the expected current status, so a
    /// concurrent transition makes this fail instead of double-applying.
    pub async fn update_status(&self, order_id: &str, new_status: OrderStatus) -> DbResult<()> {
        let current = self.current_status(order_id).await?;
        if !current.can_transition_to(new_status) {
            return Err(DbError::invalid_transition(
                order_id,
                format!("{} -> {}", current.as_str(), new_status.as_str()),
            ));
        }

        let result = sqlx::query(
            "UPDATE orders
             SET status = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(new_status.as_str())
        .bind(Utc::now())
        .bind(order_id)
        .bind(current.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_transition(
                order_id,
                "status changed concurrently".to_string(),
            ));
        }

        debug!(order_id, status = new_status.as_str(), "Order status updated");
        Ok(())
    }

    /// Bulk accept: confirms the given orders, silently skipping any not
    /// currently in `created`. Returns the number confirmed.
    pub async fn accept_all(&self, order_ids: &[String]) -> DbResult<u64> {
        self.bulk_transition(order_ids, OrderStatus::Confirmed).await
    }

    /// Bulk reject: cancels the given orders, silently skipping any not
    /// currently in `created`. Returns the number cancelled.
    pub async fn reject_all(&self, order_ids: &[String]) -> DbResult<u64> {
        self.bulk_transition(order_ids, OrderStatus::Cancelled).await
    }

    async fn bulk_transition(&self, order_ids: &[String], target: OrderStatus) -> DbResult<u64> {
        // Orders outside `created` are filtered by the WHERE clause, not
        // errored: the batch applies the single-order rule independently.
        let mut applied = 0u64;
        for order_id in order_ids {
            let result = sqlx::query(
                "UPDATE orders
                 SET status = ?, updated_at = ?
                 WHERE id = ? AND status = 'created'",
            )
            .bind(target.as_str())
            .bind(Utc::now())
            .bind(order_id)
            .execute(&self.pool)
            .await?;
            applied += result.rows_affected();
        }
        info!(target = target.as_str(), applied, "Bulk status transition");
        Ok(applied)
    }

    /// Moves an order's payment status forward. `paid` is terminal.
    pub async fn update_payment_status(
        &self,
        order_id: &str,
        new_status: PaymentStatus,
    ) -> DbResult<()> {
        let current: Option<String> =
            sqlx::query_scalar("SELECT payment_status FROM orders WHERE id = ?")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;
        let current = current.ok_or_else(|| DbError::not_found("Order", order_id))?;
        let current = PaymentStatus::parse(&current)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown payment status '{current}'")))?;

        if !current.can_transition_to(new_status) {
            return Err(DbError::invalid_transition(
                order_id,
                format!("payment {} -> {}", current.as_str(), new_status.as_str()),
            ));
        }

        sqlx::query(
            "UPDATE orders
             SET payment_status = ?, updated_at = ?
             WHERE id = ? AND payment_status = ?",
        )
        .bind(new_status.as_str())
        .bind(Utc::now())
        .bind(order_id)
        .bind(current.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Edits (only while created)
    // -------------------------------------------------------------------------

    /// Updates the free-text note. Only orders still in `created` are
    /// editable; anything later is frozen.
    pub async fn update_note(&self, order_id: &str, note: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET note = ?, updated_at = ? WHERE id = ? AND status = 'created'",
        )
        .bind(note)
        .bind(Utc::now())
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        self.check_edited(order_id, result.rows_affected()).await
    }

    /// Updates the denormalized customer info on a still-editable order.
    pub async fn update_customer_info(
        &self,
        order_id: &str,
        customer_name: &str,
        delivery_address: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders
             SET customer_name = ?, delivery_address = ?, updated_at = ?
             WHERE id = ? AND status = 'created'",
        )
        .bind(customer_name)
        .bind(delivery_address)
        .bind(Utc::now())
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        self.check_edited(order_id, result.rows_affected()).await
    }

    /// Distinguishes "no such order" from "no longer editable" after a
    /// status-guarded UPDATE touched zero rows.
    async fn check_edited(&self, order_id: &str, rows_affected: u64) -> DbResult<()> {
        if rows_affected > 0 {
            return Ok(());
        }
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            None => Err(DbError::not_found("Order", order_id)),
            Some(_) => Err(DbError::invalid_transition(
                order_id,
                "only created orders are editable",
            )),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bazaar_core::{Money, Product, ProductVariant};
    use uuid::Uuid;

    async fn seeded_db() -> Database {
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
        db
    }

    fn test_order(qty: i64) -> (Order, Vec<GridCell>) {
        let value = 10000 * qty;
        let gst = value * 5 / 100;
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_no: OrderRepository::generate_order_no(),
            customer_id: "c1".into(),
            customer_name: "Rukhsana Textiles".into(),
            group: None,
            marketer: None,
            transporter: None,
            delivery_address: None,
            note: None,
            item_value_paise: value,
            gst_value_paise: gst,
            grand_total_paise: value * 95 / 100 + gst,
            advance_paise: 0,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Created,
            order_type: OrderType::Pos,
            items: vec![OrderItem {
                id: Uuid::new_v4().to_string(),
                variant_id: "v1".into(),
                product_name: "Kurta".into(),
                design_id: "D-1".into(),
                variant_label: "S".into(),
                price_paise: 10000,
                qty,
                tax_rate_bps: 500,
                value_paise: value,
                gst_paise: gst,
                total_paise: value + gst,
            }],
            created_at: now,
            updated_at: now,
            created_by: "cashier-1".into(),
        };
        let cells = vec![GridCell {
            customer_id: "c1".into(),
            variant_id: "v1".into(),
            qty,
        }];
        (order, cells)
    }

    async fn stock(db: &Database, variant_id: &str) -> i64 {
        sqlx::query_scalar("SELECT stock_qty FROM product_variants WHERE id = ?")
            .bind(variant_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_order_deducts_stock() {
        let db = seeded_db().await;
        let (order, cells) = test_order(4);

        db.orders().commit_order(&order, &cells).await.unwrap();
        assert_eq!(stock(&db, "v1").await, 6);

        let loaded = db.orders().get_by_id(&order.id).await.unwrap();
        assert_eq!(loaded.order_no, order.order_no);
        assert_eq!(loaded.status, OrderStatus::Created);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].qty, 4);
        assert_eq!(loaded.grand_total_paise, order.grand_total_paise);
    }

    #[tokio::test]
    async fn test_stock_conflict_rolls_back_everything() {
        let db = seeded_db().await;
        let (order, cells) = test_order(11); // stock is only 10

        let err = db.orders().commit_order(&order, &cells).await.unwrap_err();
        assert!(matches!(err, DbError::StockConflict { .. }));

        // Nothing persisted, nothing deducted.
        assert_eq!(stock(&db, "v1").await, 10);
        assert!(matches!(
            db.orders().get_by_id(&order.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_order_no_format_and_uniqueness() {
        let a = OrderRepository::generate_order_no();
        let b = OrderRepository::generate_order_no();
        assert_ne!(a, b);

        let parts: Vec<&str> = a.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 3);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = seeded_db().await;
        let (order, cells) = test_order(1);
        db.orders().commit_order(&order, &cells).await.unwrap();

        db.orders()
            .update_status(&order.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        db.orders()
            .update_status(&order.id, OrderStatus::Printed)
            .await
            .unwrap();
        db.orders()
            .update_status(&order.id, OrderStatus::Dispatched)
            .await
            .unwrap();

        // dispatched is terminal
        let err = db
            .orders()
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_bulk_accept_skips_non_created() {
        let db = seeded_db().await;
        let (a, cells_a) = test_order(1);
        let (b, cells_b) = test_order(1);
        db.orders().commit_order(&a, &cells_a).await.unwrap();
        db.orders().commit_order(&b, &cells_b).await.unwrap();

        // Move `a` out of created; bulk accept must skip it silently.
        db.orders()
            .update_status(&a.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let applied = db
            .orders()
            .accept_all(&[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(
            db.orders().get_by_id(&a.id).await.unwrap().status,
            OrderStatus::Cancelled
        );
        assert_eq!(
            db.orders().get_by_id(&b.id).await.unwrap().status,
            OrderStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_paid_is_terminal() {
        let db = seeded_db().await;
        let (order, cells) = test_order(1);
        db.orders().commit_order(&order, &cells).await.unwrap();

        db.orders()
            .update_payment_status(&order.id, PaymentStatus::Paid)
            .await
            .unwrap();
        let err = db
            .orders()
            .update_payment_status(&order.id, PaymentStatus::Partial)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_edits_only_while_created() {
        let db = seeded_db().await;
        let (order, cells) = test_order(1);
        db.orders().commit_order(&order, &cells).await.unwrap();

        db.orders()
            .update_note(&order.id, Some("pack separately"))
            .await
            .unwrap();
        db.orders()
            .update_status(&order.id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let err = db
            .orders()
            .update_note(&order.id, Some("too late"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition { .. }));
        assert_eq!(
            db.orders().get_by_id(&order.id).await.unwrap().note.as_deref(),
            Some("pack separately")
        );
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let db = seeded_db().await;
        let (mut a, cells_a) = test_order(1);
        let (mut b, cells_b) = test_order(1);
        a.created_at = Utc::now() - chrono::Duration::minutes(5);
        b.created_at = Utc::now();
        db.orders().commit_order(&a, &cells_a).await.unwrap();
        db.orders().commit_order(&b, &cells_b).await.unwrap();

        let recent = db.orders().list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, b.id);
        assert_eq!(recent[1].id, a.id);

        // due = grand − advance survives the round trip
        assert_eq!(
            recent[0].due_amount(),
            Money::from_paise(recent[0].grand_total_paise - recent[0].advance_paise)
        );
    }
}
