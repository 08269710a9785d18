//! # Catalog Repository
//!
//! Products, variants, and customers. The in-memory
//! [`Catalog`](bazaar_core::Catalog) the billing session prices against is
//! loaded from here; stock only ever changes inside the order repository's
//! checkout transaction.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use bazaar_core::{Catalog, Customer, Product, ProductVariant};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    design_id: String,
    name: String,
    tax_rate_bps: i64,
    active: i64,
}

#[derive(Debug, FromRow)]
struct VariantRow {
    id: String,
    product_id: String,
    label: String,
    sku: String,
    barcode: Option<String>,
    price_paise: i64,
    stock_qty: i64,
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    phone: String,
    delivery_address: Option<String>,
    billing_address: Option<String>,
    gst_number: Option<String>,
    tag: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            phone: row.phone,
            delivery_address: row.delivery_address,
            billing_address: row.billing_address,
            gst_number: row.gst_number,
            tag: row.tag,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog and customer data.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Loads every product with its variants and builds the pricing
    /// catalog the session works against.
    pub async fn load_catalog(&self) -> DbResult<Catalog> {
        let product_rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, design_id, name, tax_rate_bps, active
             FROM products
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let variant_rows: Vec<VariantRow> = sqlx::query_as(
            "SELECT id, product_id, label, sku, barcode, price_paise, stock_qty
             FROM product_variants
             ORDER BY product_id, label",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut products: Vec<Product> = product_rows
            .into_iter()
            .map(|row| Product {
                id: row.id,
                design_id: row.design_id,
                name: row.name,
                tax_rate_bps: row.tax_rate_bps as u32,
                active: row.active != 0,
                variants: Vec::new(),
            })
            .collect();

        for row in variant_rows {
            if let Some(product) = products.iter_mut().find(|p| p.id == row.product_id) {
                product.variants.push(ProductVariant {
                    id: row.id,
                    label: row.label,
                    sku: row.sku,
                    barcode: row.barcode,
                    price_paise: row.price_paise,
                    stock_qty: row.stock_qty,
                });
            }
        }

        debug!(products = products.len(), "Catalog loaded");
        Ok(Catalog::new(products))
    }

    /// Inserts or fully replaces a product and its variant set.
    ///
    /// Variants absent from the new set are deleted; present ones are
    /// upserted keeping their stock when the caller passes it through.
    pub async fn upsert_product(&self, product: &Product) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO products (id, design_id, name, tax_rate_bps, active, updated_at)
             VALUES (?, ?, ?, ?, ?, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                 design_id = excluded.design_id,
                 name = excluded.name,
                 tax_rate_bps = excluded.tax_rate_bps,
                 active = excluded.active,
                 updated_at = excluded.updated_at",
        )
        .bind(&product.id)
        .bind(&product.design_id)
        .bind(&product.name)
        .bind(product.tax_rate_bps as i64)
        .bind(product.active as i64)
        .execute(&mut *tx)
        .await?;

        let keep_ids: Vec<&str> = product.variants.iter().map(|v| v.id.as_str()).collect();
        let placeholders = vec!["?"; keep_ids.len().max(1)].join(", ");
        let delete_sql = format!(
            "DELETE FROM product_variants WHERE product_id = ? AND id NOT IN ({placeholders})"
        );
        let mut delete = sqlx::query(&delete_sql).bind(&product.id);
        if keep_ids.is_empty() {
            delete = delete.bind("");
        } else {
            for id in &keep_ids {
                delete = delete.bind(*id);
            }
        }
        delete.execute(&mut *tx).await?;

        for variant in &product.variants {
            sqlx::query(
                "INSERT INTO product_variants
                     (id, product_id, label, sku, barcode, price_paise, stock_qty)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                     label = excluded.label,
                     sku = excluded.sku,
                     barcode = excluded.barcode,
                     price_paise = excluded.price_paise,
                     stock_qty = excluded.stock_qty",
            )
            .bind(&variant.id)
            .bind(&product.id)
            .bind(&variant.label)
            .bind(&variant.sku)
            .bind(&variant.barcode)
            .bind(variant.price_paise)
            .bind(variant.stock_qty)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(product_id = %product.id, "Product upserted");
        Ok(())
    }

    /// Adjusts a variant's stock by a signed delta (restock, correction).
    /// Refused if the result would go negative.
    pub async fn adjust_stock(&self, variant_id: &str, delta: i64) -> DbResult<i64> {
        let result = sqlx::query(
            "UPDATE product_variants
             SET stock_qty = stock_qty + ?
             WHERE id = ? AND stock_qty + ? >= 0",
        )
        .bind(delta)
        .bind(variant_id)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::StockConflict {
                variant_id: variant_id.to_string(),
                requested: -delta,
            });
        }

        let stock: i64 =
            sqlx::query_scalar("SELECT stock_qty FROM product_variants WHERE id = ?")
                .bind(variant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(stock)
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    /// All customers, name order.
    pub async fn list_customers(&self) -> DbResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(
            "SELECT id, name, phone, delivery_address, billing_address, gst_number, tag
             FROM customers
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Looks up one customer.
    pub async fn get_customer(&self, id: &str) -> DbResult<Customer> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, phone, delivery_address, billing_address, gst_number, tag
             FROM customers
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::from)
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Inserts or updates a customer record.
    pub async fn upsert_customer(&self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO customers
                 (id, name, phone, delivery_address, billing_address, gst_number, tag, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 phone = excluded.phone,
                 delivery_address = excluded.delivery_address,
                 billing_address = excluded.billing_address,
                 gst_number = excluded.gst_number,
                 tag = excluded.tag,
                 updated_at = excluded.updated_at",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.delivery_address)
        .bind(&customer.billing_address)
        .bind(&customer.gst_number)
        .bind(&customer.tag)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn kurta() -> Product {
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
                    barcode: Some("890123".into()),
                    price_paise: 20000,
                    stock_qty: 5,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_upsert_and_load_catalog() {
        let db = db().await;
        db.catalog().upsert_product(&kurta()).await.unwrap();

        let catalog = db.catalog().load_catalog().await.unwrap();
        let product = catalog.product("p1").unwrap();
        assert_eq!(product.name, "Kurta");
        assert_eq!(product.variants.len(), 2);

        let (_, variant) = catalog.variant("v2").unwrap();
        assert_eq!(variant.stock_qty, 5);
        assert_eq!(variant.barcode.as_deref(), Some("890123"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_variant_set() {
        let db = db().await;
        let mut product = kurta();
        db.catalog().upsert_product(&product).await.unwrap();

        // Drop the M variant and re-upsert.
        product.variants.truncate(1);
        db.catalog().upsert_product(&product).await.unwrap();

        let catalog = db.catalog().load_catalog().await.unwrap();
        assert!(catalog.variant("v1").is_some());
        assert!(catalog.variant("v2").is_none());
    }

    #[tokio::test]
    async fn test_adjust_stock_refuses_negative() {
        let db = db().await;
        db.catalog().upsert_product(&kurta()).await.unwrap();

        assert_eq!(db.catalog().adjust_stock("v2", 3).await.unwrap(), 8);
        assert_eq!(db.catalog().adjust_stock("v2", -8).await.unwrap(), 0);

        let err = db.catalog().adjust_stock("v2", -1).await.unwrap_err();
        assert!(matches!(err, DbError::StockConflict { .. }));
    }

    #[tokio::test]
    async fn test_customer_round_trip() {
        let db = db().await;
        let customer = Customer {
            id: "c1".into(),
            name: "Rukhsana Textiles".into(),
            phone: "9876543210".into(),
            delivery_address: Some("14 Cloth Market".into()),
            billing_address: None,
            gst_number: Some("27AAAPL1234C1ZV".into()),
            tag: Some("wholesale".into()),
        };
        db.catalog().upsert_customer(&customer).await.unwrap();

        let loaded = db.catalog().get_customer("c1").await.unwrap();
        assert_eq!(loaded, customer);

        let err = db.catalog().get_customer("ghost").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
