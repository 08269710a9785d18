//! # Session Snapshot
//!
//! The versioned, serializable image of a [`Session`](crate::session::Session).
//! Saved as a JSON blob by the persistence layer and restored on startup so
//! an interrupted billing session survives a restart.
//!
//! ## Versioning
//! Every snapshot carries a `schemaVersion`. Loading applies migrations for
//! older versions and refuses anything newer than this build understands;
//! silently reinterpreting a future schema could corrupt live carts.
//!
//! ```text
//! v1 → v2: custom line items gained an explicit quantity and unit price.
//!          A v1 item only stored its total price; migration defaults
//!          quantity = 1 and unitPrice = price.
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::session::OrderDetails;
use crate::types::{CustomLineItem, GridCell};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 2;

fn default_schema_version() -> u32 {
    // The pre-versioning blob had no marker at all.
    1
}

/// The full persistable state of a billing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub customer_ids: Vec<String>,
    pub product_ids: Vec<String>,
    pub cells: Vec<GridCell>,
    pub order_details: HashMap<String, OrderDetails>,
    pub custom_items: HashMap<String, Vec<CustomLineItem>>,
    /// Displayed flat-discount amounts, paise, keyed by customer id.
    pub discounts: HashMap<String, i64>,
    /// Collected advances, paise, keyed by customer id.
    pub advance_amounts: HashMap<String, i64>,
    #[ts(as = "String")]
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Serializes the snapshot to the JSON blob the session store keeps.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::MalformedSnapshot(e.to_string()))
    }

    /// Parses a stored blob, applying schema migrations as needed.
    ///
    /// ## Errors
    /// - [`CoreError::UnsupportedSnapshotVersion`] for blobs newer than
    ///   [`SCHEMA_VERSION`]
    /// - [`CoreError::MalformedSnapshot`] for anything that does not parse
    pub fn from_json(raw: &str) -> CoreResult<SessionSnapshot> {
        let mut value: Value =
            serde_json::from_str(raw).map_err(|e| CoreError::MalformedSnapshot(e.to_string()))?;
        if !value.is_object() {
            return Err(CoreError::MalformedSnapshot(
                "snapshot root must be an object".to_string(),
            ));
        }

        let version = value
            .get("schemaVersion")
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;

        if version > SCHEMA_VERSION {
            return Err(CoreError::UnsupportedSnapshotVersion(version));
        }
        if version < 2 {
            migrate_v1_custom_items(&mut value);
            value["schemaVersion"] = Value::from(2u32);
        }

        serde_json::from_value(value).map_err(|e| CoreError::MalformedSnapshot(e.to_string()))
    }
}

/// v1 custom items stored only `pricePaise`. The two added fields are
/// defaulted independently, so a blob where one of them already exists
/// (a partially written upgrade) still loads: a missing quantity
/// becomes 1, a missing unit price is derived from the price and
/// whatever quantity the item ends up with.
fn migrate_v1_custom_items(value: &mut Value) {
    let Some(by_customer) = value
        .get_mut("customItems")
        .and_then(Value::as_object_mut)
    else {
        return;
    };

    for items in by_customer.values_mut() {
        let Some(items) = items.as_array_mut() else {
            continue;
        };
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            if !item.contains_key("quantity") {
                item.insert("quantity".to_string(), Value::from(1));
            }
            if !item.contains_key("unitPricePaise") {
                let price = item.get("pricePaise").and_then(Value::as_i64).unwrap_or(0);
                let qty = item
                    .get("quantity")
                    .and_then(Value::as_i64)
                    .filter(|q| *q > 0)
                    .unwrap_or(1);
                item.insert("unitPricePaise".to_string(), Value::from(price / qty));
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
