//! # Validation Module
//!
//! Input validation utilities for Bazaar POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (SPA)                                               │
//! │  ├── Basic format checks, input controls bounded by                    │
//! │  │   max_allowed_for_customer                                          │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation at the service        │
//! │           boundary, before the pricing engine runs                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pricing engine itself assumes validated input and does not
//! re-validate; the grid is the exception, clamping rather than erroring.

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::types::CustomLineItem;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer or product display name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity: must be strictly positive.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price: must be strictly positive.
/// Zero-priced ad-hoc charges are rejected at the input boundary.
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "unit price".to_string(),
        });
    }
    Ok(())
}

/// Validates an advance amount: non-negative, zero allowed.
pub fn validate_advance_amount(advance: Money) -> ValidationResult<()> {
    if advance.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "advance".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a custom line item before it enters a cart: name present,
/// positive quantity, positive unit price, and a consistent derived price.
pub fn validate_custom_item(item: &CustomLineItem) -> ValidationResult<()> {
    if item.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    validate_quantity(item.quantity)?;
    validate_unit_price(Money::from_paise(item.unit_price_paise))?;

    if item.price_paise != item.unit_price_paise * item.quantity {
        return Err(ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "must equal quantity × unit price".to_string(),
        });
    }

    Ok(())
}

/// Checks the advance against the grand total; the checkout drawer
/// rejects advances exceeding it. Uses the same grand-total value the
/// display uses, so validation and display cannot disagree.
pub fn validate_advance_within_total(advance: Money, grand_total: Money) -> Result<(), CoreError> {
    validate_advance_amount(advance)?;
    if advance > grand_total {
        return Err(CoreError::AdvanceExceedsGrandTotal {
            advance_paise: advance.paise(),
            grand_total_paise: grand_total.paise(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
