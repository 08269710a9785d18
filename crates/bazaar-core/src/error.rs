//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bazaar-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bazaar-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  bazaar-session errors                                                 │
//! │  └── PosError         - Service-level wrapper seen by callers          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → PosError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts)
//! 3. Errors are enum variants, never String
//!
//! Note the deliberate absence of an "allocation overflow" error: the
//! allocation grid clamps out-of-bound quantity requests silently, so the
//! cart is always in a valid state and the setter has nothing to signal.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The customer id is not part of the active billing session.
    #[error("Customer not in session: {0}")]
    CustomerNotInSession(String),

    /// The variant id does not exist in the loaded catalog.
    #[error("Variant not found in catalog: {0}")]
    VariantNotFound(String),

    /// Checkout was attempted with no allocated cells and no custom items.
    #[error("Cart for customer {0} is empty")]
    EmptyCart(String),

    /// The advance exceeds the order's grand total.
    ///
    /// Enforced at input time with the same formula the checkout drawer
    /// displays, so the validation and the display can never disagree.
    #[error("Advance {advance_paise} exceeds grand total {grand_total_paise}")]
    AdvanceExceedsGrandTotal {
        advance_paise: i64,
        grand_total_paise: i64,
    },

    /// A persisted session snapshot has a schema version this build
    /// does not know how to migrate.
    #[error("Unsupported session snapshot version: {0}")]
    UnsupportedSnapshotVersion(u32),

    /// A snapshot blob could not be parsed at all.
    #[error("Malformed session snapshot: {0}")]
    MalformedSnapshot(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements; they are caught
/// at the input boundary before the pricing engine runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::AdvanceExceedsGrandTotal {
            advance_paise: 150000,
            grand_total_paise: 100000,
        };
        assert_eq!(
            err.to_string(),
            "Advance 150000 exceeds grand total 100000"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "phone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
