//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    ₹33.33 is stored as 3333 paise. GST at 5% is computed as             │
//! │    3333 × 500 bps = 166.65 paise, rounded half away from zero           │
//! │    to 167 paise (₹1.67), the exact behavior the billing grid,           │
//! │    the checkout drawer, and the persisted order must agree on.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Policy
//! Every percentage computation (GST, flat discount) rounds **half away
//! from zero at the paise level**, per line, before any aggregation.
//! Aggregate totals are plain integer sums of already-rounded lines, so
//! they never need re-rounding and always reconcile with the per-line view.
//!
//! ## Usage
//! ```rust
//! use bazaar_core::money::Money;
//!
//! // Create from paise (preferred)
//! let price = Money::from_paise(10050); // ₹100.50
//!
//! // Arithmetic operations
//! let doubled = price * 2;                        // ₹201.00
//! let total = price + Money::from_paise(500);     // ₹105.50
//!
//! // NEVER construct from floats; there is no such method.
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: allows negative values for adjustments and refunds
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let price = Money::from_paise(10099); // ₹100.99
    /// assert_eq!(price.paise(), 10099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise (smallest currency unit).
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// Line values (`unit price × qty`) are exact in integer arithmetic,
    /// so no rounding is involved here.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let unit_price = Money::from_paise(9950); // ₹99.50
    /// let line_value = unit_price.multiply_quantity(3);
    /// assert_eq!(line_value.paise(), 29850); // ₹298.50
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes a percentage of this amount, in basis points, rounded
    /// half away from zero at the paise level.
    ///
    /// ## Implementation
    /// Integer math in i128 to prevent overflow:
    /// `(amount × bps ± 5000) / 10000`; the `±5000` term applies the
    /// half-away-from-zero rounding (5000/10000 = 0.5 paise).
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let value = Money::from_paise(3333); // ₹33.33
    /// let gst = value.percentage(500);     // 5%
    /// // 3333 × 5% = 166.65 → rounds to 167 paise (₹1.67)
    /// assert_eq!(gst.paise(), 167);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let raw = self.0 as i128 * bps as i128;
        let rounded = if raw >= 0 {
            (raw + 5000) / 10000
        } else {
            (raw - 5000) / 10000
        };
        Money::from_paise(rounded as i64)
    }

    /// Calculates GST for this amount at the given tax rate.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    /// use bazaar_core::types::TaxRate;
    ///
    /// let value = Money::from_paise(30000); // ₹300.00
    /// let rate = TaxRate::from_bps(500);    // 5%
    /// assert_eq!(value.calculate_gst(rate).paise(), 1500); // ₹15.00
    /// ```
    #[inline]
    pub fn calculate_gst(&self, rate: TaxRate) -> Money {
        self.percentage(rate.bps())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// For debugging and logs; the frontend handles locale formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(10099);
        assert_eq!(money.paise(), 10099);
        assert_eq!(money.rupees(), 100);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_paise(10099)), "₹100.99");
        assert_eq!(format!("{}", Money::from_paise(500)), "₹5.00");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(format!("{}", Money::from_paise(0)), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);
    }

    #[test]
    fn test_percentage_exact() {
        // ₹300.00 at 5% = ₹15.00 exactly
        let value = Money::from_paise(30000);
        assert_eq!(value.percentage(500).paise(), 1500);
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        // 3333 × 5% = 166.65 → 167
        assert_eq!(Money::from_paise(3333).percentage(500).paise(), 167);
        // 1250 × 5% = 62.50 → 63 (half rounds away from zero)
        assert_eq!(Money::from_paise(1250).percentage(500).paise(), 63);
        // -1250 × 5% = -62.50 → -63
        assert_eq!(Money::from_paise(-1250).percentage(500).paise(), -63);
    }

    #[test]
    fn test_gst_matches_percentage() {
        let value = Money::from_paise(3333);
        let rate = TaxRate::from_bps(500);
        assert_eq!(value.calculate_gst(rate), value.percentage(500));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_paise(100).is_positive());
        assert!(Money::from_paise(-100).is_negative());
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 50].iter().map(|p| Money::from_paise(*p)).sum();
        assert_eq!(total.paise(), 400);
    }
}
