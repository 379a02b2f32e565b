//! # Money Module
//!
//! Declared values and freight rates in integer minor units.
//!
//! ## Where Money Shows Up
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product.rate (per kg) × Product.weight × quantity ──► declared value   │
//! │                                                                         │
//! │  Σ declared value over every product ──► ShipmentTotals.declared_value  │
//! │                                                                         │
//! │  Rates are typed on the packing list as "4.50 / kg"; we store 450.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shipdesk_core::measure::Weight;
//! use shipdesk_core::money::Money;
//!
//! let rate = Money::from_cents(450);        // 4.50 per kg
//! let value = rate.per_kg(Weight::from_grams(2_500));
//! assert_eq!(value.cents(), 1125);          // 11.25
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::measure::Weight;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Currency is a property of the shipment's destination market and is not
/// tracked here; every amount in one shipment shares a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use shipdesk_core::money::Money;
    ///
    /// let rate = Money::from_cents(1099);
    /// assert_eq!(rate.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
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

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Treats `self` as a per-kilogram rate and prices `weight` with it.
    ///
    /// ## Rounding
    /// Half away from zero on the final minor unit:
    /// `(rate_cents × grams + 500) / 1000`
    ///
    /// ## Example
    /// ```rust
    /// use shipdesk_core::measure::Weight;
    /// use shipdesk_core::money::Money;
    ///
    /// // 3.33 / kg × 1.5 kg = 4.995 → 5.00
    /// let value = Money::from_cents(333).per_kg(Weight::from_grams(1_500));
    /// assert_eq!(value.cents(), 500);
    /// ```
    pub fn per_kg(&self, weight: Weight) -> Money {
        // i128 so that large rates on heavy pallets can't overflow
        let product = self.0 as i128 * weight.grams() as i128;
        let rounded = if product >= 0 {
            (product + 500) / 1000
        } else {
            (product - 500) / 1000
        };
        Money::from_cents(rounded as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0 * qty as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering, two decimal places, no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
