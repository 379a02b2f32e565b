//! # Measures
//!
//! Weight in grams and box dimensions in whole centimetres.
//!
//! Same idea as [`crate::money::Money`]: integers at rest, conversions only
//! at the edges. The packing list says "7.5 kg"; the database says 7500.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use ts_rs::TS;

/// Air-freight volumetric divisor (cm³ per kg).
pub const VOLUMETRIC_DIVISOR: u64 = 5_000;

// =============================================================================
// Weight
// =============================================================================

/// A weight in grams.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    #[inline]
    pub const fn from_grams(grams: i64) -> Self {
        Weight(grams)
    }

    /// Converts a kilogram reading from the scale, rounding to the gram.
    ///
    /// ## Example
    /// ```rust
    /// use shipdesk_core::measure::Weight;
    ///
    /// assert_eq!(Weight::from_kg(7.5).grams(), 7_500);
    /// assert_eq!(Weight::from_kg(0.0004).grams(), 0);
    /// ```
    pub fn from_kg(kg: f64) -> Self {
        Weight((kg * 1000.0).round() as i64)
    }

    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    #[inline]
    pub const fn grams(&self) -> i64 {
        self.0
    }

    /// Kilograms, for display only.
    pub fn kg(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:03} kg", sign, abs / 1000, abs % 1000)
    }
}

impl Add for Weight {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Weight(self.0 + other.0)
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Mul<u32> for Weight {
    type Output = Self;

    fn mul(self, qty: u32) -> Self {
        Weight(self.0 * qty as i64)
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Self {
        iter.fold(Weight::zero(), |acc, w| acc + w)
    }
}

// =============================================================================
// Dimensions
// =============================================================================

/// Outer box dimensions in centimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dimensions {
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
}

impl Dimensions {
    pub const fn new(length_cm: u32, width_cm: u32, height_cm: u32) -> Self {
        Dimensions {
            length_cm,
            width_cm,
            height_cm,
        }
    }

    /// Volume in cubic centimetres.
    pub const fn volume_cm3(&self) -> u64 {
        self.length_cm as u64 * self.width_cm as u64 * self.height_cm as u64
    }

    /// Volumetric (dimensional) weight: L × W × H / 5000, in grams.
    ///
    /// ## Example
    /// ```rust
    /// use shipdesk_core::measure::Dimensions;
    ///
    /// // 50 × 40 × 30 = 60 000 cm³ → 12 kg
    /// let dims = Dimensions::new(50, 40, 30);
    /// assert_eq!(dims.volumetric_weight().grams(), 12_000);
    /// ```
    pub fn volumetric_weight(&self) -> Weight {
        // cm³ × 1000 g/kg / divisor, rounded to the gram
        let grams = (self.volume_cm3() * 1000 + VOLUMETRIC_DIVISOR / 2) / VOLUMETRIC_DIVISOR;
        Weight::from_grams(grams as i64)
    }

    /// True when no dimension has been entered yet.
    pub const fn is_unset(&self) -> bool {
        self.length_cm == 0 && self.width_cm == 0 && self.height_cm == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} cm",
            self.length_cm, self.width_cm, self.height_cm
        )
    }
}
