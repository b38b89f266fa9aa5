//! CPM-based revenue calculation.
//!
//! Revenue per monetized view is `cpm / 1000` currency units. That revenue is
//! split 55% to the creator and 45% to the platform.
//!
//! Amounts are held as integer micros (1 unit = 1 000 000 micros). With an
//! integer CPM the per-view revenue is `cpm * 1000` micros, which keeps both
//! shares exact and guarantees `creator + platform == total`.

use serde::{Deserialize, Serialize};

use crate::error::{MonetizationError, Result};

/// Micros per currency unit.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Creator share of ad revenue, in percent.
pub const CREATOR_SHARE_PERCENT: i64 = 55;

/// Platform share of ad revenue, in percent.
pub const PLATFORM_SHARE_PERCENT: i64 = 100 - CREATOR_SHARE_PERCENT;

/// CPM assigned to newly registered videos.
pub const DEFAULT_CPM: i64 = 100;

/// Lowest CPM a creator may set.
pub const MIN_CPM: i64 = 10;

/// Highest CPM a creator may set.
pub const MAX_CPM: i64 = 1000;

/// Revenue generated by a single monetized view and its split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSplit {
    /// CPM used for the calculation.
    pub cpm: i64,
    /// Total revenue for the view, in micros.
    pub total_micros: i64,
    /// Creator's share, in micros.
    pub creator_micros: i64,
    /// Platform's share, in micros.
    pub platform_micros: i64,
}

impl RevenueSplit {
    /// Compute the per-view revenue split for a CPM.
    ///
    /// # Errors
    ///
    /// Returns [`MonetizationError::InvalidCpm`] if `cpm` is not positive.
    pub fn from_cpm(cpm: i64) -> Result<Self> {
        let total_micros = revenue_per_view_micros(cpm)?;
        let creator_micros = total_micros * CREATOR_SHARE_PERCENT / 100;

        Ok(Self {
            cpm,
            total_micros,
            creator_micros,
            platform_micros: total_micros - creator_micros,
        })
    }

    /// Total revenue in currency units.
    #[must_use]
    pub fn total(&self) -> f64 {
        micros_to_units(self.total_micros)
    }

    /// Creator share in currency units.
    #[must_use]
    pub fn creator(&self) -> f64 {
        micros_to_units(self.creator_micros)
    }

    /// Platform share in currency units.
    #[must_use]
    pub fn platform(&self) -> f64 {
        micros_to_units(self.platform_micros)
    }
}

/// Revenue of one monetized view at the given CPM, in micros.
///
/// # Errors
///
/// Returns [`MonetizationError::InvalidCpm`] if `cpm` is not positive.
pub fn revenue_per_view_micros(cpm: i64) -> Result<i64> {
    if cpm <= 0 {
        return Err(MonetizationError::InvalidCpm {
            cpm,
            min: 1,
            max: i64::MAX / MICROS_PER_UNIT,
        });
    }
    cpm.checked_mul(MICROS_PER_UNIT / 1000)
        .ok_or_else(|| MonetizationError::InvalidAmount(format!("CPM {cpm} overflows")))
}

/// Check that a creator-supplied CPM lies within `[MIN_CPM, MAX_CPM]`.
///
/// # Errors
///
/// Returns [`MonetizationError::InvalidCpm`] when out of range.
pub fn validate_cpm(cpm: i64) -> Result<i64> {
    if (MIN_CPM..=MAX_CPM).contains(&cpm) {
        Ok(cpm)
    } else {
        Err(MonetizationError::InvalidCpm {
            cpm,
            min: MIN_CPM,
            max: MAX_CPM,
        })
    }
}

/// Convert micros to currency units.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn micros_to_units(micros: i64) -> f64 {
    micros as f64 / MICROS_PER_UNIT as f64
}

/// Convert a currency amount to micros, rounding to the nearest micro.
///
/// # Errors
///
/// Returns [`MonetizationError::InvalidAmount`] for non-finite or
/// out-of-range input.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn units_to_micros(units: f64) -> Result<i64> {
    if !units.is_finite() {
        return Err(MonetizationError::InvalidAmount(
            "amount must be a finite number".into(),
        ));
    }
    let micros = (units * MICROS_PER_UNIT as f64).round();
    if micros.abs() >= i64::MAX as f64 {
        return Err(MonetizationError::InvalidAmount("amount is too large".into()));
    }
    Ok(micros as i64)
}
