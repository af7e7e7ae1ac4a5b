//! Symmetric uncertainty bands around forecast totals.

use serde::{Deserialize, Serialize};

use crate::types::{Band, BandedTotals, DeliveryMetrics};

/// Default relative spread: totals are reported as base ±20%.
pub const DEFAULT_SPREAD: f64 = 0.2;

/// Fixed relative band `{v·(1−s), v, v·(1+s)}`.
///
/// Not derived from sample variance; a placeholder for real confidence
/// bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBand {
    spread: f64,
}

impl Default for UncertaintyBand {
    fn default() -> Self {
        Self {
            spread: DEFAULT_SPREAD,
        }
    }
}

impl UncertaintyBand {
    /// Returns `None` unless `0 <= spread < 1`.
    pub fn new(spread: f64) -> Option<Self> {
        (spread.is_finite() && (0.0..1.0).contains(&spread)).then_some(Self { spread })
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }

    pub fn apply(&self, value: f64) -> Band {
        Band {
            min: value * (1.0 - self.spread),
            base: value,
            max: value * (1.0 + self.spread),
        }
    }

    pub fn apply_totals(&self, totals: &DeliveryMetrics) -> BandedTotals {
        BandedTotals {
            impressions: self.apply(totals.impressions),
            clicks: self.apply(totals.clicks),
            conversions: self.apply(totals.conversions),
        }
    }
}
