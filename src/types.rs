//! Core data types for campaign forecasting
//!
//! Shared by the benchmark store, the forecast engine, the HTTP layer and
//! the archive. Rate fields serialize with upper-case keys (`CTR`, `CPM`,
//! ...) to match the JSON the dashboard consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Pricing Mode
// ============================================================================

/// How the advertiser pays for the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PricingMode {
    /// Cost per thousand impressions
    Cpm,
    /// Cost per click
    Cpc,
    /// Cost per acquisition (conversion)
    Cpa,
}

impl PricingMode {
    pub const ALL: [PricingMode; 3] = [PricingMode::Cpm, PricingMode::Cpc, PricingMode::Cpa];

    /// Short code used in API payloads and emails
    pub fn short_code(&self) -> &'static str {
        match self {
            PricingMode::Cpm => "CPM",
            PricingMode::Cpc => "CPC",
            PricingMode::Cpa => "CPA",
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_code())
    }
}

/// Error returned when a pricing mode string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pricing mode '{0}', expected CPM, CPC or CPA")]
pub struct UnknownPricingMode(pub String);

impl FromStr for PricingMode {
    type Err = UnknownPricingMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPM" => Ok(PricingMode::Cpm),
            "CPC" => Ok(PricingMode::Cpc),
            "CPA" => Ok(PricingMode::Cpa),
            _ => Err(UnknownPricingMode(s.to_string())),
        }
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Composite lookup key: category first, then ISO-3166 alpha-2 country.
///
/// Equality and hashing are defined over the two fields, so categories
/// containing separator characters cannot collide with other keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BenchmarkKey {
    pub category: String,
    pub country_code: String,
}

impl BenchmarkKey {
    /// Build a key, trimming the category and upper-casing the country code.
    pub fn new(category: impl AsRef<str>, country_code: impl AsRef<str>) -> Self {
        Self {
            category: category.as_ref().trim().to_string(),
            country_code: country_code.as_ref().trim().to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.country_code)
    }
}

/// Expected click-through rate and unit costs for one category/country.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    #[serde(rename = "CTR")]
    pub ctr: f64,
    #[serde(rename = "CPM")]
    pub cpm: f64,
    #[serde(rename = "CPC")]
    pub cpc: f64,
    #[serde(rename = "CPA")]
    pub cpa: f64,
}

impl Default for BenchmarkRecord {
    /// Fallback record returned for unknown keys.
    fn default() -> Self {
        Self {
            ctr: 0.01,
            cpm: 5.0,
            cpc: 1.0,
            cpa: 10.0,
        }
    }
}

impl BenchmarkRecord {
    /// Unit cost the advertiser pays under `mode`.
    pub fn unit_cost(&self, mode: PricingMode) -> f64 {
        match mode {
            PricingMode::Cpm => self.cpm,
            PricingMode::Cpc => self.cpc,
            PricingMode::Cpa => self.cpa,
        }
    }
}

// ============================================================================
// Forecast Input
// ============================================================================

/// Range-checked forecast request, one per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInput {
    pub mode: PricingMode,
    pub daily_budget: f64,
    pub duration_days: u32,
    pub monthly_conversions_avg: f64,
    pub monthly_unique_users_avg: f64,
    pub category: String,
    pub country_code: String,
    /// Caller-supplied unit cost for the selected mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
    /// Caller-supplied click-through rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctr_override: Option<f64>,
}

impl ForecastInput {
    pub fn benchmark_key(&self) -> BenchmarkKey {
        BenchmarkKey::new(&self.category, &self.country_code)
    }
}

/// Optional contact details submitted alongside a forecast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ============================================================================
// Forecast Result
// ============================================================================

/// Resolved rates used by a forecast. Two of the three costs are derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    #[serde(rename = "CTR")]
    pub ctr: f64,
    #[serde(rename = "CVR")]
    pub cvr: f64,
    #[serde(rename = "CPM")]
    pub cpm: f64,
    #[serde(rename = "CPC")]
    pub cpc: f64,
    #[serde(rename = "CPA")]
    pub cpa: f64,
}

/// Point values for impressions, clicks and conversions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
}

impl DeliveryMetrics {
    /// Multiply every metric by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            impressions: self.impressions * factor,
            clicks: self.clicks * factor,
            conversions: self.conversions * factor,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> {
        [self.impressions, self.clicks, self.conversions].into_iter()
    }
}

/// A value with symmetric lower and upper bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub base: f64,
    pub max: f64,
}

/// Campaign totals, each wrapped in an uncertainty band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandedTotals {
    pub impressions: Band,
    pub clicks: Band,
    pub conversions: Band,
}

/// Complete forecast returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub mode: PricingMode,
    pub rates: Rates,
    pub daily: DeliveryMetrics,
    pub totals: BandedTotals,
}

// ============================================================================
// Archive Entry
// ============================================================================

/// A forecast as persisted in the archive and sent in notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    pub inputs: ForecastInput,
    #[serde(default)]
    pub contact: Contact,
    pub result: ForecastResult,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_mode_parses_case_insensitively() {
        assert_eq!("cpm".parse::<PricingMode>(), Ok(PricingMode::Cpm));
        assert_eq!(" CPC ".parse::<PricingMode>(), Ok(PricingMode::Cpc));
        assert_eq!("Cpa".parse::<PricingMode>(), Ok(PricingMode::Cpa));
        assert!("CPV".parse::<PricingMode>().is_err());
    }

    #[test]
    fn test_pricing_mode_serializes_upper_case() {
        let json = serde_json::to_string(&PricingMode::Cpa).unwrap();
        assert_eq!(json, "\"CPA\"");
    }

    #[test]
    fn test_benchmark_key_normalizes_fields() {
        let a = BenchmarkKey::new("  iGaming ", "se");
        let b = BenchmarkKey::new("iGaming", "SE");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "iGaming/SE");
    }

    #[test]
    fn test_benchmark_key_has_no_delimiter_collisions() {
        // Would collide under naive "category|country" concatenation
        let a = BenchmarkKey::new("Finance|SE", "NG");
        let b = BenchmarkKey::new("Finance", "SE|NG");
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_record_values() {
        let rec = BenchmarkRecord::default();
        assert_eq!(rec.ctr, 0.01);
        assert_eq!(rec.unit_cost(PricingMode::Cpm), 5.0);
        assert_eq!(rec.unit_cost(PricingMode::Cpc), 1.0);
        assert_eq!(rec.unit_cost(PricingMode::Cpa), 10.0);
    }

    #[test]
    fn test_rates_use_upper_case_keys() {
        let rates = Rates { ctr: 0.01, cvr: 0.004, cpm: 5.0, cpc: 0.5, cpa: 125.0 };
        let v = serde_json::to_value(rates).unwrap();
        assert_eq!(v["CTR"], 0.01);
        assert_eq!(v["CVR"], 0.004);
        assert_eq!(v["CPA"], 125.0);
    }
}
