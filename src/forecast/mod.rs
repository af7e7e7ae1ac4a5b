//! Forecast Engine
//!
//! Converts a validated [`ForecastInput`] plus an optional resolved
//! benchmark into a complete [`ForecastResult`]. Pure and synchronous: no
//! I/O, no retries, no partial results.
//!
//! ## Resolution
//!
//! - CTR: `ctr_override`, else benchmark CTR, else `UnresolvedBenchmark`
//! - unit cost for the mode: `unit_cost`, else benchmark, else default record
//! - CVR: `monthly_conversions_avg / monthly_unique_users_avg`
//!
//! ## Per-mode derivation (B = daily budget)
//!
//! | Mode | Driver                  | Derived costs                          |
//! |------|-------------------------|----------------------------------------|
//! | CPM  | imp = B / CPM × 1000    | CPC = CPM / (1000·CTR), CPA = CPC / CVR |
//! | CPC  | clicks = B / CPC        | CPM = CPC·CTR·1000, CPA = CPC / CVR     |
//! | CPA  | conv = B / CPA          | CPC = CPA·CVR, CPM = CPC·CTR·1000       |

pub mod band;

pub use band::{UncertaintyBand, DEFAULT_SPREAD};

use crate::error::ForecastError;
use crate::types::{
    BenchmarkRecord, DeliveryMetrics, ForecastInput, ForecastResult, PricingMode, Rates,
};

/// Divisors at or below this magnitude are rejected.
pub const MIN_DIVISOR: f64 = 1e-12;

/// Conversion rate approximated from monthly averages.
pub fn conversion_rate(monthly_conversions_avg: f64, monthly_unique_users_avg: f64) -> f64 {
    monthly_conversions_avg / monthly_unique_users_avg
}

/// Stateless forecaster, configured only with its uncertainty band.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastEngine {
    band: UncertaintyBand,
}

impl ForecastEngine {
    pub fn new(band: UncertaintyBand) -> Self {
        Self { band }
    }

    pub fn band(&self) -> UncertaintyBand {
        self.band
    }

    /// Compute a forecast.
    ///
    /// `benchmark` is the exact-match benchmark for the input's key, if any.
    /// Without one, the caller must supply `ctr_override`.
    pub fn forecast(
        &self,
        input: &ForecastInput,
        benchmark: Option<&BenchmarkRecord>,
    ) -> Result<ForecastResult, ForecastError> {
        let ctr = input
            .ctr_override
            .or_else(|| benchmark.map(|b| b.ctr))
            .ok_or_else(|| ForecastError::UnresolvedBenchmark {
                category: input.category.clone(),
                country: input.country_code.clone(),
            })?;

        let unit_cost = input.unit_cost.unwrap_or_else(|| {
            benchmark
                .copied()
                .unwrap_or_default()
                .unit_cost(input.mode)
        });

        let cvr = conversion_rate(input.monthly_conversions_avg, input.monthly_unique_users_avg);

        ensure_divisor("CTR", ctr)?;
        ensure_divisor("CVR", cvr)?;
        ensure_divisor(input.mode.short_code(), unit_cost)?;

        let (daily, rates) = derive(input.mode, input.daily_budget, unit_cost, ctr, cvr);
        ensure_finite_rates(&rates)?;
        ensure_finite_metrics("daily", &daily)?;

        let totals = daily.scaled(f64::from(input.duration_days));
        ensure_finite_metrics("total", &totals)?;

        tracing::debug!(
            mode = %input.mode,
            key = %input.benchmark_key(),
            ctr,
            cvr,
            unit_cost,
            impressions = totals.impressions,
            "Forecast computed"
        );

        Ok(ForecastResult {
            mode: input.mode,
            rates,
            daily,
            totals: self.band.apply_totals(&totals),
        })
    }
}

/// Per-day delivery and the full rate set for one pricing mode.
fn derive(mode: PricingMode, budget: f64, unit_cost: f64, ctr: f64, cvr: f64) -> (DeliveryMetrics, Rates) {
    match mode {
        PricingMode::Cpm => {
            let cpm = unit_cost;
            let impressions = (budget / cpm) * 1000.0;
            let clicks = impressions * ctr;
            let conversions = clicks * cvr;
            let cpc = cpm / (1000.0 * ctr);
            let cpa = cpm / (1000.0 * ctr * cvr);
            (
                DeliveryMetrics { impressions, clicks, conversions },
                Rates { ctr, cvr, cpm, cpc, cpa },
            )
        }
        PricingMode::Cpc => {
            let cpc = unit_cost;
            let clicks = budget / cpc;
            let impressions = clicks / ctr;
            let conversions = clicks * cvr;
            let cpm = cpc * ctr * 1000.0;
            let cpa = cpc / cvr;
            (
                DeliveryMetrics { impressions, clicks, conversions },
                Rates { ctr, cvr, cpm, cpc, cpa },
            )
        }
        PricingMode::Cpa => {
            let cpa = unit_cost;
            let conversions = budget / cpa;
            let clicks = conversions / cvr;
            let impressions = clicks / ctr;
            let cpc = cpa * cvr;
            let cpm = cpa * cvr * ctr * 1000.0;
            (
                DeliveryMetrics { impressions, clicks, conversions },
                Rates { ctr, cvr, cpm, cpc, cpa },
            )
        }
    }
}

fn ensure_divisor(name: &str, value: f64) -> Result<(), ForecastError> {
    if value.is_finite() && value > MIN_DIVISOR {
        Ok(())
    } else {
        Err(ForecastError::Computation(format!(
            "{name} must be greater than zero (got {value})"
        )))
    }
}

fn ensure_finite_rates(rates: &Rates) -> Result<(), ForecastError> {
    let fields = [
        ("CTR", rates.ctr),
        ("CVR", rates.cvr),
        ("CPM", rates.cpm),
        ("CPC", rates.cpc),
        ("CPA", rates.cpa),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, v)) => Err(ForecastError::Computation(format!(
            "derived {name} is not finite ({v})"
        ))),
        None => Ok(()),
    }
}

fn ensure_finite_metrics(scope: &str, metrics: &DeliveryMetrics) -> Result<(), ForecastError> {
    if metrics.iter().all(f64::is_finite) {
        Ok(())
    } else {
        Err(ForecastError::Computation(format!(
            "{scope} delivery is not finite"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    fn input(mode: PricingMode) -> ForecastInput {
        ForecastInput {
            mode,
            daily_budget: 500.0,
            duration_days: 90,
            monthly_conversions_avg: 1000.0,
            monthly_unique_users_avg: 250_000.0,
            category: "iGaming".to_string(),
            country_code: "SE".to_string(),
            unit_cost: None,
            ctr_override: None,
        }
    }

    fn bench() -> BenchmarkRecord {
        BenchmarkRecord { ctr: 0.01, cpm: 5.0, cpc: 1.0, cpa: 10.0 }
    }

    #[test]
    fn test_cvr_is_exact_ratio() {
        assert_eq!(conversion_rate(1000.0, 250_000.0), 0.004);
        let r = ForecastEngine::default().forecast(&input(PricingMode::Cpm), Some(&bench())).unwrap();
        assert_eq!(r.rates.cvr, 1000.0 / 250_000.0);
    }

    #[test]
    fn test_cpm_scenario() {
        let r = ForecastEngine::default().forecast(&input(PricingMode::Cpm), Some(&bench())).unwrap();
        assert!(close(r.daily.impressions, 100_000.0));
        assert!(close(r.daily.clicks, 1_000.0));
        assert!(close(r.daily.conversions, 4.0));
        assert!(close(r.totals.impressions.base, 9_000_000.0));
        assert!(close(r.totals.impressions.min, 7_200_000.0));
        assert!(close(r.totals.impressions.max, 10_800_000.0));
        assert!(close(r.totals.clicks.base, 90_000.0));
        assert!(close(r.totals.conversions.base, 360.0));
        assert!(close(r.rates.cpc, 0.5));
        assert!(close(r.rates.cpa, 125.0));
    }

    #[test]
    fn test_cpc_mode_derives_cpm() {
        let r = ForecastEngine::default().forecast(&input(PricingMode::Cpc), Some(&bench())).unwrap();
        assert!(close(r.rates.cpm, 10.0));
        assert!(close(r.daily.clicks, 500.0));
        assert!(close(r.daily.impressions, 50_000.0));
        assert!(close(r.daily.conversions, 2.0));
        assert!(close(r.rates.cpa, 250.0));
    }

    #[test]
    fn test_cpa_mode_chain() {
        let r = ForecastEngine::default().forecast(&input(PricingMode::Cpa), Some(&bench())).unwrap();
        assert!(close(r.daily.conversions, 50.0));
        assert!(close(r.daily.clicks, 12_500.0));
        assert!(close(r.daily.impressions, 1_250_000.0));
        assert!(close(r.rates.cpc, 0.04));
        assert!(close(r.rates.cpm, 0.4));
    }

    #[test]
    fn test_cross_mode_derivation_is_consistent() {
        let engine = ForecastEngine::default();
        let cpm_run = engine.forecast(&input(PricingMode::Cpm), Some(&bench())).unwrap();
        let Rates { ctr, cvr, cpm, cpc, cpa } = cpm_run.rates;

        // CPC-mode formulas applied to CPM-mode output
        assert!(close(cpc * ctr * 1000.0, cpm));
        assert!(close(cpc / cvr, cpa));
        // CPA-mode formulas applied to CPM-mode output
        assert!(close(cpa * cvr, cpc));
        assert!(close(cpa * cvr * ctr * 1000.0, cpm));

        // Feeding the derived CPC back in reproduces the same delivery
        let mut cpc_input = input(PricingMode::Cpc);
        cpc_input.unit_cost = Some(cpc);
        let cpc_run = engine.forecast(&cpc_input, Some(&bench())).unwrap();
        assert!(close(cpc_run.daily.impressions, cpm_run.daily.impressions));
        assert!(close(cpc_run.rates.cpa, cpa));
    }

    #[test]
    fn test_bands_are_ordered_with_fixed_ratio() {
        let engine = ForecastEngine::default();
        for mode in PricingMode::ALL {
            let r = engine.forecast(&input(mode), Some(&bench())).unwrap();
            for band in [r.totals.impressions, r.totals.clicks, r.totals.conversions] {
                assert!(band.min <= band.base && band.base <= band.max);
                assert!((band.max / band.min - 1.5).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_unresolved_benchmark_rejected() {
        let err = ForecastEngine::default()
            .forecast(&input(PricingMode::Cpm), None)
            .unwrap_err();
        assert_eq!(
            err,
            ForecastError::UnresolvedBenchmark {
                category: "iGaming".to_string(),
                country: "SE".to_string(),
            }
        );
    }

    #[test]
    fn test_ctr_override_without_benchmark_uses_default_costs() {
        let mut i = input(PricingMode::Cpm);
        i.ctr_override = Some(0.02);
        let r = ForecastEngine::default().forecast(&i, None).unwrap();
        assert_eq!(r.rates.ctr, 0.02);
        assert_eq!(r.rates.cpm, BenchmarkRecord::default().cpm);
    }

    #[test]
    fn test_overrides_take_precedence_over_benchmark() {
        let mut i = input(PricingMode::Cpc);
        i.ctr_override = Some(0.05);
        i.unit_cost = Some(2.0);
        let r = ForecastEngine::default().forecast(&i, Some(&bench())).unwrap();
        assert_eq!(r.rates.ctr, 0.05);
        assert_eq!(r.rates.cpc, 2.0);
        assert!(close(r.daily.clicks, 250.0));
    }

    #[test]
    fn test_zero_ctr_is_computation_error() {
        let mut i = input(PricingMode::Cpc);
        i.ctr_override = Some(0.0);
        let err = ForecastEngine::default().forecast(&i, Some(&bench())).unwrap_err();
        assert!(matches!(err, ForecastError::Computation(_)));
    }

    #[test]
    fn test_zero_conversions_is_computation_error() {
        let mut i = input(PricingMode::Cpa);
        i.monthly_conversions_avg = 0.0;
        let err = ForecastEngine::default().forecast(&i, Some(&bench())).unwrap_err();
        assert!(matches!(err, ForecastError::Computation(ref m) if m.contains("CVR")));
    }

    #[test]
    fn test_non_finite_budget_is_rejected() {
        let mut i = input(PricingMode::Cpm);
        i.daily_budget = f64::INFINITY;
        let err = ForecastEngine::default().forecast(&i, Some(&bench())).unwrap_err();
        assert!(matches!(err, ForecastError::Computation(_)));
    }

    #[test]
    fn test_custom_band_spread() {
        let engine = ForecastEngine::new(UncertaintyBand::new(0.1).unwrap());
        let r = engine.forecast(&input(PricingMode::Cpm), Some(&bench())).unwrap();
        assert!(close(r.totals.impressions.min, 8_100_000.0));
        assert!(close(r.totals.impressions.max, 9_900_000.0));
    }
}
