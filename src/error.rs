//! Errors surfaced by the forecast path.

use std::collections::BTreeMap;
use thiserror::Error;

/// Why a forecast request was rejected.
///
/// Every variant is a client error; the HTTP layer maps all three to 400.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// One or more request fields are missing, malformed or out of range.
    #[error("invalid input: {}", summarize(.fields))]
    InputValidation { fields: BTreeMap<String, String> },

    /// No CTR benchmark for the key and no override was supplied.
    #[error("no benchmark for category '{category}' in country '{country}', supply ctrOverride")]
    UnresolvedBenchmark { category: String, country: String },

    /// A division would have produced an infinite or NaN result.
    #[error("forecast cannot be computed: {0}")]
    Computation(String),
}

impl ForecastError {
    /// Single-field validation error.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), message.into());
        ForecastError::InputValidation { fields }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ForecastError::InputValidation { .. } => "VALIDATION_ERROR",
            ForecastError::UnresolvedBenchmark { .. } => "UNRESOLVED_BENCHMARK",
            ForecastError::Computation(_) => "COMPUTATION_ERROR",
        }
    }
}

fn summarize(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ForecastOutcome<T> = Result<T, ForecastError>;
