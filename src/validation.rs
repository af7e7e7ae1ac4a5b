//! Forecast request validation
//!
//! The dashboard form posts loosely typed JSON: numbers may arrive as
//! strings, optional fields may be empty strings, and older clients send
//! `countryIso2` instead of `country`. [`ForecastRequest`] accepts all of
//! that and [`ForecastRequest::validate`] turns it into a range-checked
//! [`ForecastInput`], collecting every field error instead of stopping at
//! the first.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::ForecastError;
use crate::types::{Contact, ForecastInput, PricingMode};

/// Raw forecast request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<Value>,
    #[serde(default)]
    pub duration_days: Option<Value>,
    #[serde(default)]
    pub monthly_conversions_avg: Option<Value>,
    #[serde(default)]
    pub monthly_unique_users_avg: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "countryIso2")]
    pub country: Option<String>,
    #[serde(default)]
    pub unit_cost: Option<Value>,
    #[serde(default)]
    pub ctr_override: Option<Value>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern is valid")
    })
}

/// Collects field errors while reading a request.
#[derive(Default)]
struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ForecastError> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(ForecastError::InputValidation { fields: self.0 })
        }
    }
}

/// Interpret a JSON value as a number; numeric strings are accepted.
///
/// `Ok(None)` means absent (missing, null or blank string).
fn number(value: Option<&Value>) -> Result<Option<f64>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| ()),
        Some(_) => Err(()),
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl ForecastRequest {
    /// Validate into a forecast input plus contact details.
    pub fn validate(&self) -> Result<(ForecastInput, Contact), ForecastError> {
        let mut errors = FieldErrors::default();

        let mode = match non_blank(self.mode.as_ref()) {
            None => {
                errors.add("mode", "Mode is required");
                None
            }
            Some(m) => match m.parse::<PricingMode>() {
                Ok(mode) => Some(mode),
                Err(_) => {
                    errors.add("mode", "Mode must be CPM, CPC or CPA");
                    None
                }
            },
        };

        let daily_budget = required_number(
            &mut errors,
            "dailyBudget",
            self.daily_budget.as_ref(),
            |v| v > 0.0,
            "Daily budget must be greater than 0",
        );

        let duration_days = match number(self.duration_days.as_ref()) {
            Ok(Some(v)) if v.is_finite() && v.fract() == 0.0 && v >= 1.0 && v <= f64::from(u32::MAX) => {
                Some(v as u32)
            }
            Ok(Some(_)) => {
                errors.add("durationDays", "Duration must be a positive integer");
                None
            }
            Ok(None) => {
                errors.add("durationDays", "Duration is required");
                None
            }
            Err(()) => {
                errors.add("durationDays", "Duration must be a number");
                None
            }
        };

        let monthly_conversions_avg = required_number(
            &mut errors,
            "monthlyConversionsAvg",
            self.monthly_conversions_avg.as_ref(),
            |v| v >= 0.0,
            "Monthly conversions cannot be negative",
        );

        let monthly_unique_users_avg = required_number(
            &mut errors,
            "monthlyUniqueUsersAvg",
            self.monthly_unique_users_avg.as_ref(),
            |v| v > 0.0,
            "Monthly users must be greater than 0",
        );

        let category = non_blank(self.category.as_ref()).map(str::to_string);
        if category.is_none() {
            errors.add("category", "Category is required");
        }

        let country = match non_blank(self.country.as_ref()) {
            Some(c) if c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()) => {
                Some(c.to_ascii_uppercase())
            }
            Some(_) => {
                errors.add("country", "Country must be a two-letter ISO code");
                None
            }
            None => {
                errors.add("country", "Country is required");
                None
            }
        };

        let unit_cost = optional_number(
            &mut errors,
            "unitCost",
            self.unit_cost.as_ref(),
            |v| v > 0.0,
            "Unit cost must be greater than 0",
        );

        let ctr_override = optional_number(
            &mut errors,
            "ctrOverride",
            self.ctr_override.as_ref(),
            |v| (0.0..=1.0).contains(&v),
            "CTR override must be between 0 and 1",
        );

        let website = non_blank(self.website.as_ref()).map(str::to_string);
        if website.as_ref().is_some_and(|w| w.chars().count() < 2) {
            errors.add("website", "Website name must be at least 2 characters");
        }

        let email = non_blank(self.email.as_ref()).map(str::to_string);
        if email.as_ref().is_some_and(|e| !email_pattern().is_match(e)) {
            errors.add("email", "Please enter a valid email address");
        }

        errors.into_result(|| {
            // All required fields are Some when no errors were recorded
            let input = ForecastInput {
                mode: mode.unwrap_or(PricingMode::Cpm),
                daily_budget: daily_budget.unwrap_or_default(),
                duration_days: duration_days.unwrap_or_default(),
                monthly_conversions_avg: monthly_conversions_avg.unwrap_or_default(),
                monthly_unique_users_avg: monthly_unique_users_avg.unwrap_or_default(),
                category: category.unwrap_or_default(),
                country_code: country.unwrap_or_default(),
                unit_cost,
                ctr_override,
            };
            (input, Contact { website, email })
        })
    }
}

fn required_number(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
    in_range: impl Fn(f64) -> bool,
    range_message: &str,
) -> Option<f64> {
    match number(value) {
        Ok(Some(v)) if v.is_finite() && in_range(v) => Some(v),
        Ok(Some(_)) => {
            errors.add(field, range_message);
            None
        }
        Ok(None) => {
            errors.add(field, "This field is required");
            None
        }
        Err(()) => {
            errors.add(field, "Expected a number");
            None
        }
    }
}

fn optional_number(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
    in_range: impl Fn(f64) -> bool,
    range_message: &str,
) -> Option<f64> {
    match number(value) {
        Ok(Some(v)) if v.is_finite() && in_range(v) => Some(v),
        Ok(Some(_)) => {
            errors.add(field, range_message);
            None
        }
        Ok(None) => None,
        Err(()) => {
            errors.add(field, "Expected a number");
            None
        }
    }
}
