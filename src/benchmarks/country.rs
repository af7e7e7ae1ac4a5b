//! Country-code extraction from free-text campaign labels
//!
//! Some benchmark exports carry no dedicated country column; the country is
//! embedded in a label such as `"Gambling - Online gambling - NG"` or
//! `"Finance_UK_Retargeting"`. The label is split on separators and each
//! token is tested, in order, against an alias table and then against a
//! strict two-upper-case-letter pattern. The first qualifying token wins.

use regex::Regex;
use std::sync::OnceLock;

/// Characters treated as token boundaries inside a label.
const SEPARATORS: &[char] = &[
    ' ', '\t', '-', '_', '|', '/', ',', ';', ':', '(', ')', '[', ']', '.',
];

/// Non-canonical codes seen in exports, mapped to ISO-3166 alpha-2.
const ALIASES: &[(&str, &str)] = &[
    ("UK", "GB"),
    ("GBR", "GB"),
    ("USA", "US"),
    ("UAE", "AE"),
    ("KSA", "SA"),
    ("EL", "GR"),
    ("DEU", "DE"),
    ("FRA", "FR"),
    ("ESP", "ES"),
    ("ITA", "IT"),
    ("SWE", "SE"),
    ("NOR", "NO"),
    ("FIN", "FI"),
    ("DNK", "DK"),
    ("NLD", "NL"),
    ("CAN", "CA"),
    ("AUS", "AU"),
    ("NZL", "NZ"),
    ("BRA", "BR"),
    ("MEX", "MX"),
    ("NGA", "NG"),
    ("ZAF", "ZA"),
    ("KEN", "KE"),
    ("GHA", "GH"),
    ("IND", "IN"),
];

fn iso2_pattern() -> &'static Regex {
    static ISO2: OnceLock<Regex> = OnceLock::new();
    ISO2.get_or_init(|| Regex::new(r"^[A-Z]{2}$").expect("static ISO-2 pattern is valid"))
}

/// Resolve an alias token (exact, case-sensitive) to its canonical code.
pub fn canonical_alias(token: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, code)| *code)
}

/// Accept a value that is already a country code, or a known alias of one.
///
/// Used for dedicated country columns, where lower-case values are common.
pub fn normalize_code(value: &str) -> Option<String> {
    let upper = value.trim().to_ascii_uppercase();
    if let Some(code) = canonical_alias(&upper) {
        return Some(code.to_string());
    }
    iso2_pattern().is_match(&upper).then_some(upper)
}

/// Extract an ISO alpha-2 code from a free-text label.
///
/// Returns `None` when no token qualifies; such rows contribute no benchmark.
pub fn extract_from_label(label: &str) -> Option<String> {
    label
        .split(SEPARATORS)
        .filter(|t| !t.is_empty())
        .find_map(|token| {
            if let Some(code) = canonical_alias(token) {
                return Some(code.to_string());
            }
            iso2_pattern().is_match(token).then(|| token.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_code() {
        assert_eq!(
            extract_from_label("Gambling - Online gambling - NG").as_deref(),
            Some("NG")
        );
    }

    #[test]
    fn test_alias_maps_to_canonical() {
        assert_eq!(extract_from_label("Finance_UK_Retargeting").as_deref(), Some("GB"));
        assert_eq!(extract_from_label("Casino (USA)").as_deref(), Some("US"));
    }

    #[test]
    fn test_first_qualifying_token_wins() {
        assert_eq!(extract_from_label("SE / NO split test").as_deref(), Some("SE"));
    }

    #[test]
    fn test_alias_checked_before_pattern_per_token() {
        // "EL" matches both rules; the alias must win
        assert_eq!(extract_from_label("Sportsbook EL").as_deref(), Some("GR"));
    }

    #[test]
    fn test_lower_case_tokens_do_not_qualify() {
        assert_eq!(extract_from_label("online gambling se"), None);
    }

    #[test]
    fn test_no_code_discards_row() {
        assert_eq!(extract_from_label("Brand awareness campaign"), None);
        assert_eq!(extract_from_label(""), None);
    }

    #[test]
    fn test_three_letter_non_alias_is_rejected() {
        assert_eq!(extract_from_label("Promo XYZ"), None);
    }

    #[test]
    fn test_normalize_code_column_values() {
        assert_eq!(normalize_code(" se ").as_deref(), Some("SE"));
        assert_eq!(normalize_code("uk").as_deref(), Some("GB"));
        assert_eq!(normalize_code("Sweden"), None);
    }
}
