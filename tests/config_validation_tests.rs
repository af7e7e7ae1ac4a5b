//! Config Validation Tests
//!
//! Typo detection, range validation and file loading of the service
//! config, exercised through the public API.

use goal_forecast::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use goal_forecast::config::{ConfigError, ServiceConfig};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_auth_key_warns_with_suggestion() {
    let toml_str = r#"
[auth]
jwt_secert = "abc"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "auth.jwt_secert");
    assert_eq!(warnings[0].suggestion.as_deref(), Some("auth.jwt_secret"));
}

#[test]
fn unknown_section_is_reported_but_config_still_loads() {
    let toml_str = r#"
[metrics]
enabled = true

[server]
addr = "127.0.0.1:9090"
"#;
    assert_eq!(validate_unknown_keys(toml_str).len(), 2);
    let config = ServiceConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.server.addr, "127.0.0.1:9090");
}

#[test]
fn every_default_key_is_known() {
    let rendered = ServiceConfig::default().to_toml().unwrap();
    assert!(
        validate_unknown_keys(&rendered).is_empty(),
        "default config renders unknown keys:\n{rendered}"
    );
    assert!(known_config_keys().contains("email.timeout_secs"));
}

#[test]
fn far_off_key_gets_no_suggestion() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("completely.unrelated.key", &known), None);
    assert_eq!(
        suggest_correction("archive.pth", &known).as_deref(),
        Some("archive.path")
    );
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn band_spread_bounds() {
    for ok in ["0.0", "0.2", "0.99"] {
        let toml_str = format!("[forecast]\nband_spread = {ok}\n");
        assert!(ServiceConfig::from_toml_str(&toml_str).is_ok(), "rejected {ok}");
    }
    for bad in ["1.0", "-0.1", "nan"] {
        let toml_str = format!("[forecast]\nband_spread = {bad}\n");
        assert!(
            matches!(
                ServiceConfig::from_toml_str(&toml_str),
                Err(ConfigError::Validation(_))
            ),
            "accepted {bad}"
        );
    }
}

#[test]
fn archive_and_body_limits_validated() {
    let err = ServiceConfig::from_toml_str(
        r#"
[server]
max_body_bytes = 0

[archive]
enabled = true
path = ""
"#,
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("server.max_body_bytes"), "{message}");
    assert!(message.contains("archive.path"), "{message}");
}

// ============================================================================
// File Loading
// ============================================================================

#[test]
fn load_from_file_reads_sources() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forecast_config.toml");
    std::fs::write(
        &path,
        r#"
[benchmarks]
countries_path = "data/countries.csv"

[[benchmarks.sources]]
path = "data/igaming.csv"
category = "iGaming"

[email]
enabled = true
to = "inbox@example.com"
"#,
    )
    .unwrap();

    let config = ServiceConfig::load_from_file(&path).unwrap();
    assert_eq!(config.benchmarks.sources.len(), 1);
    assert_eq!(
        config.benchmarks.countries_path.as_deref(),
        Some(std::path::Path::new("data/countries.csv"))
    );
    assert!(config.email.enabled);
    assert_eq!(config.email.api_url, "https://api.resend.com/emails");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServiceConfig::load_from_file(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_, _)));
}
