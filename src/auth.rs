//! Session tokens for the forecast history view
//!
//! Tokens are compact HS256 JWTs (`header.claims.signature`, base64url
//! without padding) carrying `{sub, iat, exp}`. Signing and verification use
//! `ring::hmac`, which compares tags in constant time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use ring::hmac;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

fn signing_key(secret: &str) -> hmac::Key {
    hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes())
}

/// Issue a token for `subject` valid for `ttl_secs` from now.
pub fn issue_token(secret: &str, subject: &str, ttl_secs: u64) -> String {
    issue_token_at(secret, subject, ttl_secs, Utc::now().timestamp())
}

fn issue_token_at(secret: &str, subject: &str, ttl_secs: u64, now: i64) -> String {
    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
    };
    // Serializing a struct of strings and integers cannot fail
    let payload = serde_json::to_vec(&claims).unwrap_or_default();

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let tag = hmac::sign(&signing_key(secret), signing_input.as_bytes());
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref()))
}

/// Verify structure, algorithm, signature and expiry, returning the claims.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    verify_token_at(secret, token, Utc::now().timestamp())
}

fn verify_token_at(secret: &str, token: &str, now: i64) -> Result<Claims, TokenError> {
    let mut parts = token.trim().split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;
    let signing_input = &token.trim()[..header.len() + 1 + payload.len()];
    hmac::verify(&signing_key(secret), signing_input.as_bytes(), &signature)
        .map_err(|_| TokenError::BadSignature)?;

    let alg = URL_SAFE_NO_PAD
        .decode(header)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
        .and_then(|v| v.get("alg").and_then(|a| a.as_str()).map(str::to_owned));
    if alg.as_deref() != Some("HS256") {
        return Err(TokenError::Malformed);
    }

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(TokenError::Malformed)?;

    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Constant-time check of the configured login credentials.
pub fn check_credentials(config: &AuthConfig, username: &str, password: &str) -> bool {
    let key = signing_key(&config.jwt_secret);
    let matches = |expected: &str, given: &str| {
        let tag = hmac::sign(&key, expected.as_bytes());
        hmac::verify(&key, given.as_bytes(), tag.as_ref()).is_ok()
    };
    // Evaluate both so timing does not reveal which one failed
    let user_ok = matches(&config.username, username);
    let pass_ok = matches(&config.password, password);
    user_ok && pass_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_issue_then_verify() {
        let token = issue_token(SECRET, "admin", 3_600);
        assert_eq!(token.split('.').count(), 3);
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp - claims.iat, 3_600);
    }

    #[test]
    fn test_header_is_standard_jwt() {
        let token = issue_token(SECRET, "admin", 60);
        let header = token.split('.').next().unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(header).unwrap();
        assert_eq!(decoded, HEADER.as_bytes());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(SECRET, "admin", 60);
        assert_eq!(
            verify_token("other-secret", &token),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let token = issue_token(SECRET, "admin", 60);
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"root","iat":0,"exp":9999999999}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(verify_token(SECRET, &tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"admin","iat":0,"exp":9999999999}"#);
        let signing_input = format!("{header}.{payload}");
        let tag = hmac::sign(&signing_key(SECRET), signing_input.as_bytes());
        let token = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref()));
        assert_eq!(verify_token(SECRET, &token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token_at(SECRET, "admin", 60, 1_000);
        assert!(verify_token_at(SECRET, &token, 1_059).is_ok());
        assert_eq!(
            verify_token_at(SECRET, &token, 1_060),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        for bad in ["", "abc", "a.b", "a.b.c.d", "a.b.!!!"] {
            assert!(verify_token(SECRET, bad).is_err(), "accepted {bad:?}");
        }
        assert_eq!(verify_token(SECRET, "a.b.!!!"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_check_credentials() {
        let config = AuthConfig::default();
        assert!(check_credentials(&config, "admin", "password123"));
        assert!(!check_credentials(&config, "admin", "password"));
        assert!(!check_credentials(&config, "Admin", "password123"));
        assert!(!check_credentials(&config, "", ""));
    }
}
