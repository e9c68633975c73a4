//! # Key Validation
//!
//! Structural checks applied to every key before it is trusted for signing
//! or verification.

use shc_core::{ErrorCode, Log, codec};

use crate::Jwk;

/// Tunable key checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Checks {
    /// Record `kty`, `use`, `alg`, and `crv` mismatches as warnings rather
    /// than errors.
    pub relaxed: bool,

    /// Skip comparing `kid` with the computed thumbprint.
    pub skip_kid: bool,

    /// Accept members outside the expected key members without a warning.
    pub allow_unexpected: bool,
}

/// Validate a single key, recording problems in `log`.
///
/// Returns `true` if no errors were recorded.
pub fn validate_key(key: &Jwk, private: bool, checks: &Checks, log: &mut Log) -> bool {
    let before = log.error_count();

    expect_value(log, checks, "kty", &key.kty, "EC");
    expect_value(log, checks, "use", &key.use_, "sig");
    expect_value(log, checks, "alg", &key.alg, "ES256");
    expect_value(log, checks, "crv", &key.crv, "P-256");

    let mut coordinates_ok = true;
    for (name, value) in [("kid", &key.kid), ("x", &key.x), ("y", &key.y)] {
        if value.is_empty() {
            log.error(ErrorCode::JwkInvalidProperty, format!("key is missing '{name}'"));
            coordinates_ok &= name == "kid";
        } else if !codec::is_base64url(value) {
            log.error(ErrorCode::JwkInvalidProperty, format!("key '{name}' is not base64url"));
            coordinates_ok &= name == "kid";
        }
    }
    if coordinates_ok && let Err(e) = key.coordinates() {
        log.error(ErrorCode::JwkInvalidProperty, format!("key is not a P-256 point: {e}"));
        coordinates_ok = false;
    }

    match (&key.d, private) {
        (None, true) => log.error(ErrorCode::JwkInvalidProperty, "private key is missing 'd'"),
        (Some(d), true) if !codec::is_base64url(d) => {
            log.error(ErrorCode::JwkInvalidProperty, "key 'd' is not base64url");
        }
        (Some(_), false) => {
            log.error(ErrorCode::JwkInvalidProperty, "public key must not carry 'd'");
        }
        _ => {}
    }

    if !checks.allow_unexpected {
        for name in key.extra.keys() {
            log.warn(ErrorCode::JwkUnexpectedProperty, format!("unexpected key property '{name}'"));
        }
    }

    if !checks.skip_kid && coordinates_ok && !key.kid.is_empty() {
        match key.thumbprint() {
            Ok(thumbprint) if thumbprint == key.kid => {}
            Ok(thumbprint) => log.error(
                ErrorCode::JwkIncorrectKid,
                format!("key 'kid' {} does not match computed thumbprint {thumbprint}", key.kid),
            ),
            Err(e) => log.error(ErrorCode::JwkIncorrectKid, format!("cannot compute thumbprint: {e}")),
        }
    }

    log.error_count() == before
}

/// Validate a set of keys. Returns `true` if no key recorded an error.
pub fn validate_keys(keys: &[Jwk], private: bool, checks: &Checks, log: &mut Log) -> bool {
    keys.iter().fold(true, |valid, key| validate_key(key, private, checks, log) && valid)
}

fn expect_value(log: &mut Log, checks: &Checks, name: &str, actual: &str, expected: &str) {
    if actual.is_empty() {
        log.error(ErrorCode::JwkInvalidProperty, format!("key is missing '{name}'"));
    } else if actual != expected {
        log.error_or_warn(
            checks.relaxed,
            ErrorCode::JwkInvalidProperty,
            format!("key '{name}' should be '{expected}', found '{actual}'"),
        );
    }
}
