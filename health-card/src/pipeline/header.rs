//! JWS header segment.

use serde_json::Value;
use shc_core::codec::{base64url_decode, base64url_encode, bytes_to_text, is_base64url};
use shc_core::{ErrorCode, Log};

use crate::types::{ALG_ES256, Header, ZIP_DEFLATE};

/// Diagnostic label for this segment.
pub const LABEL: &str = "JWS.HEADER";

/// Decode a base64url header segment.
///
/// Anything short of a JSON object with string members is fatal. Content
/// problems are recorded as errors.
pub fn decode(segment: &str, log: &mut Log) -> Option<Header> {
    log.set_label(LABEL);

    let json = match base64url_decode(segment).and_then(bytes_to_text) {
        Ok(json) => json,
        Err(e) => {
            log.fatal(ErrorCode::JwsHeaderDecodeFail, format!("failed to decode header: {e}"));
            return None;
        }
    };
    let value: Value = match serde_json::from_str(&json) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) => {
            log.fatal(ErrorCode::JwsHeaderDecodeFail, "header is not a JSON object");
            return None;
        }
        Err(e) => {
            log.fatal(ErrorCode::JwsHeaderDecodeFail, format!("header is not JSON: {e}"));
            return None;
        }
    };
    let header: Header = match serde_json::from_value(value) {
        Ok(header) => header,
        Err(e) => {
            log.fatal(ErrorCode::JwsHeaderError, format!("header members are invalid: {e}"));
            return None;
        }
    };

    validate(&header, log);
    Some(header)
}

/// Check the header carries exactly `alg: ES256`, `zip: DEF`, and a `kid`.
///
/// Other members are a warning.
pub fn validate(header: &Header, log: &mut Log) -> bool {
    log.set_label(LABEL);
    let errors = log.error_count();

    let expected = [("alg", &header.alg, ALG_ES256), ("zip", &header.zip, ZIP_DEFLATE)];
    for (name, value, expected) in expected {
        if value.is_empty() {
            log.error(ErrorCode::JwsHeaderError, format!("header is missing '{name}'"));
        } else if value != expected {
            log.error(
                ErrorCode::JwsHeaderError,
                format!("header '{name}' must be '{expected}', found '{value}'"),
            );
        }
    }

    if header.kid.is_empty() {
        log.error(ErrorCode::JwsHeaderError, "header is missing 'kid'");
    } else if !is_base64url(&header.kid) {
        log.error(ErrorCode::JwsHeaderError, "header 'kid' is not base64url");
    }

    for name in header.extra.keys() {
        log.warn(ErrorCode::JwsHeaderError, format!("unexpected header member '{name}'"));
    }

    log.error_count() == errors
}

/// Encode the header as a base64url segment.
pub fn encode(header: &Header, log: &mut Log) -> Option<String> {
    log.set_label(LABEL);
    match serde_json::to_vec(header) {
        Ok(json) => Some(base64url_encode(&json)),
        Err(e) => {
            log.fatal(ErrorCode::EncodeFailed, format!("failed to serialize header: {e}"));
            None
        }
    }
}
