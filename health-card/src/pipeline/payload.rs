//! JWS payload segment.
//!
//! The payload is raw-DEFLATE compressed JSON. Structural checks go only as
//! far as locating the members the pipeline, signature, and revocation
//! stages depend on; the FHIR content itself is not validated beyond its
//! resource type.

use serde_json::{Map, Value};
use shc_core::codec::{base64url_decode, base64url_encode, bytes_to_text, deflate, inflate};
use shc_core::{ErrorCode, Log};
use shc_status::validate_rid;

use crate::types::{FHIR_VERSION, HEALTH_CARD_TYPE, Payload};

/// Diagnostic label for this segment.
pub const LABEL: &str = "JWS.PAYLOAD";

/// Decode a base64url, compressed payload segment.
pub fn decode(segment: &str, log: &mut Log) -> Option<Payload> {
    log.set_label(LABEL);
    let mark = log.len();

    let json = base64url_decode(segment)
        .and_then(|bytes| inflate(&bytes))
        .and_then(bytes_to_text);
    let json = match json {
        Ok(json) => json,
        Err(e) => {
            log.fatal(ErrorCode::JwsPayloadDecodeError, format!("failed to decode payload: {e}"));
            return None;
        }
    };
    let value: Value = match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(e) => {
            log.fatal(ErrorCode::JwsPayloadDecodeError, format!("payload is not JSON: {e}"));
            return None;
        }
    };

    validate_value(&value, log);
    if log.is_fatal_since(mark) {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            log.fatal(ErrorCode::JwsPayloadError, format!("payload members are invalid: {e}"));
            None
        }
    }
}

/// Check a typed payload.
pub fn validate(payload: &Payload, log: &mut Log) -> bool {
    match serde_json::to_value(payload) {
        Ok(value) => validate_value(&value, log),
        Err(e) => {
            log.set_label(LABEL);
            log.fatal(ErrorCode::JwsPayloadError, format!("failed to serialize payload: {e}"));
            false
        }
    }
}

/// Check the structure of a payload as JSON.
///
/// Missing `iss`, `nbf`, or `vc`, and a non-numeric `exp`, are fatal.
/// `exp` belongs at the top level: inside `vc` it is an error.
pub fn validate_value(value: &Value, log: &mut Log) -> bool {
    log.set_label(LABEL);
    let errors = log.error_count();

    let Some(payload) = value.as_object() else {
        log.fatal(ErrorCode::JwsPayloadError, "payload is not a JSON object");
        return false;
    };

    match payload.get("iss") {
        Some(Value::String(iss)) if !iss.is_empty() => {
            if !iss.starts_with("https://") {
                log.warn(ErrorCode::JwsPayloadError, format!("'iss' {iss} should use https"));
            }
        }
        Some(_) => log.fatal(ErrorCode::JwsPayloadError, "'iss' must be a non-empty string"),
        None => log.fatal(ErrorCode::JwsPayloadError, "payload is missing 'iss'"),
    }
    match payload.get("nbf") {
        Some(Value::Number(_)) => {}
        Some(_) => log.fatal(ErrorCode::JwsPayloadError, "'nbf' must be a number"),
        None => log.fatal(ErrorCode::JwsPayloadError, "payload is missing 'nbf'"),
    }
    if payload.get("exp").is_some_and(|exp| !exp.is_number()) {
        log.fatal(ErrorCode::JwsPayloadError, "'exp' must be a number");
    }
    if let Some(rid) = payload.get("rid") {
        check_rid(rid, log);
    }

    match payload.get("vc") {
        Some(Value::Object(vc)) => check_vc(vc, log),
        Some(_) => log.fatal(ErrorCode::JwsPayloadError, "'vc' must be an object"),
        None => log.fatal(ErrorCode::JwsPayloadError, "payload is missing 'vc'"),
    }

    log.error_count() == errors
}

fn check_vc(vc: &Map<String, Value>, log: &mut Log) {
    if vc.contains_key("exp") {
        log.error(ErrorCode::JwsPayloadError, "'exp' must be a top-level claim, not in 'vc'");
    }
    if let Some(rid) = vc.get("rid") {
        check_rid(rid, log);
    }

    match vc.get("type") {
        Some(Value::Array(types)) => {
            if !types.iter().all(Value::is_string) {
                log.fatal(ErrorCode::JwsPayloadError, "'vc.type' must be an array of strings");
            } else if !types.iter().any(|t| t == HEALTH_CARD_TYPE) {
                log.error(
                    ErrorCode::JwsPayloadError,
                    format!("'vc.type' does not include {HEALTH_CARD_TYPE}"),
                );
            }
        }
        Some(_) => log.fatal(ErrorCode::JwsPayloadError, "'vc.type' must be an array"),
        None => log.error(ErrorCode::JwsPayloadError, "'vc' is missing 'type'"),
    }

    let Some(subject) = vc.get("credentialSubject") else {
        log.error(ErrorCode::JwsPayloadError, "'vc' is missing 'credentialSubject'");
        return;
    };
    let Some(subject) = subject.as_object() else {
        log.fatal(ErrorCode::JwsPayloadError, "'vc.credentialSubject' must be an object");
        return;
    };

    match subject.get("fhirVersion") {
        Some(Value::String(version)) if version != FHIR_VERSION => log.warn(
            ErrorCode::JwsPayloadError,
            format!("'fhirVersion' {version} is not {FHIR_VERSION}"),
        ),
        Some(Value::String(_)) => {}
        Some(_) => log.fatal(ErrorCode::JwsPayloadError, "'fhirVersion' must be a string"),
        None => log.error(ErrorCode::JwsPayloadError, "'credentialSubject' is missing 'fhirVersion'"),
    }
    match subject.get("fhirBundle") {
        Some(Value::Object(bundle)) => {
            if bundle.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
                log.error(ErrorCode::FhirValidationError, "'fhirBundle' is not a FHIR Bundle");
            }
        }
        Some(_) => log.error(ErrorCode::JwsPayloadError, "'fhirBundle' must be an object"),
        None => log.error(ErrorCode::JwsPayloadError, "'credentialSubject' is missing 'fhirBundle'"),
    }
}

fn check_rid(rid: &Value, log: &mut Log) {
    let Some(rid) = rid.as_str() else {
        log.fatal(ErrorCode::JwsPayloadError, "'rid' must be a string");
        return;
    };
    validate_rid(rid, log);
}

/// Compress and encode the payload as a base64url segment.
pub fn encode(payload: &Payload, level: u32, log: &mut Log) -> Option<String> {
    let mark = log.len();
    validate(payload, log);
    if log.is_fatal_since(mark) {
        return None;
    }

    let compressed = serde_json::to_vec(payload)
        .map_err(anyhow::Error::from)
        .and_then(|json| deflate(&json, level));
    match compressed {
        Ok(bytes) => Some(base64url_encode(&bytes)),
        Err(e) => {
            log.fatal(ErrorCode::EncodeFailed, format!("failed to encode payload: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_utils::fixtures;

    use super::*;

    fn card() -> Value {
        json!({
            "iss": fixtures::ISSUER,
            "nbf": fixtures::NBF,
            "vc": {
                "type": [HEALTH_CARD_TYPE],
                "credentialSubject": {
                    "fhirVersion": FHIR_VERSION,
                    "fhirBundle": fixtures::fhir_bundle()
                }
            }
        })
    }

    #[test]
    fn decodes_fixture() {
        let mut log = Log::default();
        let segment = fixtures::COMPACT.split('.').nth(1).expect("should have payload");
        let payload = decode(segment, &mut log).expect("should decode");

        assert_eq!(payload.iss, fixtures::ISSUER);
        assert_eq!(payload.vc.credential_subject.fhir_bundle, fixtures::fhir_bundle());
        assert_eq!(log.error_count(), 0);
    }

    #[test]
    fn encode_then_decode() {
        let mut log = Log::default();
        let payload: Payload = serde_json::from_value(card()).expect("should deserialize");

        let segment = encode(&payload, 9, &mut log).expect("should encode");
        assert_eq!(decode(&segment, &mut log), Some(payload));
        assert!(!log.is_fatal());
    }

    #[test]
    fn earlier_fatal_entry() {
        let mut log = Log::default();
        log.fatal(ErrorCode::JwsHeaderDecodeFail, "header is not JSON");

        let segment = fixtures::COMPACT.split('.').nth(1).expect("should have payload");
        let payload = decode(segment, &mut log).expect("should decode");
        assert_eq!(payload.iss, fixtures::ISSUER);
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn missing_iss_is_fatal() {
        let mut log = Log::default();
        let mut value = card();
        value.as_object_mut().expect("should be object").remove("iss");

        assert!(!validate_value(&value, &mut log));
        assert!(log.is_fatal());
    }

    #[test]
    fn exp_inside_vc() {
        let mut log = Log::default();
        let mut value = card();
        value["vc"]["exp"] = json!(1_700_000_000);

        assert!(!validate_value(&value, &mut log));
        assert!(!log.is_fatal());
    }

    #[test]
    fn exp_not_a_number() {
        let mut log = Log::default();
        let mut value = card();
        value["exp"] = json!("tomorrow");

        validate_value(&value, &mut log);
        assert!(log.is_fatal());
    }

    #[test]
    fn not_a_bundle() {
        let mut log = Log::default();
        let mut value = card();
        value["vc"]["credentialSubject"]["fhirBundle"] = json!({"resourceType": "Patient"});

        assert!(!validate_value(&value, &mut log));
        assert!(log.has(ErrorCode::FhirValidationError));
    }

    #[test]
    fn invalid_rid() {
        let mut log = Log::default();
        let mut value = card();
        value["vc"]["rid"] = json!("not/base64url");

        assert!(!validate_value(&value, &mut log));
        assert!(log.has(ErrorCode::RevocationError));
    }

    #[test]
    fn garbage_segment() {
        let mut log = Log::default();
        assert!(decode("eyJhbGciOiJFUzI1NiJ9", &mut log).is_none());
        assert!(log.has(ErrorCode::JwsPayloadDecodeError));
    }
}
