//! Fixed issuer key and a card signed with it.

use p256::ecdsa::SigningKey;
use rand_core::OsRng;
use serde_json::{Value, json};
use shc_jose::Jwk;

/// Issuer URL of the fixture card.
pub const ISSUER: &str = "https://spec.smarthealth.cards/examples/issuer";

/// `kid` (thumbprint) of the fixture issuer key.
pub const KID: &str = "9cz28RT1b94-weNsfdzHSbimPFljpcaYAMROEigT4cc";

/// Fixture key x coordinate.
pub const X: &str = "bHHo2qEl2CvcWeSZBE9FJ1cdXqQARclDs99Utys4-Q4";

/// Fixture key y coordinate.
pub const Y: &str = "nNz3n41VGfYB9NtclkMhfm2UkPOvvRhPfG2fyUNJUs0";

/// Fixture key private scalar.
pub const D: &str = "X7zO2KfOxl52wB7iKM_jjU0TbJ72Xavu0tselLyEgzs";

/// `nbf` of the fixture card.
pub const NBF: u64 = 1_609_459_200;

/// Default rid of the fixture card (derived from its FHIR bundle).
pub const RID: &str = "DQVFHWiCmGs";

/// The fixture card as a compact JWS.
pub const COMPACT: &str = include_str!("../data/compact.txt");

/// The fixture card as a numeric `shc:/` string.
pub const NUMERIC: &str = include_str!("../data/numeric.txt");

/// The fixture issuer's private key.
#[must_use]
pub fn private_jwk() -> Jwk {
    Jwk { d: Some(D.to_string()), ..public_jwk() }
}

/// The fixture issuer's public key.
#[must_use]
pub fn public_jwk() -> Jwk {
    Jwk {
        kty: "EC".to_string(),
        kid: KID.to_string(),
        use_: "sig".to_string(),
        alg: "ES256".to_string(),
        crv: "P-256".to_string(),
        x: X.to_string(),
        y: Y.to_string(),
        ..Jwk::default()
    }
}

/// A freshly generated private key.
///
/// # Panics
///
/// Panics if the key cannot be converted to a JWK.
#[must_use]
pub fn generated_jwk() -> Jwk {
    Jwk::from_signing_key(&SigningKey::random(&mut OsRng)).expect("should build jwk")
}

/// Directory document trusting the fixture issuer.
#[must_use]
pub fn directory() -> Value {
    json!({
        "directory": "test",
        "time": "2021-01-01T00:00:00Z",
        "issuerInfo": [{
            "issuer": {"iss": ISSUER, "name": "SMART Health Card Example Issuer"},
            "keys": [public_jwk()],
            "lastRetrieved": "2021-01-01T00:00:00Z"
        }]
    })
}

/// Directory document trusting the fixture issuer, with a revocation list
/// listing `rids` under the fixture key.
#[must_use]
pub fn directory_with_crl(rids: &[&str]) -> Value {
    let mut key = public_jwk();
    key.crl_version = Some(1);
    json!({
        "directory": "test",
        "time": "2021-01-01T00:00:00Z",
        "issuerInfo": [{
            "issuer": {"iss": ISSUER, "name": "SMART Health Card Example Issuer"},
            "keys": [key],
            "crls": [{"kid": KID, "method": "rid", "ctr": 1, "rids": rids}]
        }]
    })
}

/// The FHIR bundle carried by the fixture card.
#[must_use]
pub fn fhir_bundle() -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {
                "fullUrl": "resource:0",
                "resource": {
                    "resourceType": "Patient",
                    "name": [{"family": "Anyperson", "given": ["John", "B."]}],
                    "birthDate": "1951-01-20"
                }
            },
            {
                "fullUrl": "resource:1",
                "resource": {
                    "resourceType": "Immunization",
                    "status": "completed",
                    "vaccineCode": {
                        "coding": [{"system": "http://hl7.org/fhir/sid/cvx", "code": "207"}]
                    },
                    "patient": {"reference": "resource:0"},
                    "occurrenceDateTime": "2021-01-01",
                    "performer": [{"actor": {"display": "ABC General Hospital"}}],
                    "lotNumber": "0000001"
                }
            }
        ]
    })
}
