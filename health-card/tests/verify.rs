//! End-to-end verification of health cards against an issuer directory.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use health_card::directory::Directory;
use health_card::render::QrScanner;
use health_card::status::Crl;
use health_card::{CardBuilder, ErrorCode, Options, Reason, Trust, verify};
use serde_json::json;
use shc_core::codec::{base64url_decode, base64url_encode};
use test_utils::{MockFetcher, fixtures};

// 2021-01-01T00:00:00Z
const T: i64 = 1_609_459_200;

async fn directory() -> Directory {
    Directory::create(fixtures::directory(), &MockFetcher::new())
        .await
        .expect("should create directory")
}

async fn directory_with_crl(rids: &[&str]) -> Directory {
    Directory::create(fixtures::directory_with_crl(rids), &MockFetcher::new())
        .await
        .expect("should create directory")
}

async fn issue(nbf: i64, exp: Option<i64>, rid: Option<&str>) -> String {
    let key = fixtures::private_jwk();
    let mut builder = CardBuilder::new()
        .issuer(fixtures::ISSUER)
        .fhir_bundle(fixtures::fhir_bundle())
        .key(&key)
        .nbf(Utc.timestamp_opt(nbf, 0).single().expect("should be valid"));
    if let Some(exp) = exp {
        builder = builder.exp(Utc.timestamp_opt(exp, 0).single().expect("should be valid"));
    }
    if let Some(rid) = rid {
        builder = builder.rid(rid);
    }

    let ctx = builder.build().await.expect("should issue card");
    ctx.numeric.expect("should have numeric form")
}

// Should verify a known-good numeric card against a directory holding its key.
#[tokio::test]
async fn known_good_card() {
    let directory = directory().await;
    let verdict = verify(fixtures::NUMERIC, Trust::Directory(&directory), Options::default()).await;

    assert!(verdict.verified, "{:?}", verdict.diagnostics.entries());
    assert_eq!(verdict.reason(), "success");
    let issuer = verdict.issuer.expect("should identify issuer");
    assert_eq!(issuer.iss, fixtures::ISSUER);
    assert_eq!(verdict.payload.map(|p| p.iss), Some(fixtures::ISSUER.to_string()));
}

// Should verify the compact form of the same card.
#[tokio::test]
async fn compact_card() {
    let directory = directory().await;
    let verdict = verify(fixtures::COMPACT, Trust::Directory(&directory), Options::default()).await;
    assert!(verdict.verified);
}

// Should verify on both signature backends.
#[tokio::test]
async fn der_backend() {
    let directory = directory().await;
    let options = Options { backend: health_card::jose::Backend::Der, ..Options::default() };
    let verdict = verify(fixtures::NUMERIC, Trust::Directory(&directory), options).await;
    assert!(verdict.verified);
}

// Should report a bad signature when one byte of the signature is flipped.
#[tokio::test]
async fn flipped_signature_byte() {
    let mut segments: Vec<String> =
        fixtures::COMPACT.trim().split('.').map(ToString::to_string).collect();
    let mut signature = base64url_decode(&segments[2]).expect("should decode signature");
    signature[10] ^= 0x01;
    segments[2] = base64url_encode(&signature);
    let tampered = segments.join(".");

    let directory = directory().await;
    let verdict = verify(tampered, Trust::Directory(&directory), Options::default()).await;

    assert!(!verdict.verified);
    assert!(verdict.reason().contains("bad-signature"));
    assert!(!verdict.has(Reason::FailedValidation));
    assert!(verdict.diagnostics.has(ErrorCode::SignatureInvalid));
}

// Should report expiry once `exp` is reached, independently of the signature.
#[tokio::test]
async fn expired_card() {
    let numeric = issue(T, Some(T + 100), None).await;
    let directory = directory().await;

    let before = Options { now: Some(T + 99), ..Options::default() };
    let verdict = verify(numeric.as_str(), Trust::Directory(&directory), before).await;
    assert!(verdict.verified);

    let at = Options { now: Some(T + 100), ..Options::default() };
    let verdict = verify(numeric.as_str(), Trust::Directory(&directory), at).await;
    assert!(!verdict.verified);
    assert!(verdict.reason().contains("expired"));
    assert!(!verdict.has(Reason::BadSignature));
}

// Should report both reasons when an expired card is checked without keys.
#[tokio::test]
async fn joined_reasons() {
    let numeric = issue(T, Some(T + 100), None).await;
    let options = Options { now: Some(T + 200), ..Options::default() };
    let verdict = verify(numeric, Trust::None, options).await;

    assert_eq!(verdict.reason(), "bad-signature|expired");
    assert!(verdict.diagnostics.has(ErrorCode::DirectoryMissing));
}

// Should revoke only cards issued after the revocation timestamp.
#[tokio::test]
async fn revocation_boundary() {
    let rid = "kWCYgY4ZnbE";
    let entry = format!("{rid}.{T}");
    let directory = directory_with_crl(&[entry.as_str()]).await;
    assert!(directory.is_valid(), "{:?}", directory.log());

    let after = issue(T + 10, None, Some(rid)).await;
    let verdict = verify(after, Trust::Directory(&directory), Options::default()).await;
    assert!(!verdict.verified);
    assert_eq!(verdict.reason(), "revoked");

    for nbf in [T, T - 1] {
        let card = issue(nbf, None, Some(rid)).await;
        let verdict = verify(card, Trust::Directory(&directory), Options::default()).await;
        assert!(verdict.verified, "card issued at {nbf} should not be revoked");
    }
}

// Should revoke a card by its default rid when the list entry has no
// timestamp.
#[tokio::test]
async fn revoked_by_default_rid() {
    let directory = directory_with_crl(&[fixtures::RID]).await;
    let verdict = verify(fixtures::NUMERIC, Trust::Directory(&directory), Options::default()).await;

    assert!(verdict.has(Reason::Revoked));
    assert!(verdict.diagnostics.has(ErrorCode::Revoked));
}

// Should honour a revocation list maintained by the issuer.
#[tokio::test]
async fn issuer_revokes_card() {
    let numeric = issue(T, None, Some("card42")).await;

    let mut crl = Crl::new(fixtures::KID);
    let ctr = crl.revoke("card42", None).expect("should revoke");
    let mut key = fixtures::public_jwk();
    key.crl_version = Some(ctr);
    let document = json!({
        "directory": "issuer",
        "issuerInfo": [{"issuer": {"iss": fixtures::ISSUER}, "keys": [key], "crls": [crl]}]
    });
    let directory = Directory::create(document, &MockFetcher::new())
        .await
        .expect("should create directory");
    assert!(directory.is_valid(), "{:?}", directory.log());

    let verdict = verify(numeric, Trust::Directory(&directory), Options::default()).await;
    assert_eq!(verdict.reason(), "revoked");
}

// Should ignore revocation lists that do not list the card.
#[tokio::test]
async fn unlisted_rid() {
    let directory = directory_with_crl(&["AAAAAAAAAAA"]).await;
    let verdict = verify(fixtures::NUMERIC, Trust::Directory(&directory), Options::default()).await;
    assert!(verdict.verified);
}

// Should verify against a bare key list with a warning.
#[tokio::test]
async fn keys_only() {
    let keys = [fixtures::public_jwk()];
    let verdict = verify(fixtures::NUMERIC, Trust::Keys(&keys), Options::default()).await;

    assert!(verdict.verified);
    assert!(verdict.issuer.is_none());
    assert!(verdict.diagnostics.has(ErrorCode::KeysOnlyMatch));
}

// Should fail the signature check for an issuer missing from the directory.
#[tokio::test]
async fn unknown_issuer() {
    let document = json!({"directory": "empty", "issuerInfo": []});
    let directory = Directory::create(document, &MockFetcher::new())
        .await
        .expect("should create directory");
    let verdict = verify(fixtures::NUMERIC, Trust::Directory(&directory), Options::default()).await;

    assert_eq!(verdict.reason(), "bad-signature");
    assert!(verdict.diagnostics.has(ErrorCode::DirectoryIssuerNotFound));
}

// Should report malformed input as a validation failure only.
#[tokio::test]
async fn malformed_numeric() {
    let directory = directory().await;
    let verdict = verify("shc:/567", Trust::Directory(&directory), Options::default()).await;

    assert!(!verdict.verified);
    assert_eq!(verdict.reason(), "failed-validation");
    assert!(verdict.diagnostics.is_fatal());
    assert!(verdict.payload.is_none());
}

#[derive(Debug)]
struct FixtureScanner;

impl QrScanner for FixtureScanner {
    fn scan(&self, _: &str) -> Result<String> {
        Ok(fixtures::NUMERIC.to_string())
    }
}

// Should verify a QR image read by the configured scanner.
#[tokio::test]
async fn qr_image() {
    let directory = directory().await;
    let options = Options::default().with_scanner(FixtureScanner);
    let verdict =
        verify("data:image/png;base64,iVBORw0KGgo=", Trust::Directory(&directory), options).await;

    assert!(verdict.verified, "{:?}", verdict.diagnostics.entries());
}
