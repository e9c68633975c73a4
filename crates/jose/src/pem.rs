//! # PEM Key Documents
//!
//! Builds SPKI public key and PKCS#8 private key documents for P-256 keys
//! directly from JWK coordinates, wrapped as PEM.

use anyhow::Result;
use base64ct::{Base64, Encoding};

use crate::Jwk;

const SEQUENCE: u8 = 0x30;
const INTEGER: u8 = 0x02;
const BIT_STRING: u8 = 0x03;
const OCTET_STRING: u8 = 0x04;
const CONTEXT_0: u8 = 0xa0;
const CONTEXT_1: u8 = 0xa1;

// id-ecPublicKey (1.2.840.10045.2.1)
const EC_PUBLIC_KEY: [u8; 9] = [0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
// prime256v1 (1.2.840.10045.3.1.7)
const PRIME256V1: [u8; 10] = [0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

/// DER-encoded `SubjectPublicKeyInfo` for the key's public point.
///
/// # Errors
///
/// Returns an error if the coordinates are not 32 bytes of base64url.
pub fn public_key_der(jwk: &Jwk) -> Result<Vec<u8>> {
    Ok(tlv(SEQUENCE, &[algorithm(), point(jwk)?].concat()))
}

/// DER-encoded PKCS#8 `PrivateKeyInfo` wrapping an SEC1 `ECPrivateKey`.
///
/// # Errors
///
/// Returns an error if the key has no private scalar or any component is
/// not 32 bytes of base64url.
pub fn private_key_der(jwk: &Jwk) -> Result<Vec<u8>> {
    let ec_private_key = tlv(
        SEQUENCE,
        &[
            tlv(INTEGER, &[0x01]),
            tlv(OCTET_STRING, &jwk.scalar()?),
            tlv(CONTEXT_0, &PRIME256V1),
            tlv(CONTEXT_1, &point(jwk)?),
        ]
        .concat(),
    );
    Ok(tlv(
        SEQUENCE,
        &[tlv(INTEGER, &[0x00]), algorithm(), tlv(OCTET_STRING, &ec_private_key)].concat(),
    ))
}

/// `PUBLIC KEY` PEM document for the key.
///
/// # Errors
///
/// Returns an error if the coordinates are not 32 bytes of base64url.
pub fn public_key_pem(jwk: &Jwk) -> Result<String> {
    Ok(armor("PUBLIC KEY", &public_key_der(jwk)?))
}

/// `PRIVATE KEY` PEM document for the key.
///
/// # Errors
///
/// Returns an error if the key has no usable private scalar.
pub fn private_key_pem(jwk: &Jwk) -> Result<String> {
    Ok(armor("PRIVATE KEY", &private_key_der(jwk)?))
}

fn algorithm() -> Vec<u8> {
    tlv(SEQUENCE, &[EC_PUBLIC_KEY.as_slice(), PRIME256V1.as_slice()].concat())
}

// BIT STRING holding the uncompressed point `04 || x || y`.
fn point(jwk: &Jwk) -> Result<Vec<u8>> {
    let (x, y) = jwk.coordinates()?;
    Ok(tlv(BIT_STRING, &[[0x00, 0x04].as_slice(), x.as_slice(), y.as_slice()].concat()))
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut encoded = vec![tag];
    encoded.extend(length(content.len()));
    encoded.extend_from_slice(content);
    encoded
}

fn length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let significant = &bytes[start..];

    #[allow(clippy::cast_possible_truncation)]
    let mut encoded = vec![0x80 | significant.len() as u8];
    encoded.extend_from_slice(significant);
    encoded
}

fn armor(label: &str, der: &[u8]) -> String {
    let body = Base64::encode_string(der);
    let mut pem = format!("-----BEGIN {label}-----\n");
    for line in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Jwk {
        Jwk {
            x: "bHHo2qEl2CvcWeSZBE9FJ1cdXqQARclDs99Utys4-Q4".to_string(),
            y: "nNz3n41VGfYB9NtclkMhfm2UkPOvvRhPfG2fyUNJUs0".to_string(),
            d: Some("X7zO2KfOxl52wB7iKM_jjU0TbJ72Xavu0tselLyEgzs".to_string()),
            ..Jwk::default()
        }
    }

    #[test]
    fn spki_layout() {
        let der = public_key_der(&key()).expect("should encode");

        assert_eq!(der.len(), 91);
        assert_eq!(&der[..4], &[0x30, 0x59, 0x30, 0x13]);
        assert_eq!(&der[23..27], &[0x03, 0x42, 0x00, 0x04]);
    }

    #[test]
    fn pkcs8_layout() {
        let der = private_key_der(&key()).expect("should encode");

        assert_eq!(der.len(), 150);
        assert_eq!(&der[..6], &[0x30, 0x81, 0x93, 0x02, 0x01, 0x00]);
        assert_eq!(&der[27..31], &[0x04, 0x79, 0x30, 0x77]);
    }

    #[test]
    fn long_form_length() {
        assert_eq!(length(0x7f), vec![0x7f]);
        assert_eq!(length(0x93), vec![0x81, 0x93]);
        assert_eq!(length(0x0100), vec![0x82, 0x01, 0x00]);
    }

    #[test]
    fn pem_lines() {
        let pem = public_key_pem(&key()).expect("should encode");
        let lines: Vec<&str> = pem.lines().collect();

        assert_eq!(lines.first(), Some(&"-----BEGIN PUBLIC KEY-----"));
        assert_eq!(lines.last(), Some(&"-----END PUBLIC KEY-----"));
        assert!(lines.iter().all(|line| line.len() <= 64));
    }

    #[test]
    fn public_key_without_scalar() {
        private_key_der(&key().to_public()).expect_err("should require d");
    }
}
