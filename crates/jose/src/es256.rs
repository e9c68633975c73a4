//! # ES256
//!
//! Signing and verification over P-256 with SHA-256, using raw 64-byte
//! `r || s` signatures.

use anyhow::{Result, anyhow};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use shc_core::{Error, ErrorCode, Log};

use crate::der::{der_from_raw, raw_from_der};
use crate::{Checks, Jwk, pem, validate_key};

/// Route used to hand keys and signatures to the ECDSA primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Raw signature and SEC1 point.
    #[default]
    Native,

    /// DER signature and SPKI PEM public key.
    Der,
}

/// Sign `message` with a private key, returning the raw 64-byte signature.
///
/// The key is validated structurally first; problems are recorded in `log`.
///
/// # Errors
///
/// Returns [`Error::CryptoFailure`] if the key is invalid or cannot be
/// imported.
pub fn sign(key: &Jwk, message: &[u8], checks: &Checks, log: &mut Log) -> Result<[u8; 64], Error> {
    if !validate_key(key, true, checks, log) {
        return Err(Error::CryptoFailure("signing key is invalid".to_string()));
    }

    let signed = || -> Result<[u8; 64]> {
        let pem = pem::private_key_pem(key)?;
        let signing_key = SigningKey::from_pkcs8_pem(&pem)
            .map_err(|e| anyhow!("issue importing signing key: {e}"))?;
        let signature: Signature =
            signing_key.try_sign(message).map_err(|e| anyhow!("issue signing: {e}"))?;
        raw_from_der(signature.to_der().as_bytes())
    };
    signed().map_err(|e| Error::CryptoFailure(e.to_string()))
}

/// Verify a raw 64-byte ES256 `signature` over `message`.
///
/// The key is validated structurally first. Returns `false`, never an
/// error, when the key is invalid, the signature is malformed, or it does
/// not verify.
pub fn verify(
    key: &Jwk, signature: &[u8], message: &[u8], backend: Backend, checks: &Checks, log: &mut Log,
) -> bool {
    if !validate_key(key, false, checks, log) {
        return false;
    }

    let verified = match backend {
        Backend::Native => verify_native(key, signature, message),
        Backend::Der => verify_der(key, signature, message),
    };
    match verified {
        Ok(verified) => verified,
        Err(e) => {
            log.error(ErrorCode::CryptoFailure, format!("signature check failed: {e}"));
            false
        }
    }
}

fn verify_native(key: &Jwk, signature: &[u8], message: &[u8]) -> Result<bool> {
    let (x, y) = key.coordinates()?;
    let point = [[0x04].as_slice(), x.as_slice(), y.as_slice()].concat();
    let verifying_key = VerifyingKey::from_sec1_bytes(&point)
        .map_err(|e| anyhow!("issue importing public key: {e}"))?;

    let Ok(signature) = Signature::from_slice(signature) else {
        tracing::debug!("signature is not a valid raw ES256 signature");
        return Ok(false);
    };
    Ok(verifying_key.verify(message, &signature).is_ok())
}

fn verify_der(key: &Jwk, signature: &[u8], message: &[u8]) -> Result<bool> {
    let Ok(raw) = <[u8; 64]>::try_from(signature) else {
        tracing::debug!(len = signature.len(), "signature is not 64 bytes");
        return Ok(false);
    };
    let pem = pem::public_key_pem(key)?;
    let verifying_key = VerifyingKey::from_public_key_pem(&pem)
        .map_err(|e| anyhow!("issue importing public key: {e}"))?;

    let Ok(signature) = Signature::from_der(&der_from_raw(&raw)) else {
        tracing::debug!("signature is not a valid DER ES256 signature");
        return Ok(false);
    };
    Ok(verifying_key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;

    use super::*;

    fn key_pair() -> (Jwk, Jwk) {
        let private = Jwk::from_signing_key(&SigningKey::random(&mut OsRng))
            .expect("should build jwk");
        let public = private.to_public();
        (private, public)
    }

    #[test]
    fn round_trip_both_backends() {
        let (private, public) = key_pair();
        let mut log = Log::new("ES256");
        let message = b"header.payload";

        let signature = sign(&private, message, &Checks::default(), &mut log).expect("should sign");
        for backend in [Backend::Native, Backend::Der] {
            assert!(verify(&public, &signature, message, backend, &Checks::default(), &mut log));
        }
        assert!(log.is_empty());
    }

    #[test]
    fn tampered_message() {
        let (private, public) = key_pair();
        let mut log = Log::new("ES256");

        let signature =
            sign(&private, b"header.payload", &Checks::default(), &mut log).expect("should sign");
        for backend in [Backend::Native, Backend::Der] {
            assert!(!verify(&public, &signature, b"header.payloaD", backend, &Checks::default(), &mut log));
        }
    }

    #[test]
    fn flipped_signature_byte() {
        let (private, public) = key_pair();
        let mut log = Log::new("ES256");

        let mut signature =
            sign(&private, b"header.payload", &Checks::default(), &mut log).expect("should sign");
        signature[10] ^= 0x01;
        for backend in [Backend::Native, Backend::Der] {
            assert!(!verify(&public, &signature, b"header.payload", backend, &Checks::default(), &mut log));
        }
    }

    #[test]
    fn wrong_length_signature() {
        let (_, public) = key_pair();
        let mut log = Log::new("ES256");

        for backend in [Backend::Native, Backend::Der] {
            assert!(!verify(&public, &[0x01; 63], b"message", backend, &Checks::default(), &mut log));
        }
    }

    #[test]
    fn invalid_key_never_panics() {
        let (_, mut public) = key_pair();
        public.x = "AAAA".to_string();
        let mut log = Log::new("ES256");

        assert!(!verify(&public, &[0x01; 64], b"message", Backend::Der, &Checks::default(), &mut log));
        assert!(log.error_count() > 0);
    }

    #[test]
    fn sign_with_public_key() {
        let (_, public) = key_pair();
        let mut log = Log::new("ES256");

        let err = sign(&public, b"message", &Checks::default(), &mut log)
            .expect_err("should not sign without d");
        assert!(matches!(err, Error::CryptoFailure(_)));
    }
}
