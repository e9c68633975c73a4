//! # Health Card JOSE
//!
//! The JSON Object Signing and Encryption pieces a health card needs: the
//! P-256 [`Jwk`], structural key validation, RFC 7638 thumbprints, and ES256
//! signing and verification.
//!
//! Signatures travel as raw 64-byte `r || s`. Two verification backends are
//! supported: [`Backend::Native`] hands the raw signature and uncompressed
//! point straight to `p256`, while [`Backend::Der`] routes them through
//! hand-built DER signatures and PEM (SPKI) key documents for platforms
//! whose primitives only accept those forms.

pub mod der;
mod es256;
mod jwk;
pub mod pem;
mod validate;

use sha2::{Digest, Sha256};
use shc_core::codec;

pub use self::es256::{Backend, sign, verify};
pub use self::jwk::Jwk;
pub use self::validate::{Checks, validate_key, validate_keys};

/// SHA-256 digest of `bytes`.
#[must_use]
pub fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Base64url-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn hash(bytes: &[u8]) -> String {
    codec::base64url_encode(&digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_empty() {
        assert_eq!(hash(b""), "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU");
    }
}
