//! # JSON Web Key
//!
//! The P-256 key form published in an issuer's `jwks.json`.

use anyhow::{Result, anyhow};
use p256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shc_core::codec;

/// A P-256 JSON Web Key as published by a health card issuer.
///
/// String members default to empty so structurally incomplete keys still
/// deserialize and can be reported on by [`validate_key`].
///
/// [`validate_key`]: crate::validate_key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Jwk {
    /// Key type. Always `EC`.
    pub kty: String,

    /// Key identifier: the RFC 7638 thumbprint of the public key.
    pub kid: String,

    /// Intended use. Always `sig`.
    #[serde(rename = "use")]
    pub use_: String,

    /// Signing algorithm. Always `ES256`.
    pub alg: String,

    /// Curve. Always `P-256`.
    pub crv: String,

    /// Base64url-encoded x coordinate.
    pub x: String,

    /// Base64url-encoded y coordinate.
    pub y: String,

    /// Base64url-encoded private scalar. Present only on private keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// Version of the revocation list published for this key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_version: Option<u64>,

    /// X.509 certificate chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,

    /// Any other members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize)]
struct Thumbprint<'a> {
    crv: &'a str,
    kty: &'a str,
    x: &'a str,
    y: &'a str,
}

impl Jwk {
    /// Build a private JWK, with `kid` set to its thumbprint, from a signing
    /// key.
    ///
    /// # Errors
    ///
    /// Returns an error if the thumbprint cannot be computed.
    pub fn from_signing_key(signing_key: &SigningKey) -> Result<Self> {
        let point = signing_key.verifying_key().to_encoded_point(false);
        let x = point.x().ok_or_else(|| anyhow!("public key has no x coordinate"))?;
        let y = point.y().ok_or_else(|| anyhow!("public key has no y coordinate"))?;

        let mut jwk = Self {
            kty: "EC".to_string(),
            use_: "sig".to_string(),
            alg: "ES256".to_string(),
            crv: "P-256".to_string(),
            x: codec::base64url_encode(x),
            y: codec::base64url_encode(y),
            d: Some(codec::base64url_encode(&signing_key.to_bytes())),
            ..Self::default()
        };
        jwk.kid = jwk.thumbprint()?;
        Ok(jwk)
    }

    /// RFC 7638 thumbprint of the key: the base64url SHA-256 of the
    /// canonical `{crv, kty, x, y}` JSON.
    ///
    /// The curve and key type are fixed to `P-256` and `EC` so the result is
    /// independent of the key's own (possibly wrong) `crv` and `kty`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canonical JSON cannot be serialized.
    pub fn thumbprint(&self) -> Result<String> {
        let canonical = Thumbprint { crv: "P-256", kty: "EC", x: &self.x, y: &self.y };
        let json = serde_json::to_vec(&canonical)?;
        Ok(crate::hash(&json))
    }

    /// The public part of the key.
    #[must_use]
    pub fn to_public(&self) -> Self {
        Self { d: None, ..self.clone() }
    }

    /// Returns `true` when the key carries a private scalar.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Decoded `(x, y)` coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if either coordinate is not 32 bytes of base64url.
    pub fn coordinates(&self) -> Result<([u8; 32], [u8; 32])> {
        Ok((field("x", &self.x)?, field("y", &self.y)?))
    }

    /// Decoded private scalar.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is public or `d` is not 32 bytes of
    /// base64url.
    pub fn scalar(&self) -> Result<[u8; 32]> {
        let d = self.d.as_deref().ok_or_else(|| anyhow!("key has no private scalar"))?;
        field("d", d)
    }
}

fn field(name: &str, encoded: &str) -> Result<[u8; 32]> {
    let bytes = codec::base64url_decode(encoded)?;
    bytes.try_into().map_err(|b: Vec<u8>| anyhow!("'{name}' is {} bytes, expected 32", b.len()))
}
