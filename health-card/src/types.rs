//! # Card Types
//!
//! The decoded forms of a health card and the inputs accepted by the
//! pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// JWS `alg` used by every health card.
pub const ALG_ES256: &str = "ES256";

/// JWS `zip` marking a raw-DEFLATE payload.
pub const ZIP_DEFLATE: &str = "DEF";

/// FHIR version of the bundles carried by health cards.
pub const FHIR_VERSION: &str = "4.0.1";

/// Epoch values above this are milliseconds. As seconds it falls in the
/// year 5138.
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// Credential type every health card carries.
pub const HEALTH_CARD_TYPE: &str = "https://smarthealth.cards#health-card";

/// Prefix of the numeric QR content.
pub const NUMERIC_PREFIX: &str = "shc:/";

/// The JWS protected header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    /// Signing algorithm. Always `ES256`.
    pub alg: String,

    /// Payload compression. Always `DEF`.
    pub zip: String,

    /// Thumbprint of the signing key.
    pub kid: String,

    /// Any other members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    /// The standard header for a card signed by the key `kid`.
    #[must_use]
    pub fn new(kid: impl Into<String>) -> Self {
        Self {
            alg: ALG_ES256.to_string(),
            zip: ZIP_DEFLATE.to_string(),
            kid: kid.into(),
            extra: Map::new(),
        }
    }
}

/// The JWS payload: a JWT-style claim set wrapping the credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Issuer URL.
    pub iss: String,

    /// Issuance time as epoch seconds (or milliseconds, see
    /// [`Payload::nbf_seconds`]).
    pub nbf: Number,

    /// Expiry time as epoch seconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exp: Option<Number>,

    /// The credential.
    pub vc: Vc,

    /// Revocation identifier, when not carried inside `vc`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rid: Option<String>,

    /// Any other members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    /// `nbf` in epoch seconds. Values too large to be seconds are taken to be
    /// milliseconds.
    #[must_use]
    pub fn nbf_seconds(&self) -> Option<u64> {
        epoch_seconds(&self.nbf)
    }

    /// `exp` in epoch seconds, normalized as for [`Payload::nbf_seconds`].
    #[must_use]
    pub fn exp_seconds(&self) -> Option<u64> {
        self.exp.as_ref().and_then(epoch_seconds)
    }

    /// The revocation identifier carried by the card, if any.
    #[must_use]
    pub fn rid(&self) -> Option<&str> {
        self.vc.rid.as_deref().or(self.rid.as_deref())
    }
}

/// The verifiable credential claim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Vc {
    /// Credential types.
    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// The FHIR content.
    pub credential_subject: CredentialSubject,

    /// Revocation identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,

    /// Any other members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The credential subject: a FHIR bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialSubject {
    /// FHIR version of the bundle.
    pub fhir_version: String,

    /// The FHIR `Bundle` resource.
    pub fhir_bundle: Value,

    /// Any other members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The three base64url segments of a JWS.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flat {
    /// Encoded header.
    pub header: String,

    /// Encoded, compressed payload.
    pub payload: String,

    /// Encoded signature.
    pub signature: String,
}

impl Flat {
    /// The bytes the signature is computed over: `header.payload`.
    #[must_use]
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

/// A fully decoded JWS.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Jws {
    /// Decoded header.
    pub header: Option<Header>,

    /// Decoded payload.
    pub payload: Option<Payload>,

    /// Raw 64-byte `r || s` signature.
    pub signature: Option<Vec<u8>>,
}

/// The form an artifact takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// A QR image as a `data:image/...;base64,` URL.
    Qr,

    /// Numeric `shc:/` QR content.
    Numeric,

    /// Compact `header.payload.signature` JWS.
    Compact,

    /// The three JWS segments.
    Flat,

    /// A decoded JWS.
    Jws,

    /// A lone header segment.
    Header,

    /// A lone payload segment.
    Payload,

    /// A lone signature segment.
    Signature,
}

/// Anything the pipeline can decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Text: a QR data URL, numeric string, compact JWS, or lone segment.
    Text(String),

    /// JWS segments.
    Flat(Flat),

    /// A decoded JWS.
    Jws(Jws),
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Flat> for Input {
    fn from(flat: Flat) -> Self {
        Self::Flat(flat)
    }
}

impl From<Jws> for Input {
    fn from(jws: Jws) -> Self {
        Self::Jws(jws)
    }
}

impl Artifact {
    /// Infer the artifact type from the shape of `input`.
    ///
    /// Lone segments are ambiguous and are never inferred.
    #[must_use]
    pub fn detect(input: &Input) -> Option<Self> {
        match input {
            Input::Flat(_) => Some(Self::Flat),
            Input::Jws(_) => Some(Self::Jws),
            Input::Text(text) => {
                let text = text.trim();
                if text.starts_with("data:image/png;base64,")
                    || text.starts_with("data:image/jpeg;base64,")
                {
                    Some(Self::Qr)
                } else if text.starts_with(NUMERIC_PREFIX) {
                    Some(Self::Numeric)
                } else if is_compact(text) {
                    Some(Self::Compact)
                } else {
                    None
                }
            }
        }
    }
}

// Three base64url segments, tolerating embedded whitespace.
fn is_compact(text: &str) -> bool {
    let segments: Vec<&str> = text.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            segment.chars().any(|c| !c.is_whitespace())
                && segment.chars().all(|c| {
                    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c.is_whitespace()
                })
        })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn epoch_seconds(value: &Number) -> Option<u64> {
    let seconds = match value.as_u64() {
        Some(whole) if whole > MILLIS_THRESHOLD => whole / 1000,
        Some(whole) => whole,
        None => {
            let fractional = value.as_f64().filter(|v| v.is_finite() && *v >= 0.0)?;
            let fractional = if fractional > MILLIS_THRESHOLD as f64 {
                fractional / 1000.0
            } else {
                fractional
            };
            fractional.floor() as u64
        }
    };
    Some(seconds)
}
