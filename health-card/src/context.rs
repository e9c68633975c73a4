//! # Context
//!
//! The record of every form a card has taken while passing through the
//! pipeline, together with the diagnostics recorded along the way.

use serde_json::Value;
use shc_core::Log;
use shc_directory::Issuer;
use shc_jose::Jwk;

use crate::Options;
use crate::types::{Flat, Jws};

/// Outcome of checking the card signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureInfo {
    /// The issuer entry the key was found under, when checked against a
    /// directory.
    pub issuer: Option<Issuer>,

    /// The key the signature was checked with.
    pub key: Jwk,

    /// Whether the signature verified.
    pub verified: bool,
}

/// A card in all of the forms it has taken.
#[derive(Clone, Debug, Default)]
pub struct Context {
    /// QR image data URL.
    pub qr: Option<String>,

    /// Numeric `shc:/` content.
    pub numeric: Option<String>,

    /// Compact JWS.
    pub compact: Option<String>,

    /// JWS segments.
    pub flat: Option<Flat>,

    /// Decoded JWS.
    pub jws: Jws,

    /// Signature check outcome.
    pub signature: Option<SignatureInfo>,

    /// Diagnostics.
    pub log: Log,

    /// Settings.
    pub options: Options,
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options, ..Self::default() }
    }

    /// The FHIR bundle carried by the card, once decoded.
    #[must_use]
    pub fn fhir_bundle(&self) -> Option<&Value> {
        self.jws.payload.as_ref().map(|payload| &payload.vc.credential_subject.fhir_bundle)
    }

    /// Returns `true` once header, payload, and signature are all decoded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.jws.header.is_some() && self.jws.payload.is_some() && self.jws.signature.is_some()
    }
}
