//! # Issuance
//!
//! Build, sign, and encode a new health card.
//!
//! ```rust,ignore
//! let ctx = CardBuilder::new()
//!     .issuer("https://example.com/issuer")
//!     .fhir_bundle(bundle)
//!     .key(&private_jwk)
//!     .build()
//!     .await?;
//! let qr = ctx.qr;
//! ```

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use shc_core::{Error, Level};
use shc_jose::Jwk;
use tracing::instrument;

use crate::types::{CredentialSubject, FHIR_VERSION, HEALTH_CARD_TYPE, Header, Payload, Vc};
use crate::{Context, Options, signature};

/// Builds a signed health card in every encoded form.
#[derive(Debug)]
pub struct CardBuilder<I, B, K> {
    issuer: I,
    fhir_bundle: B,
    key: K,
    nbf: Option<DateTime<Utc>>,
    exp: Option<DateTime<Utc>>,
    types: Vec<String>,
    rid: Option<String>,
    fhir_version: Option<String>,
    options: Options,
}

/// Builder has no issuer.
#[doc(hidden)]
pub struct NoIssuer;
/// Builder has issuer.
#[doc(hidden)]
pub struct HasIssuer(String);

/// Builder has no FHIR bundle.
#[doc(hidden)]
pub struct NoBundle;
/// Builder has FHIR bundle.
#[doc(hidden)]
pub struct HasBundle(Value);

/// Builder has no signing key.
#[doc(hidden)]
pub struct NoKey;
/// Builder has signing key.
#[doc(hidden)]
pub struct HasKey<'a>(&'a Jwk);

impl Default for CardBuilder<NoIssuer, NoBundle, NoKey> {
    fn default() -> Self {
        Self::new()
    }
}

impl CardBuilder<NoIssuer, NoBundle, NoKey> {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            issuer: NoIssuer,
            fhir_bundle: NoBundle,
            key: NoKey,
            nbf: None,
            exp: None,
            types: Vec::new(),
            rid: None,
            fhir_version: None,
            options: Options::default(),
        }
    }
}

// Issuer
impl<B, K> CardBuilder<NoIssuer, B, K> {
    /// Set the issuer URL (`iss`).
    #[must_use]
    pub fn issuer(self, issuer: impl Into<String>) -> CardBuilder<HasIssuer, B, K> {
        CardBuilder {
            issuer: HasIssuer(issuer.into()),
            fhir_bundle: self.fhir_bundle,
            key: self.key,
            nbf: self.nbf,
            exp: self.exp,
            types: self.types,
            rid: self.rid,
            fhir_version: self.fhir_version,
            options: self.options,
        }
    }
}

// FHIR bundle
impl<I, K> CardBuilder<I, NoBundle, K> {
    /// Set the FHIR `Bundle` the card carries.
    #[must_use]
    pub fn fhir_bundle(self, fhir_bundle: Value) -> CardBuilder<I, HasBundle, K> {
        CardBuilder {
            issuer: self.issuer,
            fhir_bundle: HasBundle(fhir_bundle),
            key: self.key,
            nbf: self.nbf,
            exp: self.exp,
            types: self.types,
            rid: self.rid,
            fhir_version: self.fhir_version,
            options: self.options,
        }
    }
}

// Signing key
impl<I, B> CardBuilder<I, B, NoKey> {
    /// Set the issuer's private signing key.
    #[must_use]
    pub fn key(self, key: &Jwk) -> CardBuilder<I, B, HasKey<'_>> {
        CardBuilder {
            issuer: self.issuer,
            fhir_bundle: self.fhir_bundle,
            key: HasKey(key),
            nbf: self.nbf,
            exp: self.exp,
            types: self.types,
            rid: self.rid,
            fhir_version: self.fhir_version,
            options: self.options,
        }
    }
}

// Optional fields
impl<I, B, K> CardBuilder<I, B, K> {
    /// Set the issuance time. Defaults to now.
    #[must_use]
    pub fn nbf(mut self, nbf: DateTime<Utc>) -> Self {
        self.nbf = Some(nbf);
        self
    }

    /// Set an expiry time.
    #[must_use]
    pub fn exp(mut self, exp: DateTime<Utc>) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Add a credential type, such as
    /// `https://smarthealth.cards#immunization`.
    #[must_use]
    pub fn add_type(mut self, type_: impl Into<String>) -> Self {
        self.types.push(type_.into());
        self
    }

    /// Set the revocation identifier. Without one, the card is identified by
    /// a digest of its bundle.
    #[must_use]
    pub fn rid(mut self, rid: impl Into<String>) -> Self {
        self.rid = Some(rid.into());
        self
    }

    /// Set the FHIR version of the bundle. Defaults to `4.0.1`.
    #[must_use]
    pub fn fhir_version(mut self, fhir_version: impl Into<String>) -> Self {
        self.fhir_version = Some(fhir_version.into());
        self
    }

    /// Set the pipeline options used to encode the card.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

impl CardBuilder<HasIssuer, HasBundle, HasKey<'_>> {
    /// Build the card, returning a context holding the decoded card and
    /// every encoded form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterInvalid`] if the card content is invalid, or
    /// [`Error::CryptoFailure`] if it cannot be signed.
    #[instrument(level = "debug", skip_all)]
    pub async fn build(self) -> Result<Context, Error> {
        let nbf = self.nbf.unwrap_or_else(Utc::now);
        if let Some(exp) = self.exp
            && exp <= nbf
        {
            return Err(shc_core::invalid!("'exp' must be later than 'nbf'"));
        }

        let mut key = self.key.0.clone();
        if key.kid.is_empty() {
            key.kid = key.thumbprint()?;
        }

        let mut types = vec![HEALTH_CARD_TYPE.to_string()];
        for type_ in self.types {
            if !types.contains(&type_) {
                types.push(type_);
            }
        }
        let payload = Payload {
            iss: self.issuer.0,
            nbf: Number::from(nbf.timestamp()),
            exp: self.exp.map(|exp| Number::from(exp.timestamp())),
            vc: Vc {
                types,
                credential_subject: CredentialSubject {
                    fhir_version: self.fhir_version.unwrap_or_else(|| FHIR_VERSION.to_string()),
                    fhir_bundle: self.fhir_bundle.0,
                    extra: Map::new(),
                },
                rid: self.rid,
                extra: Map::new(),
            },
            rid: None,
            extra: Map::new(),
        };

        let mut ctx = Context::new(self.options);
        ctx.jws.header = Some(Header::new(&key.kid));
        ctx.jws.payload = Some(payload);
        signature::sign(&mut ctx, &key).await;

        if let Some(entry) = ctx.log.at_least(Level::Error).next() {
            let message = format!("{}: {}", entry.label, entry.message);
            if entry.label == signature::LABEL {
                return Err(Error::CryptoFailure(message));
            }
            return Err(Error::ParameterInvalid(message));
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_utils::fixtures;

    use super::*;
    use crate::pipeline;

    #[tokio::test]
    async fn issues_every_form() {
        let key = fixtures::private_jwk();
        let nbf = Utc.timestamp_opt(1_609_459_200, 0).single().expect("should be valid");

        let ctx = CardBuilder::new()
            .issuer(fixtures::ISSUER)
            .fhir_bundle(fixtures::fhir_bundle())
            .key(&key)
            .nbf(nbf)
            .add_type("https://smarthealth.cards#immunization")
            .build()
            .await
            .expect("should issue");

        assert!(ctx.qr.is_some());
        let numeric = ctx.numeric.clone().expect("should have numeric form");
        let decoded = pipeline::decode(numeric, None, Options::default());
        assert_eq!(decoded.jws, ctx.jws);
        assert_eq!(decoded.compact, ctx.compact);
    }

    #[tokio::test]
    async fn exp_before_nbf() {
        let key = fixtures::private_jwk();
        let result = CardBuilder::new()
            .issuer(fixtures::ISSUER)
            .fhir_bundle(fixtures::fhir_bundle())
            .key(&key)
            .nbf(Utc::now())
            .exp(Utc::now() - chrono::Duration::days(1))
            .build()
            .await;

        assert!(matches!(result, Err(Error::ParameterInvalid(_))));
    }

    #[tokio::test]
    async fn public_key_rejected() {
        let key = fixtures::public_jwk();
        let result = CardBuilder::new()
            .issuer(fixtures::ISSUER)
            .fhir_bundle(fixtures::fhir_bundle())
            .key(&key)
            .build()
            .await;

        assert!(matches!(result, Err(Error::CryptoFailure(_))));
    }

    #[tokio::test]
    async fn not_a_bundle() {
        let key = fixtures::private_jwk();
        let result = CardBuilder::new()
            .issuer(fixtures::ISSUER)
            .fhir_bundle(serde_json::json!({"resourceType": "Patient"}))
            .key(&key)
            .build()
            .await;

        assert!(matches!(result, Err(Error::ParameterInvalid(_))));
    }
}
