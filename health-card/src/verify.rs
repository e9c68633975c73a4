//! # Verification
//!
//! Drives a card from any supported form to a [`Verdict`]: decode and
//! validate, check the signature, then check expiry and revocation. The
//! signature, expiry, and revocation checks are independent and each
//! contributes its own [`Reason`].

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use shc_core::{ErrorCode, Log};
use shc_directory::Issuer;
use tracing::instrument;

use crate::signature::{self, Trust};
use crate::types::{Input, Payload};
use crate::{Context, Options, pipeline, revocation};

/// Diagnostic label for the verdict checks.
pub const LABEL: &str = "VERIFY";

/// Why a card did or did not verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// Every check passed.
    Success,

    /// Decoding or structural validation recorded an error.
    FailedValidation,

    /// The signature did not verify, or no trusted key was found.
    BadSignature,

    /// The card's `exp` has passed.
    Expired,

    /// The issuer has revoked the card.
    Revoked,
}

impl Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::FailedValidation => "failed-validation",
            Self::BadSignature => "bad-signature",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        })
    }
}

/// The outcome of verifying a card.
#[derive(Clone, Debug, Serialize)]
pub struct Verdict {
    /// Whether the card verified.
    pub verified: bool,

    /// Every reason that applies; `[Success]` when verified.
    pub reasons: Vec<Reason>,

    /// All diagnostics recorded along the way.
    pub diagnostics: Log,

    /// The issuer, when the signing key was found in a directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Issuer>,

    /// The decoded payload, when decoding got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Verdict {
    /// The reasons joined with `|`, e.g. `bad-signature|expired`.
    #[must_use]
    pub fn reason(&self) -> String {
        self.reasons.iter().map(ToString::to_string).collect::<Vec<_>>().join("|")
    }

    /// Returns `true` if `reason` applies.
    #[must_use]
    pub fn has(&self, reason: Reason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// Verify a card supplied in any supported form.
///
/// Stages always chain, whatever [`Options::chain`] says. Problems never
/// abort verification: they are reported through the verdict's reasons and
/// diagnostics.
#[instrument(level = "debug", skip_all)]
pub async fn verify(input: impl Into<Input>, trust: Trust<'_>, options: Options) -> Verdict {
    let mut ctx = pipeline::decode(input, None, Options { chain: true, ..options });
    let mut reasons = Vec::new();

    // --------------------------------------------------
    // Structure
    // --------------------------------------------------
    if ctx.log.error_count() > 0 || !ctx.is_complete() {
        reasons.push(Reason::FailedValidation);
    }

    if ctx.is_complete() && !ctx.log.is_fatal() {
        // --------------------------------------------------
        // Signature
        // --------------------------------------------------
        if !signature::verify(&mut ctx, trust).await {
            reasons.push(Reason::BadSignature);
        }

        // --------------------------------------------------
        // Expiry and revocation
        // --------------------------------------------------
        if expired(&mut ctx) {
            reasons.push(Reason::Expired);
        }
        if let Trust::Directory(directory) = trust
            && revocation::revoked(&mut ctx, directory)
        {
            reasons.push(Reason::Revoked);
        }
    }

    let verified = reasons.is_empty();
    if verified {
        reasons.push(Reason::Success);
    }

    let mut verdict = Verdict {
        verified,
        reasons,
        issuer: ctx.signature.and_then(|info| info.issuer),
        payload: ctx.jws.payload,
        diagnostics: ctx.log,
    };
    let summary = format!("verdict: {}", verdict.reason());
    verdict.diagnostics.set_label(LABEL);
    verdict.diagnostics.info(summary);
    verdict
}

fn expired(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(exp) = ctx.jws.payload.as_ref().and_then(Payload::exp_seconds) else {
        return false;
    };
    let now = ctx.options.now();
    if u64::try_from(now).is_ok_and(|now| now >= exp) {
        ctx.log.error(ErrorCode::Expired, format!("card expired at {exp}"));
        return true;
    }
    false
}
