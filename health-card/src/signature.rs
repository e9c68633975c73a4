//! # Signatures
//!
//! Signing a decoded card and verifying its signature against trusted
//! issuer keys.

use shc_core::ErrorCode;
use shc_directory::Directory;
use shc_jose::Jwk;

use crate::Context;
use crate::context::SignatureInfo;
use crate::pipeline::{self, flat, header, payload};
use crate::types::{Flat, Header};

/// Diagnostic label for signature checks.
pub const LABEL: &str = "SIGNATURE";

/// Where to find the key a card was signed with.
#[derive(Clone, Copy, Debug)]
pub enum Trust<'a> {
    /// Look up the issuer and key in a directory.
    Directory(&'a Directory),

    /// Match the key by `kid` in a bare key list. The issuer is not
    /// checked.
    Keys(&'a [Jwk]),

    /// No trusted keys.
    None,
}

impl<'a> From<&'a Directory> for Trust<'a> {
    fn from(directory: &'a Directory) -> Self {
        Self::Directory(directory)
    }
}

impl<'a> From<&'a [Jwk]> for Trust<'a> {
    fn from(keys: &'a [Jwk]) -> Self {
        Self::Keys(keys)
    }
}

/// Verify the signature of the decoded card held in `ctx`.
///
/// The signing input is taken from the card's original segments when
/// available. The outcome is recorded in [`Context::signature`]; a failure
/// is also recorded in the log.
#[allow(clippy::unused_async)]
pub async fn verify(ctx: &mut Context, trust: Trust<'_>) -> bool {
    ctx.log.set_label(LABEL);
    let (Some(header), Some(payload), Some(signature)) =
        (ctx.jws.header.clone(), ctx.jws.payload.clone(), ctx.jws.signature.clone())
    else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "card must be decoded before verification");
        return false;
    };

    let signing_input = match &ctx.flat {
        Some(flat) => flat.signing_input(),
        None => {
            let level = ctx.options.deflate_level;
            let (Some(header), Some(payload)) = (
                header::encode(&header, &mut ctx.log),
                payload::encode(&payload, level, &mut ctx.log),
            ) else {
                return false;
            };
            ctx.log.set_label(LABEL);
            format!("{header}.{payload}")
        }
    };

    // find the signing key
    let (issuer, key) = match trust {
        Trust::Directory(directory) => {
            match directory.find(&payload.iss, Some(&header.kid), None) {
                Ok(found) => {
                    let Some(key) = found.key else {
                        return false;
                    };
                    (Some(found.info.issuer.clone()), key.clone())
                }
                Err(miss) => {
                    ctx.log.error(miss.code(), format!("{miss}: {} {}", payload.iss, header.kid));
                    return false;
                }
            }
        }
        Trust::Keys(keys) => {
            let Some(key) = keys.iter().find(|key| key.kid == header.kid) else {
                ctx.log.error(
                    ErrorCode::DirectoryKeyNotFound,
                    format!("no key matches 'kid' {}", header.kid),
                );
                return false;
            };
            ctx.log.warn(
                ErrorCode::KeysOnlyMatch,
                format!("key {} matched without issuer metadata for {}", key.kid, payload.iss),
            );
            (None, key.clone())
        }
        Trust::None => {
            ctx.log.error(ErrorCode::DirectoryMissing, "no directory or keys to verify against");
            return false;
        }
    };

    let errors = ctx.log.error_count();
    let verified = shc_jose::verify(
        &key,
        &signature,
        signing_input.as_bytes(),
        ctx.options.backend,
        &ctx.options.checks,
        &mut ctx.log,
    );
    if !verified && ctx.log.error_count() == errors {
        ctx.log.error(ErrorCode::SignatureInvalid, "signature does not verify");
    }
    tracing::debug!(verified, kid = %key.kid, "checked signature");

    ctx.signature = Some(SignatureInfo { issuer, key, verified });
    verified
}

/// Sign the payload held in `ctx` with a private `key`.
///
/// A header naming the key is created unless one is present. On success the
/// context holds the signature and segments and, when chaining, every
/// encoded form through to the QR image.
#[allow(clippy::unused_async)]
pub async fn sign(ctx: &mut Context, key: &Jwk) -> bool {
    ctx.log.set_label(LABEL);
    let Some(payload) = ctx.jws.payload.clone() else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "nothing to sign: card has no payload");
        return false;
    };
    let header = ctx.jws.header.get_or_insert_with(|| Header::new(&key.kid)).clone();
    if header.kid != key.kid {
        ctx.log.fatal(
            ErrorCode::JwsHeaderError,
            format!("header 'kid' {} does not match signing key {}", header.kid, key.kid),
        );
        return false;
    }

    let level = ctx.options.deflate_level;
    let (Some(header), Some(payload)) =
        (header::encode(&header, &mut ctx.log), payload::encode(&payload, level, &mut ctx.log))
    else {
        return false;
    };

    ctx.log.set_label(LABEL);
    let signing_input = format!("{header}.{payload}");
    let signed = shc_jose::sign(key, signing_input.as_bytes(), &ctx.options.checks, &mut ctx.log);
    let signature = match signed {
        Ok(signature) => signature,
        Err(e) => {
            ctx.log.fatal(ErrorCode::CryptoFailure, e.to_string());
            return false;
        }
    };

    ctx.jws.signature = Some(signature.to_vec());
    ctx.flat = Some(Flat { header, payload, signature: pipeline::signature::encode(&signature) });

    if !ctx.options.chain {
        return true;
    }
    flat::encode(ctx)
}
