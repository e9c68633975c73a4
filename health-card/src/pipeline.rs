//! # Artifact Pipeline
//!
//! A linear state machine connecting the forms a card can take:
//!
//! ```text
//! QR <-> Numeric <-> Compact <-> Flat <-> Jws
//! ```
//!
//! Each stage module exposes `validate` (check the form held in the
//! [`Context`]), `decode` (move one step toward [`Jws`]), and `encode` (move
//! one step toward QR). When [`Options::chain`] is set a successful stage
//! hands on to the next; a fatal diagnostic stops the chain but leaves
//! everything recorded so far in the context.
//!
//! The header, payload, and signature segments are handled by their own
//! modules, which work on a single value and a [`Log`](shc_core::Log).

pub mod compact;
pub mod flat;
pub mod header;
pub mod jws;
pub mod numeric;
pub mod payload;
pub mod qr;
pub mod signature;

use shc_core::ErrorCode;

use crate::types::{Artifact, Input, Jws};
use crate::{Context, Options};

const LABEL: &str = "DECODE";

/// Decode `input` toward a fully decoded [`Jws`].
///
/// The artifact type is detected from the shape of `input` unless given.
/// Lone header, payload, and signature segments must be named explicitly.
#[must_use]
pub fn decode(input: impl Into<Input>, artifact: Option<Artifact>, options: Options) -> Context {
    let input = input.into();
    let mut ctx = Context::new(options);
    ctx.log.set_label(LABEL);

    let Some(artifact) = artifact.or_else(|| Artifact::detect(&input)) else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "input is not a recognized health card artifact");
        return ctx;
    };
    tracing::trace!(?artifact, "decoding");

    match (artifact, input) {
        (Artifact::Qr, Input::Text(text)) => {
            ctx.qr = Some(text.trim().to_string());
            qr::decode(&mut ctx);
        }
        (Artifact::Numeric, Input::Text(text)) => {
            ctx.numeric = Some(text.trim().to_string());
            numeric::decode(&mut ctx);
        }
        (Artifact::Compact, Input::Text(text)) => {
            ctx.compact = Some(text);
            compact::decode(&mut ctx);
        }
        (Artifact::Flat, Input::Flat(flat)) => {
            ctx.flat = Some(flat);
            flat::decode(&mut ctx);
        }
        (Artifact::Jws, Input::Jws(decoded)) => {
            ctx.jws = decoded;
            jws::decode(&mut ctx);
        }
        (Artifact::Header, Input::Text(text)) => {
            ctx.jws.header = header::decode(text.trim(), &mut ctx.log);
        }
        (Artifact::Payload, Input::Text(text)) => {
            ctx.jws.payload = payload::decode(text.trim(), &mut ctx.log);
        }
        (Artifact::Signature, Input::Text(text)) => {
            ctx.jws.signature = signature::decode(text.trim(), &mut ctx.log);
        }
        (artifact, _) => {
            ctx.log.fatal(
                ErrorCode::ParameterInvalid,
                format!("input cannot be decoded as a {artifact:?} artifact"),
            );
        }
    }
    ctx
}

/// Encode a decoded card toward a QR image.
///
/// The JWS must carry a signature; use [`crate::sign`] to produce one.
#[must_use]
pub fn encode(jws: Jws, options: Options) -> Context {
    let mut ctx = Context::new(options);
    ctx.jws = jws;
    jws::encode(&mut ctx);
    ctx
}
