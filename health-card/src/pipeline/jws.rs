//! Decoded JWS stage.

use shc_core::ErrorCode;

use crate::Context;
use crate::pipeline::{flat, header, payload, signature};
use crate::types::{Flat, Payload};

/// Diagnostic label for this stage.
pub const LABEL: &str = "JWS";

/// Check that header, payload, and signature are all present and that the
/// card is already valid.
pub fn validate(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);

    let mut complete = true;
    for (name, present) in [
        ("header", ctx.jws.header.is_some()),
        ("payload", ctx.jws.payload.is_some()),
        ("signature", ctx.jws.signature.is_some()),
    ] {
        if !present {
            ctx.log.fatal(ErrorCode::ParameterInvalid, format!("JWS is missing its {name}"));
            complete = false;
        }
    }

    let now = ctx.options.now();
    if let Some(nbf) = ctx.jws.payload.as_ref().and_then(Payload::nbf_seconds)
        && i64::try_from(nbf).is_ok_and(|nbf| nbf > now)
    {
        ctx.log.warn(ErrorCode::NotYetValid, format!("card 'nbf' {nbf} is in the future"));
    }
    complete
}

/// Check each part of a JWS supplied already decoded.
pub fn decode(ctx: &mut Context) -> bool {
    if let Some(header) = &ctx.jws.header {
        header::validate(header, &mut ctx.log);
    }
    if let Some(payload) = &ctx.jws.payload {
        payload::validate(payload, &mut ctx.log);
    }
    if let Some(signature) = &ctx.jws.signature {
        signature::validate(signature, &mut ctx.log);
    }
    validate(ctx) && !ctx.log.is_fatal()
}

/// Encode header, payload, and signature as segments.
pub fn encode(ctx: &mut Context) -> bool {
    if !validate(ctx) {
        return false;
    }
    let (Some(header), Some(payload), Some(sig)) =
        (&ctx.jws.header, &ctx.jws.payload, &ctx.jws.signature)
    else {
        return false;
    };

    let level = ctx.options.deflate_level;
    let (Some(header), Some(payload)) =
        (header::encode(header, &mut ctx.log), payload::encode(payload, level, &mut ctx.log))
    else {
        return false;
    };
    ctx.flat = Some(Flat { header, payload, signature: signature::encode(sig) });

    if !ctx.options.chain {
        return true;
    }
    flat::encode(ctx)
}

#[cfg(test)]
mod tests {
    use test_utils::fixtures;

    use super::*;
    use crate::Options;
    use crate::pipeline;

    #[test]
    fn missing_signature() {
        let mut ctx = pipeline::decode(fixtures::NUMERIC, None, Options::default());
        ctx.jws.signature = None;

        assert!(!encode(&mut ctx));
        assert!(ctx.log.is_fatal());
    }

    #[test]
    fn future_nbf_warns() {
        let options = Options { now: Some(0), ..Options::default() };
        let ctx = pipeline::decode(fixtures::NUMERIC, None, options);

        assert!(ctx.log.has(ErrorCode::NotYetValid));
        assert!(!ctx.log.is_fatal());
    }

    #[test]
    fn decoded_input() {
        let decoded = pipeline::decode(fixtures::NUMERIC, None, Options::default());
        let ctx = pipeline::decode(decoded.jws.clone(), None, Options::default());

        assert!(ctx.is_complete());
        assert_eq!(ctx.log.error_count(), 0);
    }

    #[test]
    fn encode_then_decode() {
        let decoded = pipeline::decode(fixtures::NUMERIC, None, Options::default());
        let options = Options { chain: false, ..Options::default() };

        let mut ctx = pipeline::encode(decoded.jws.clone(), options);
        assert!(ctx.flat.is_some());
        ctx.options.chain = true;
        assert!(flat::decode(&mut ctx));
        assert_eq!(ctx.jws, decoded.jws);
    }
}
