//! JWS segments stage.

use shc_core::ErrorCode;
use shc_core::codec::is_base64url;

use crate::Context;
use crate::pipeline::{compact, header, jws, payload, signature};

/// Diagnostic label for this stage.
pub const LABEL: &str = "FLAT";

/// Check that each segment is base64url.
pub fn validate(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(flat) = &ctx.flat else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "no JWS segments to validate");
        return false;
    };

    let segments =
        [("header", &flat.header), ("payload", &flat.payload), ("signature", &flat.signature)];
    for (name, segment) in segments {
        if !is_base64url(segment) {
            ctx.log.fatal(
                ErrorCode::JwsCompactFormatError,
                format!("{name} segment is not base64url"),
            );
            return false;
        }
    }
    true
}

/// Decode the header, payload, and signature segments.
///
/// All three are decoded even when one fails, so that every problem is
/// reported.
pub fn decode(ctx: &mut Context) -> bool {
    if !validate(ctx) {
        return false;
    }
    let Some(flat) = ctx.flat.clone() else {
        return false;
    };

    ctx.jws.header = header::decode(&flat.header, &mut ctx.log);
    ctx.jws.payload = payload::decode(&flat.payload, &mut ctx.log);
    ctx.jws.signature = signature::decode(&flat.signature, &mut ctx.log);

    if ctx.log.is_fatal() {
        return false;
    }
    if !ctx.options.chain {
        return true;
    }
    jws::validate(ctx)
}

/// Continue encoding from segments already in the context.
pub fn encode(ctx: &mut Context) -> bool {
    if !validate(ctx) {
        return false;
    }
    if !ctx.options.chain {
        return true;
    }
    compact::encode(ctx)
}
