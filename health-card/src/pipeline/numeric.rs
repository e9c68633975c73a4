//! Numeric `shc:/` stage.
//!
//! Each character of the compact JWS is written as two decimal digits: its
//! code point less 45 (`-`, the lowest character a compact JWS can hold).

use shc_core::ErrorCode;

use crate::Context;
use crate::pipeline::{compact, qr};
use crate::types::NUMERIC_PREFIX;

/// Diagnostic label for this stage.
pub const LABEL: &str = "NUMERIC";

const OFFSET: u8 = b'-';
const MAX_PAIR: u8 = b'z' - OFFSET;

/// Check that the context holds `shc:/` followed by an even number of
/// digits, each pair within range.
pub fn validate(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(numeric) = &ctx.numeric else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "no numeric content to validate");
        return false;
    };
    let Some(digits) = numeric.strip_prefix(NUMERIC_PREFIX) else {
        ctx.log.fatal(
            ErrorCode::ShcFormatError,
            format!("content must start with '{NUMERIC_PREFIX}'"),
        );
        return false;
    };

    if digits.contains('/') {
        ctx.log.fatal(ErrorCode::ShcFormatError, "chunked QR content is not supported");
        return false;
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        ctx.log.fatal(ErrorCode::ShcFormatError, "content must be digits after the prefix");
        return false;
    }
    if digits.len() % 2 != 0 {
        ctx.log.fatal(ErrorCode::ShcFormatError, "content has an odd number of digits");
        return false;
    }
    if let Some(pair) = pairs(digits).find(|pair| *pair > MAX_PAIR) {
        ctx.log.fatal(ErrorCode::ShcFormatError, format!("digit pair {pair} is out of range"));
        return false;
    }
    true
}

/// Convert the digits back to the compact JWS.
pub fn decode(ctx: &mut Context) -> bool {
    if !validate(ctx) {
        return false;
    }
    let Some(digits) = ctx.numeric.as_deref().and_then(|n| n.strip_prefix(NUMERIC_PREFIX)) else {
        return false;
    };
    ctx.compact = Some(pairs(digits).map(|pair| char::from(pair + OFFSET)).collect());

    if !ctx.options.chain {
        return true;
    }
    compact::decode(ctx)
}

/// Convert the compact JWS to digits.
pub fn encode(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(compact) = &ctx.compact else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "no compact JWS to encode");
        return false;
    };

    let mut numeric = String::with_capacity(NUMERIC_PREFIX.len() + compact.len() * 2);
    numeric.push_str(NUMERIC_PREFIX);
    for c in compact.chars() {
        let Some(pair) =
            u8::try_from(c).ok().and_then(|b| b.checked_sub(OFFSET)).filter(|p| *p <= MAX_PAIR)
        else {
            ctx.log.fatal(ErrorCode::EncodeFailed, format!("character {c:?} cannot be encoded"));
            return false;
        };
        numeric.push_str(&format!("{pair:02}"));
    }
    ctx.numeric = Some(numeric);

    if !validate(ctx) {
        return false;
    }
    if !ctx.options.chain {
        return true;
    }
    qr::encode(ctx)
}

fn pairs(digits: &str) -> impl Iterator<Item = u8> + '_ {
    digits.as_bytes().chunks(2).map(|pair| (pair[0] - b'0') * 10 + (pair[1] - b'0'))
}
