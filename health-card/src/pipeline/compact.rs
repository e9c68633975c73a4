//! Compact JWS stage.

use shc_core::ErrorCode;
use shc_core::codec::is_base64url;

use crate::Context;
use crate::pipeline::{flat, numeric};
use crate::types::Flat;

/// Diagnostic label for this stage.
pub const LABEL: &str = "COMPACT";

/// Check that the context holds three dot-separated base64url segments.
pub fn validate(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(compact) = &ctx.compact else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "no compact JWS to validate");
        return false;
    };

    let segments: Vec<&str> = compact.split('.').collect();
    if segments.len() != 3 {
        ctx.log.fatal(
            ErrorCode::JwsCompactFormatError,
            format!("compact JWS must have 3 segments, found {}", segments.len()),
        );
        return false;
    }
    for (name, segment) in ["header", "payload", "signature"].iter().zip(segments) {
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

/// Split the compact JWS into its segments.
///
/// Whitespace, such as line breaks picked up when copying a card, is removed
/// first.
pub fn decode(ctx: &mut Context) -> bool {
    if let Some(compact) = &mut ctx.compact
        && compact.contains(char::is_whitespace)
    {
        compact.retain(|c| !c.is_whitespace());
        ctx.log.set_label(LABEL);
        ctx.log.debug("removed whitespace from compact JWS");
    }
    if !validate(ctx) {
        return false;
    }
    let Some(compact) = &ctx.compact else {
        return false;
    };

    let mut segments = compact.split('.').map(ToString::to_string);
    let (Some(header), Some(payload), Some(signature)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return false;
    };
    ctx.flat = Some(Flat { header, payload, signature });

    if !ctx.options.chain {
        return true;
    }
    flat::decode(ctx)
}

/// Join the segments into a compact JWS.
pub fn encode(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(flat) = &ctx.flat else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "no JWS segments to encode");
        return false;
    };
    ctx.compact = Some(format!("{}.{}.{}", flat.header, flat.payload, flat.signature));

    if !validate(ctx) {
        return false;
    }
    if !ctx.options.chain {
        return true;
    }
    numeric::encode(ctx)
}

#[cfg(test)]
mod tests {
    use test_utils::fixtures;

    use super::*;
    use crate::Options;

    fn compact(content: &str) -> Context {
        let mut ctx = Context::new(Options { chain: false, ..Options::default() });
        ctx.compact = Some(content.to_string());
        ctx
    }

    #[test]
    fn splits_segments() {
        let mut ctx = compact(fixtures::COMPACT);
        assert!(decode(&mut ctx));

        let flat = ctx.flat.expect("should have segments");
        assert!(fixtures::COMPACT.starts_with(&flat.signing_input()));
    }

    #[test]
    fn strips_whitespace() {
        let mut ctx = compact("eyJh\n  bGci.abcd.\tefgh");
        assert!(decode(&mut ctx));
        assert_eq!(ctx.compact.as_deref(), Some("eyJhbGci.abcd.efgh"));
    }

    #[test]
    fn wrong_segment_count() {
        let mut ctx = compact("abcd.efgh");
        assert!(!decode(&mut ctx));
        assert!(ctx.log.has(ErrorCode::JwsCompactFormatError));
    }

    #[test]
    fn short_segment() {
        let mut ctx = compact("abcd.e.fghi");
        assert!(!validate(&mut ctx));
    }

    #[test]
    fn bad_alphabet() {
        let mut ctx = compact("ab+d.efgh.ijkl");
        assert!(!validate(&mut ctx));
    }
}
