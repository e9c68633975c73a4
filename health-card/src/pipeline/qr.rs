//! QR image stage.

use anyhow::Result;
use shc_core::ErrorCode;

use crate::Context;
use crate::pipeline::numeric;

/// Diagnostic label for this stage.
pub const LABEL: &str = "QR";

const IMAGE_PREFIXES: [&str; 2] = ["data:image/png;base64,", "data:image/jpeg;base64,"];

/// Check that the context holds a PNG or JPEG data URL.
pub fn validate(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(image) = &ctx.qr else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "no QR image to validate");
        return false;
    };
    if !IMAGE_PREFIXES.iter().any(|prefix| image.starts_with(prefix)) {
        ctx.log.fatal(ErrorCode::QrDecodeError, "QR image must be a PNG or JPEG data URL");
        return false;
    }
    true
}

/// Read the numeric content of the QR image using the configured scanner.
pub fn decode(ctx: &mut Context) -> bool {
    if !validate(ctx) {
        return false;
    }
    let Some(image) = ctx.qr.clone() else {
        return false;
    };
    let Some(scanner) = ctx.options.scanner.clone() else {
        ctx.log.fatal(ErrorCode::QrDecodeError, "no QR scanner configured");
        return false;
    };

    match scanner.scan(&image) {
        Ok(text) => ctx.numeric = Some(text.trim().to_string()),
        Err(e) => {
            ctx.log.fatal(ErrorCode::QrDecodeError, format!("failed to read QR image: {e}"));
            return false;
        }
    }

    if !ctx.options.chain {
        return true;
    }
    numeric::decode(ctx)
}

/// Render the numeric content as a QR image. This is the last encode stage.
pub fn encode(ctx: &mut Context) -> bool {
    ctx.log.set_label(LABEL);
    let Some(numeric) = ctx.numeric.clone() else {
        ctx.log.fatal(ErrorCode::ParameterInvalid, "no numeric content to render");
        return false;
    };

    let rendered = match &ctx.options.renderer {
        Some(renderer) => renderer.render(&numeric),
        None => render_default(&numeric),
    };
    match rendered {
        Ok(image) => ctx.qr = Some(image),
        Err(e) => {
            ctx.log.fatal(ErrorCode::EncodeFailed, format!("failed to render QR image: {e}"));
            return false;
        }
    }
    validate(ctx)
}

#[cfg(feature = "qr")]
fn render_default(numeric: &str) -> Result<String> {
    use crate::render::{PngRenderer, QrRenderer};
    PngRenderer.render(numeric)
}

#[cfg(not(feature = "qr"))]
fn render_default(_: &str) -> Result<String> {
    Err(anyhow::anyhow!("no QR renderer configured"))
}
