//! # QR Images
//!
//! Reading and producing QR images is delegated to collaborators so the
//! pipeline does not depend on an image decoder. [`PngRenderer`] is provided
//! when the `qr` feature is enabled.

use std::fmt::Debug;

use anyhow::Result;

/// Reads the text content of a QR image.
pub trait QrScanner: Debug + Send + Sync {
    /// Return the text encoded in `image`, a `data:image/...;base64,` URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or holds no QR code.
    fn scan(&self, image: &str) -> Result<String>;
}

/// Produces a QR image from numeric card content.
pub trait QrRenderer: Debug + Send + Sync {
    /// Render `numeric` as a `data:image/...;base64,` URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the content does not fit in a QR code or the image
    /// cannot be encoded.
    fn render(&self, numeric: &str) -> Result<String>;
}

#[cfg(feature = "qr")]
pub use self::png::PngRenderer;

#[cfg(feature = "qr")]
mod png {
    use std::io::Cursor;

    use anyhow::{Context as _, Result};
    use base64ct::{Base64, Encoding};
    use qrcode::{EcLevel, QrCode};

    use super::QrRenderer;

    /// Renders PNG QR images at error correction level L, letting the
    /// encoder split the `shc:/` prefix and digits into byte and numeric
    /// segments.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct PngRenderer;

    impl QrRenderer for PngRenderer {
        fn render(&self, numeric: &str) -> Result<String> {
            let qr_code = QrCode::with_error_correction_level(numeric.as_bytes(), EcLevel::L)
                .context("failed to create QR code")?;

            // write image to buffer
            let img_buf = qr_code.render::<image::Luma<u8>>().build();
            let mut buffer: Vec<u8> = Vec::new();
            let mut writer = Cursor::new(&mut buffer);
            img_buf
                .write_to(&mut writer, image::ImageFormat::Png)
                .context("failed to create QR code")?;

            // base64 encode image
            Ok(format!("data:image/png;base64,{}", Base64::encode_string(&buffer)))
        }
    }

}
