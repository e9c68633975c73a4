//! # Codec
//!
//! Byte transforms used by every stage of the card pipeline. Base64url is
//! always unpadded and DEFLATE is raw (no zlib or gzip framing).

use std::io::{Read, Write};

use anyhow::{Context, Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

/// Compression level used when none is configured.
pub const DEFAULT_DEFLATE_LEVEL: u32 = 6;

/// Encode bytes as unpadded base64url.
#[must_use]
pub fn base64url_encode(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

/// Decode an unpadded base64url string.
///
/// # Errors
///
/// Returns an error if the input contains characters outside the base64url
/// alphabet or has an impossible length.
pub fn base64url_decode(encoded: &str) -> Result<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(encoded).map_err(|e| anyhow!("invalid base64url: {e}"))
}

/// Returns `true` when `value` is at least two characters drawn only from
/// the base64url alphabet.
#[must_use]
pub fn is_base64url(value: &str) -> bool {
    value.len() >= 2
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Interpret bytes as UTF-8 text.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8.
pub fn bytes_to_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).context("invalid UTF-8")
}

/// Raw-DEFLATE compress `bytes` at `level` (0-9).
///
/// # Errors
///
/// Returns an error if the level is out of range or compression fails.
pub fn deflate(bytes: &[u8], level: u32) -> Result<Vec<u8>> {
    if level > 9 {
        return Err(anyhow!("deflate level {level} is outside 0-9"));
    }
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(bytes)?;
    encoder.finish().context("issue finishing deflate stream")
}

/// Decompress a raw-DEFLATE stream.
///
/// # Errors
///
/// Returns an error if the input is not a valid raw-DEFLATE stream.
pub fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(bytes);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated).context("invalid deflate stream")?;
    Ok(inflated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_alphabet() {
        assert_eq!(base64url_encode(&[0xfb, 0xff]), "-_8");
        let decoded = base64url_decode("-_8").expect("should decode");
        assert_eq!(decoded, vec![0xfb, 0xff]);
    }

    #[test]
    fn padded_input_rejected() {
        base64url_decode("-_8=").expect_err("should reject padding");
        base64url_decode("a+b/").expect_err("should reject standard alphabet");
    }

    #[test]
    fn base64url_check() {
        assert!(is_base64url("abc-_09"));
        assert!(!is_base64url("a"));
        assert!(!is_base64url("abc="));
        assert!(!is_base64url("ab cd"));
    }

    #[test]
    fn deflate_inflate() {
        let text = r#"{"iss":"https://example.com/issuer","nbf":1609459200}"#;
        let deflated = deflate(text.as_bytes(), DEFAULT_DEFLATE_LEVEL).expect("should deflate");
        let inflated = inflate(&deflated).expect("should inflate");
        assert_eq!(bytes_to_text(inflated).expect("should be utf-8"), text);
    }

    #[test]
    fn zlib_framing_rejected() {
        // zlib header (0x78 0x9c) followed by an empty stored block
        let framed = [0x78, 0x9c, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];
        inflate(&framed).expect_err("should not inflate zlib framing");
    }

    #[test]
    fn level_out_of_range() {
        deflate(b"abc", 10).expect_err("should reject level 10");
    }

    #[test]
    fn invalid_utf8() {
        bytes_to_text(vec![0xc3, 0x28]).expect_err("should reject invalid utf-8");
    }
}
