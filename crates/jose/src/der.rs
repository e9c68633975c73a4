//! # DER Signatures
//!
//! Conversion between the raw 64-byte `r || s` ES256 signature carried in a
//! JWS and the ASN.1 DER `SEQUENCE { INTEGER r, INTEGER s }` form.

use anyhow::{Result, anyhow, bail};

const SEQUENCE: u8 = 0x30;
const INTEGER: u8 = 0x02;

/// Encode a raw `r || s` signature as DER.
///
/// Each half is trimmed of leading zero bytes (keeping at least one) and
/// gets a `0x00` prefix when its high bit is set.
#[must_use]
pub fn der_from_raw(raw: &[u8; 64]) -> Vec<u8> {
    let r = integer(&raw[..32]);
    let s = integer(&raw[32..]);

    let mut der = Vec::with_capacity(2 + r.len() + s.len());
    der.push(SEQUENCE);
    #[allow(clippy::cast_possible_truncation)]
    der.push((r.len() + s.len()) as u8);
    der.extend(r);
    der.extend(s);
    der
}

/// Decode a DER signature into raw `r || s`.
///
/// Each integer has at most one leading zero byte removed and is then
/// left-padded to 32 bytes.
///
/// # Errors
///
/// Returns an error if the input is not a DER sequence of two integers that
/// each fit in 32 bytes.
pub fn raw_from_der(der: &[u8]) -> Result<[u8; 64]> {
    let (content, rest) = tlv(SEQUENCE, der)?;
    if !rest.is_empty() {
        bail!("trailing bytes after signature sequence");
    }
    let (r, content) = tlv(INTEGER, content)?;
    let (s, content) = tlv(INTEGER, content)?;
    if !content.is_empty() {
        bail!("trailing bytes inside signature sequence");
    }

    let mut raw = [0u8; 64];
    raw[..32].copy_from_slice(&unsigned(r)?);
    raw[32..].copy_from_slice(&unsigned(s)?);
    Ok(raw)
}

fn integer(half: &[u8]) -> Vec<u8> {
    let start = half.iter().position(|&b| b != 0).unwrap_or(half.len() - 1);
    let trimmed = &half[start..];

    let mut encoded = Vec::with_capacity(trimmed.len() + 3);
    encoded.push(INTEGER);
    if trimmed[0] & 0x80 == 0 {
        #[allow(clippy::cast_possible_truncation)]
        encoded.push(trimmed.len() as u8);
    } else {
        #[allow(clippy::cast_possible_truncation)]
        encoded.push(trimmed.len() as u8 + 1);
        encoded.push(0x00);
    }
    encoded.extend_from_slice(trimmed);
    encoded
}

// Read one short- or long-form TLV, returning its content and the remainder.
fn tlv(tag: u8, bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let [actual, first, rest @ ..] = bytes else {
        bail!("truncated DER element");
    };
    if *actual != tag {
        bail!("expected DER tag {tag:#04x}, found {actual:#04x}");
    }

    let (len, rest) = match *first {
        len if len < 0x80 => (usize::from(len), rest),
        0x81 => {
            let [len, rest @ ..] = rest else {
                bail!("truncated DER length");
            };
            (usize::from(*len), rest)
        }
        other => bail!("unsupported DER length byte {other:#04x}"),
    };
    if rest.len() < len {
        bail!("DER element longer than input");
    }
    Ok(rest.split_at(len))
}

fn unsigned(integer: &[u8]) -> Result<[u8; 32]> {
    let value = match integer {
        [0x00, tail @ ..] if !tail.is_empty() => tail,
        _ => integer,
    };
    if value.len() > 32 {
        return Err(anyhow!("DER integer is {} bytes, expected at most 32", value.len()));
    }

    let mut padded = [0u8; 32];
    padded[32 - value.len()..].copy_from_slice(value);
    Ok(padded)
}
