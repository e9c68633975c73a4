//! JWS signature segment.

use shc_core::codec::{base64url_decode, base64url_encode};
use shc_core::{ErrorCode, Log};

/// Diagnostic label for this segment.
pub const LABEL: &str = "JWS.SIGNATURE";

/// Length of a raw ES256 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Decode a base64url signature segment to raw bytes.
///
/// A signature of the wrong length is kept, with a warning, and will fail
/// verification.
pub fn decode(segment: &str, log: &mut Log) -> Option<Vec<u8>> {
    log.set_label(LABEL);
    match base64url_decode(segment) {
        Ok(signature) => {
            validate(&signature, log);
            Some(signature)
        }
        Err(e) => {
            log.fatal(ErrorCode::SignatureFormatError, format!("failed to decode signature: {e}"));
            None
        }
    }
}

/// Warn unless the signature is 64 bytes.
pub fn validate(signature: &[u8], log: &mut Log) -> bool {
    log.set_label(LABEL);
    if signature.len() == SIGNATURE_LENGTH {
        return true;
    }
    log.warn(
        ErrorCode::SignatureFormatError,
        format!("signature is {} bytes, expected {SIGNATURE_LENGTH}", signature.len()),
    );
    false
}

/// Encode raw signature bytes as a base64url segment.
#[must_use]
pub fn encode(signature: &[u8]) -> String {
    base64url_encode(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_signature_warns() {
        let mut log = Log::default();
        let signature = decode(&encode(&[7; 63]), &mut log).expect("should decode");

        assert_eq!(signature.len(), 63);
        assert_eq!(log.warnings().count(), 1);
        assert!(!log.is_fatal());
    }

    #[test]
    fn not_base64url() {
        let mut log = Log::default();
        assert!(decode("a+b/", &mut log).is_none());
        assert!(log.has(ErrorCode::SignatureFormatError));
    }
}
