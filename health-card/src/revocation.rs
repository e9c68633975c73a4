//! # Revocation
//!
//! A card is revoked when its issuer lists the card's revocation identifier
//! (rid) in the revocation list for the signing key. Cards that carry no
//! rid are identified by a digest of their FHIR bundle.
//!
//! Missing revocation data (no issuer, key, or list) means "not revoked".

use anyhow::Result;
use serde_json::Value;
use shc_core::ErrorCode;
use shc_core::codec::base64url_encode;
use shc_directory::Directory;

use crate::Context;
use crate::types::Payload;

/// Diagnostic label for revocation checks.
pub const LABEL: &str = "REVOCATION";

const DEFAULT_RID_BYTES: usize = 8;

/// The rid of a card without one: the first 8 bytes of the SHA-256 digest of
/// its compact-serialized FHIR bundle, base64url encoded.
///
/// # Errors
///
/// Returns an error if the bundle cannot be serialized.
pub fn default_rid(fhir_bundle: &Value) -> Result<String> {
    let json = serde_json::to_vec(fhir_bundle)?;
    let digest = shc_jose::digest(&json);
    Ok(base64url_encode(&digest[..DEFAULT_RID_BYTES]))
}

/// The rid identifying a card: the one it carries, or the default derived
/// from its bundle.
#[must_use]
pub fn card_rid(payload: &Payload) -> Option<String> {
    match payload.rid() {
        Some(rid) => Some(rid.to_string()),
        None => default_rid(&payload.vc.credential_subject.fhir_bundle).ok(),
    }
}

/// Check the decoded card in `ctx` against the revocation lists in
/// `directory`, recording a [`ErrorCode::Revoked`] error when revoked.
///
/// A listed rid revokes the card unless it carries a timestamp no earlier
/// than the card's `nbf`.
pub fn revoked(ctx: &mut Context, directory: &Directory) -> bool {
    ctx.log.set_label(LABEL);
    let (Some(header), Some(payload)) = (&ctx.jws.header, &ctx.jws.payload) else {
        ctx.log.debug("card is not decoded; skipping revocation check");
        return false;
    };
    let (Some(rid), Some(nbf)) = (card_rid(payload), payload.nbf_seconds()) else {
        ctx.log.debug("card has no rid or 'nbf'; skipping revocation check");
        return false;
    };

    let entry = match directory.find(&payload.iss, Some(&header.kid), Some(&rid)) {
        Ok(found) => found.rid,
        Err(miss) => {
            ctx.log.debug(format!("not revoked, {miss}"));
            return false;
        }
    };
    let Some(entry) = entry.filter(|entry| entry.revokes(nbf)) else {
        ctx.log.debug(format!("rid {rid} was revoked after the card was issued"));
        return false;
    };

    ctx.log.error(ErrorCode::Revoked, format!("card with rid {rid} is revoked ({entry})"));
    true
}

#[cfg(test)]
mod tests {
    use test_utils::fixtures;

    use super::*;

    #[test]
    fn fixture_default_rid() {
        let rid = default_rid(&fixtures::fhir_bundle()).expect("should hash");
        assert_eq!(rid, fixtures::RID);
    }

    #[test]
    fn carried_rid_wins() {
        let ctx = crate::decode(fixtures::NUMERIC, None, crate::Options::default());
        let mut payload = ctx.jws.payload.expect("should decode");
        assert_eq!(card_rid(&payload).as_deref(), Some(fixtures::RID));

        payload.vc.rid = Some("abcdefgh".to_string());
        assert_eq!(card_rid(&payload).as_deref(), Some("abcdefgh"));
    }
}
