//! Revocation list validation.

use std::collections::HashSet;

use shc_core::{ErrorCode, Log, codec};
use shc_jose::Jwk;

use crate::{Crl, RID_METHOD, Rid, validate_rid};

/// Validate an issuer's revocation lists against its key set, recording
/// problems in `log`.
///
/// Returns `true` if no errors were recorded.
pub fn validate_crls(crls: &[Crl], keys: &[Jwk], allow_duplicates: bool, log: &mut Log) -> bool {
    let before = log.error_count();
    let mut versions = HashSet::new();

    for crl in crls {
        if !codec::is_base64url(&crl.kid) {
            let message = format!("CRL 'kid' '{}' is not base64url", crl.kid);
            log.error(ErrorCode::CrlInvalidProperty, message);
        } else if !keys.iter().any(|key| key.kid == crl.kid) {
            log.warn(
                ErrorCode::CrlNoMatchingKeysKid,
                format!("CRL 'kid' {} does not match any issuer key", crl.kid),
            );
        }

        if crl.method != RID_METHOD {
            log.warn(
                ErrorCode::CrlInvalidProperty,
                format!("CRL 'method' should be '{RID_METHOD}', found '{}'", crl.method),
            );
        }
        if crl.ctr == 0 {
            log.error(ErrorCode::CrlInvalidProperty, "CRL 'ctr' must be a positive integer");
        }
        for name in crl.extra.keys() {
            log.warn(ErrorCode::CrlInvalidProperty, format!("unexpected CRL property '{name}'"));
        }

        let mut seen = HashSet::new();
        for entry in &crl.rids {
            validate_rid(entry, log);
            let rid = Rid::from(entry.as_str());
            if !seen.insert(rid.id.clone()) && !allow_duplicates {
                log.error(
                    ErrorCode::CrlRidDuplicate,
                    format!("CRL {} lists rid '{}' more than once", crl.kid, rid.id),
                );
            }
        }

        if !versions.insert((crl.kid.as_str(), crl.ctr)) {
            log.error(
                ErrorCode::CrlDuplicateEntries,
                format!("more than one CRL with 'kid' {} and 'ctr' {}", crl.kid, crl.ctr),
            );
        }
    }

    log.error_count() == before
}
