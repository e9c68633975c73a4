//! Revocation list lookups for verifiers.

use shc_core::{ErrorCode, Log};
use shc_jose::Jwk;

use crate::{Crl, Rid};

impl Crl {
    /// Find the entry for `rid`, ignoring any timestamp suffix on either side.
    ///
    /// When the id is listed more than once the entry with the latest
    /// [`Rid::ordering`] is returned.
    #[must_use]
    pub fn find(&self, rid: &str) -> Option<Rid> {
        let id = Rid::from(rid).id;
        self.rids
            .iter()
            .map(|entry| Rid::from(entry.as_str()))
            .filter(|entry| entry.id == id)
            .max_by_key(Rid::ordering)
    }

    /// Returns `true` if a card with `rid` issued at `nbf` (epoch seconds) is
    /// revoked by this list.
    #[must_use]
    pub fn revokes(&self, rid: &str, nbf: u64) -> bool {
        self.find(rid).is_some_and(|entry| entry.revokes(nbf))
    }

    /// Check that this list belongs to `key` and is the version the key
    /// advertises, recording mismatches in `log`.
    pub fn verify(&self, key: &Jwk, log: &mut Log) -> bool {
        if self.kid != key.kid {
            log.error(
                ErrorCode::CrlInvalidProperty,
                format!("CRL 'kid' {} does not match key {}", self.kid, key.kid),
            );
            return false;
        }
        match key.crl_version {
            Some(version) if version == self.ctr => true,
            Some(version) => {
                log.error(
                    ErrorCode::CrlInvalidProperty,
                    format!("CRL 'ctr' {} does not match key 'crlVersion' {version}", self.ctr),
                );
                false
            }
            None => {
                log.error(ErrorCode::CrlInvalidProperty, format!("key {} has no 'crlVersion'", key.kid));
                false
            }
        }
    }
}
