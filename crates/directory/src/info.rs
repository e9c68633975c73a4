//! Issuer entries: an issuer with its keys and revocation lists.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use shc_core::{ErrorCode, Log};
use shc_jose::{Jwk, validate_keys};
use shc_status::{Crl, validate_crls};

use crate::{Issuer, Policy, validate_issuer};

const LAST_RETRIEVED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A directory entry for one issuer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IssuerInfo {
    /// The issuer.
    pub issuer: Issuer,

    /// Public signing keys.
    pub keys: Vec<Jwk>,

    /// Revocation lists, one per key that publishes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crls: Option<Vec<Crl>>,

    /// When the keys were last downloaded, as `YYYY-MM-DDTHH:MM:SSZ`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_retrieved: Option<String>,
}

impl IssuerInfo {
    /// Key with `kid`, if the issuer has one.
    #[must_use]
    pub fn key(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    /// Revocation list for `kid`, if the issuer publishes one.
    #[must_use]
    pub fn crl(&self, kid: &str) -> Option<&Crl> {
        self.crls.as_deref().and_then(|crls| crls.iter().find(|crl| crl.kid == kid))
    }

    /// Fold another entry for the same issuer into this one.
    ///
    /// Issuer members set on `other` replace ours, the later `lastRetrieved`
    /// is kept, and keys and revocation lists are concatenated and then
    /// deduplicated by `kid`.
    pub fn absorb(&mut self, other: Self) {
        self.issuer.overlay(other.issuer);
        self.last_retrieved = self.last_retrieved.take().max(other.last_retrieved);

        self.keys.extend(other.keys);
        self.crls = match (self.crls.take(), other.crls) {
            (None, None) => None,
            (mine, theirs) => {
                Some(mine.into_iter().flatten().chain(theirs.into_iter().flatten()).collect())
            }
        };
        self.scrub();
    }

    /// Keep one key per `kid`, preferring the higher `crlVersion` (the later
    /// entry on a tie), and one revocation list per `kid`, resolved by
    /// [`Crl::absorb`].
    pub fn scrub(&mut self) {
        let mut keys: Vec<Jwk> = Vec::with_capacity(self.keys.len());
        for key in self.keys.drain(..) {
            let version = key.crl_version.unwrap_or_default();
            match keys.iter_mut().find(|kept| kept.kid == key.kid) {
                Some(kept) if version >= kept.crl_version.unwrap_or_default() => *kept = key,
                Some(_) => {}
                None => keys.push(key),
            }
        }
        self.keys = keys;

        if let Some(crls) = self.crls.take() {
            let mut merged: Vec<Crl> = Vec::with_capacity(crls.len());
            for crl in crls {
                match merged.iter_mut().find(|kept| kept.kid == crl.kid) {
                    Some(kept) => kept.absorb(crl),
                    None => merged.push(crl),
                }
            }
            self.crls = Some(merged);
        }
    }

    /// Validate the entry, recording problems in `log`. Key diagnostics are
    /// labelled `KEY:<iss>` and revocation list diagnostics `CRL:<iss>`.
    ///
    /// Returns `true` if no errors were recorded.
    pub fn validate(&self, policy: &Policy, log: &mut Log) -> bool {
        let before = log.error_count();
        let label = log.label().to_string();
        let iss = &self.issuer.iss;

        validate_issuer(&self.issuer, log);
        if let Some(last_retrieved) = &self.last_retrieved
            && NaiveDateTime::parse_from_str(last_retrieved, LAST_RETRIEVED_FORMAT).is_err()
        {
            log.warn(
                ErrorCode::DirectoryIssuerInvalidProperty,
                format!("'lastRetrieved' '{last_retrieved}' is not YYYY-MM-DDTHH:MM:SSZ"),
            );
        }

        log.set_label(format!("KEY:{iss}"));
        if self.keys.is_empty() {
            log.error(ErrorCode::DirectoryIssuerInvalidProperty, format!("issuer {iss} has no keys"));
        }
        validate_keys(&self.keys, false, &policy.checks, log);

        if let Some(crls) = &self.crls {
            log.set_label(format!("CRL:{iss}"));
            validate_crls(crls, &self.keys, policy.allow_duplicates, log);

            // a list must be the version its key advertises
            for crl in crls {
                if let Some(key) = self.key(&crl.kid).filter(|key| key.crl_version.is_some()) {
                    crl.verify(key, log);
                }
            }
        }

        log.set_label(label);
        log.error_count() == before
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_utils::fixtures;

    use super::*;

    fn info() -> IssuerInfo {
        serde_json::from_value(json!({
            "issuer": {"iss": fixtures::ISSUER, "name": "Example"},
            "keys": [fixtures::public_jwk()],
            "lastRetrieved": "2021-01-01T00:00:00Z"
        }))
        .expect("should deserialize")
    }

    #[test]
    fn valid_entry() {
        let mut log = Log::new("DIRECTORY");
        assert!(info().validate(&Policy::default(), &mut log));
        assert!(log.is_empty());
    }

    #[test]
    fn key_diagnostics_labelled() {
        let mut info = info();
        info.keys[0].kid = "wrongKid".to_string();

        let mut log = Log::new("DIRECTORY");
        assert!(!info.validate(&Policy::default(), &mut log));
        let entry = log.errors().next().expect("should record an error");
        assert_eq!(entry.code, ErrorCode::JwkIncorrectKid);
        assert_eq!(entry.label, format!("KEY:{}", fixtures::ISSUER));
        assert_eq!(log.label(), "DIRECTORY");
    }

    #[test]
    fn bad_last_retrieved() {
        let mut info = info();
        info.last_retrieved = Some("yesterday".to_string());

        let mut log = Log::new("DIRECTORY");
        assert!(info.validate(&Policy::default(), &mut log));
        assert_eq!(log.warnings().count(), 1);
    }

    #[test]
    fn stale_crl_version() {
        let mut info = info();
        info.keys[0].crl_version = Some(2);
        info.crls = Some(vec![Crl::new(fixtures::KID)]);

        let mut log = Log::new("DIRECTORY");
        assert!(!info.validate(&Policy::default(), &mut log));
        assert!(log.has(ErrorCode::CrlInvalidProperty));
    }

    #[test]
    fn absorb_prefers_newer_key() {
        let mut older = info();
        older.keys[0].crl_version = Some(1);
        let mut newer = info();
        newer.issuer.name = String::new();
        newer.keys[0].crl_version = Some(2);
        newer.last_retrieved = Some("2022-01-01T00:00:00Z".to_string());

        older.absorb(newer);
        assert_eq!(older.keys.len(), 1);
        assert_eq!(older.keys[0].crl_version, Some(2));
        assert_eq!(older.issuer.name, "Example");
        assert_eq!(older.last_retrieved.as_deref(), Some("2022-01-01T00:00:00Z"));
    }

    #[test]
    fn absorb_is_idempotent() {
        let mut info = info();
        info.crls = Some(vec![Crl { rids: vec!["aaaa".to_string()], ..Crl::new(fixtures::KID) }]);

        let mut merged = info.clone();
        for _ in 0..3 {
            merged.absorb(info.clone());
        }
        assert_eq!(merged, info);
    }
}
