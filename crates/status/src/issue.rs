//! Revocation list maintenance for issuers.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use shc_core::codec;

use crate::{Crl, MAX_RID_LENGTH, RID_METHOD, Rid};

impl Crl {
    /// Create an empty revocation list for the key identified by `kid`.
    #[must_use]
    pub fn new(kid: impl Into<String>) -> Self {
        Self { kid: kid.into(), method: RID_METHOD.to_string(), ctr: 1, ..Self::default() }
    }

    /// Revoke `rid`, optionally only for cards issued after `at`, and bump
    /// the list counter. Returns the new counter, which the issuer should
    /// publish as the key's `crlVersion`.
    ///
    /// An existing entry for the same id is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if `rid` is not a valid revocation identifier.
    pub fn revoke(&mut self, rid: &str, at: Option<DateTime<Utc>>) -> Result<u64> {
        if !codec::is_base64url(rid) || rid.len() > MAX_RID_LENGTH {
            bail!("'{rid}' is not a valid revocation identifier");
        }
        let timestamp = match at {
            Some(at) => Some(u64::try_from(at.timestamp())?),
            None => None,
        };

        self.rids.retain(|entry| Rid::from(entry.as_str()).id != rid);
        self.rids.push(Rid { id: rid.to_string(), timestamp }.to_string());
        self.ctr += 1;

        tracing::debug!(kid = %self.kid, rid, ctr = self.ctr, "revoked");
        Ok(self.ctr)
    }

    /// Fold another copy of this key's list into this one.
    ///
    /// The higher `ctr` wins outright. On a tie the rids are unioned: each id
    /// is kept once, with the entry of greatest [`Rid::ordering`].
    pub fn absorb(&mut self, other: Self) {
        if other.ctr > self.ctr {
            *self = other;
            return;
        }
        if other.ctr < self.ctr {
            return;
        }

        let mut merged: Vec<Rid> = Vec::with_capacity(self.rids.len() + other.rids.len());
        for entry in self.rids.iter().chain(&other.rids) {
            let rid = Rid::from(entry.as_str());
            match merged.iter_mut().find(|kept| kept.id == rid.id) {
                Some(kept) if rid.ordering() > kept.ordering() => *kept = rid,
                Some(_) => {}
                None => merged.push(rid),
            }
        }
        self.rids = merged.iter().map(ToString::to_string).collect();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn new_list() {
        let crl = Crl::new("kid1");
        assert_eq!(crl.method, "rid");
        assert_eq!(crl.ctr, 1);
        assert!(crl.rids.is_empty());
    }

    #[test]
    fn revoke_bumps_counter() {
        let mut crl = Crl::new("kid1");
        let at = Utc.timestamp_opt(1_609_459_200, 0).single();

        assert_eq!(crl.revoke("DQVFHWiCmGs", None).expect("should revoke"), 2);
        assert_eq!(crl.revoke("DQVFHWiCmGs", at).expect("should revoke"), 3);
        assert_eq!(crl.rids, vec!["DQVFHWiCmGs.1609459200".to_string()]);

        crl.revoke("not a rid", None).expect_err("should reject invalid rid");
    }

    #[test]
    fn higher_counter_wins() {
        let mut crl = Crl { rids: vec!["aaaa".to_string()], ..Crl::new("kid1") };
        let newer = Crl { ctr: 2, rids: vec!["bbbb".to_string()], ..Crl::new("kid1") };

        crl.absorb(newer.clone());
        assert_eq!(crl, newer);

        crl.absorb(Crl { rids: vec!["cccc".to_string()], ..Crl::new("kid1") });
        assert_eq!(crl, newer);
    }

    #[test]
    fn tie_unions_rids() {
        let mut crl = Crl { rids: vec!["aaaa.100".to_string(), "bbbb".to_string()], ..Crl::new("kid1") };
        let other = Crl {
            rids: vec!["aaaa.200".to_string(), "bbbb.50".to_string(), "cccc".to_string()],
            ..Crl::new("kid1")
        };

        crl.absorb(other);
        assert_eq!(crl.rids, vec!["aaaa.200", "bbbb", "cccc"]);
    }

    #[test]
    fn absorb_is_idempotent() {
        let crl = Crl { rids: vec!["aaaa.100".to_string(), "bbbb".to_string()], ..Crl::new("kid1") };
        let mut merged = crl.clone();
        merged.absorb(crl.clone());
        merged.absorb(crl.clone());
        assert_eq!(merged, crl);
    }
}
