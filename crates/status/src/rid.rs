//! Revocation identifiers.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::Utc;
use shc_core::{ErrorCode, Log, MAX_EPOCH_SECONDS, codec};

/// Maximum length of the identifier part of a rid.
pub const MAX_RID_LENGTH: usize = 24;

/// A parsed revocation list entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rid {
    /// The revocation identifier.
    pub id: String,

    /// Epoch seconds at which the revocation was recorded. Cards with this id
    /// issued after it are revoked; `None` revokes every card with this id.
    pub timestamp: Option<u64>,
}

impl Rid {
    /// Sort key used when two lists disagree on the same id: an entry with no
    /// timestamp outranks any timestamp.
    #[must_use]
    pub fn ordering(&self) -> u64 {
        self.timestamp.unwrap_or(u64::MAX)
    }

    /// Returns `true` if a card issued at `nbf` (epoch seconds) is revoked by
    /// this entry.
    #[must_use]
    pub fn revokes(&self, nbf: u64) -> bool {
        self.timestamp.is_none_or(|timestamp| timestamp < nbf)
    }
}

impl FromStr for Rid {
    type Err = std::convert::Infallible;

    // An unreadable timestamp revokes unconditionally.
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let (id, timestamp) = match entry.split_once('.') {
            Some((id, seconds)) => (id, seconds.parse().ok()),
            None => (entry, None),
        };
        Ok(Self { id: id.to_string(), timestamp })
    }
}

impl From<&str> for Rid {
    fn from(entry: &str) -> Self {
        let Ok(rid) = Self::from_str(entry);
        rid
    }
}

impl Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp {
            Some(seconds) => write!(f, "{}.{seconds}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// Validate a rid entry, recording problems in `log`.
///
/// Returns `true` if no errors were recorded. A timestamp in the future is
/// only a warning.
pub fn validate_rid(entry: &str, log: &mut Log) -> bool {
    let before = log.error_count();

    let mut parts = entry.split('.');
    let id = parts.next().unwrap_or_default();
    let seconds = parts.next();
    if parts.next().is_some() {
        log.error(ErrorCode::RevocationError, format!("rid '{entry}' has more than one '.'"));
        return false;
    }

    if !codec::is_base64url(id) {
        log.error(ErrorCode::RevocationError, format!("rid '{id}' is not base64url"));
    }
    if id.len() > MAX_RID_LENGTH {
        log.error(
            ErrorCode::RevocationError,
            format!("rid '{id}' is longer than {MAX_RID_LENGTH} characters"),
        );
    }

    if let Some(seconds) = seconds {
        match seconds.parse::<u64>() {
            Ok(seconds) if seconds > MAX_EPOCH_SECONDS => log.error(
                ErrorCode::RevocationError,
                format!("rid '{entry}' timestamp is beyond the maximum date"),
            ),
            Ok(seconds) if i64::try_from(seconds).is_ok_and(|s| s > Utc::now().timestamp()) => {
                log.warn(ErrorCode::NotYetValid, format!("rid '{entry}' timestamp is in the future"));
            }
            Ok(_) => {}
            Err(_) => log.error(
                ErrorCode::RevocationError,
                format!("rid '{entry}' timestamp is not an integer"),
            ),
        }
    }

    log.error_count() == before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_forms() {
        let rid = Rid::from("DQVFHWiCmGs");
        assert_eq!(rid, Rid { id: "DQVFHWiCmGs".to_string(), timestamp: None });
        assert_eq!(rid.ordering(), u64::MAX);

        let rid = Rid::from("DQVFHWiCmGs.1609459200");
        assert_eq!(rid.timestamp, Some(1_609_459_200));
        assert_eq!(rid.to_string(), "DQVFHWiCmGs.1609459200");
    }

    #[test]
    fn revocation_boundary() {
        let rid = Rid::from("DQVFHWiCmGs.1000");
        assert!(rid.revokes(1010));
        assert!(!rid.revokes(1000));
        assert!(!rid.revokes(999));
        assert!(Rid::from("DQVFHWiCmGs").revokes(u64::MAX));
    }

    #[test]
    fn valid_rids() {
        let mut log = Log::new("CRL");
        assert!(validate_rid("DQVFHWiCmGs", &mut log));
        assert!(validate_rid("DQVFHWiCmGs.1609459200", &mut log));
        assert!(log.is_empty());
    }

    #[test]
    fn invalid_rids() {
        for entry in ["a.1.2", "not base64", "DQVFHWiCmGsDQVFHWiCmGsDQV", "DQVFHWiCmGs.soon", "DQVFHWiCmGs.9640000000000"] {
            let mut log = Log::new("CRL");
            assert!(!validate_rid(entry, &mut log), "{entry} should be invalid");
            assert!(log.has(ErrorCode::RevocationError));
        }
    }

    #[test]
    fn future_timestamp_warns() {
        let future = Utc::now().timestamp() + 86_400;
        let mut log = Log::new("CRL");
        assert!(validate_rid(&format!("DQVFHWiCmGs.{future}"), &mut log));
        assert!(log.has(ErrorCode::NotYetValid));
    }
}
