//! Issuer identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shc_core::{ErrorCode, Log};
use url::Url;

/// A health card issuer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issuer {
    /// Issuer URL, matching the `iss` claim of its cards.
    pub iss: String,

    /// Display name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Public web site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// The issuer's preferred `iss` when this entry is an alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_iss: Option<String>,

    /// Any other members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issuer {
    /// Create an issuer identified only by its URL.
    #[must_use]
    pub fn new(iss: impl Into<String>) -> Self {
        Self { iss: iss.into(), ..Self::default() }
    }

    /// Overlay the members `other` sets onto this issuer.
    pub(crate) fn overlay(&mut self, other: Self) {
        if !other.name.is_empty() {
            self.name = other.name;
        }
        if other.website.is_some() {
            self.website = other.website;
        }
        if other.canonical_iss.is_some() {
            self.canonical_iss = other.canonical_iss;
        }
        self.extra.extend(other.extra);
    }
}

/// Validate an issuer entry, recording problems in `log`.
///
/// Returns `true` if no errors were recorded.
pub fn validate_issuer(issuer: &Issuer, log: &mut Log) -> bool {
    let before = log.error_count();

    if issuer.iss.is_empty() {
        log.error(ErrorCode::DirectoryIssuerMissingIss, "issuer is missing 'iss'");
    } else if Url::parse(&issuer.iss).is_err() {
        log.error(
            ErrorCode::DirectoryIssuerInvalidProperty,
            format!("issuer 'iss' '{}' is not a URL", issuer.iss),
        );
    } else if issuer.iss.ends_with('/') {
        log.warn(
            ErrorCode::DirectoryIssuerInvalidProperty,
            format!("issuer 'iss' '{}' should not end with '/'", issuer.iss),
        );
    }

    if let Some(website) = &issuer.website
        && Url::parse(website).is_err()
    {
        log.warn(
            ErrorCode::DirectoryIssuerInvalidProperty,
            format!("issuer 'website' '{website}' is not a URL"),
        );
    }
    if let Some(canonical) = &issuer.canonical_iss
        && Url::parse(canonical).is_err()
    {
        log.error(
            ErrorCode::DirectoryIssuerInvalidProperty,
            format!("issuer 'canonical_iss' '{canonical}' is not a URL"),
        );
    }
    for name in issuer.extra.keys() {
        let message = format!("unexpected issuer property '{name}'");
        log.warn(ErrorCode::DirectoryIssuerInvalidProperty, message);
    }

    log.error_count() == before
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn valid_issuer() {
        let issuer: Issuer = serde_json::from_value(json!({
            "iss": "https://spec.smarthealth.cards/examples/issuer",
            "name": "Example Issuer",
            "website": "https://spec.smarthealth.cards"
        }))
        .expect("should deserialize");

        let mut log = Log::new("ISSUER");
        assert!(validate_issuer(&issuer, &mut log));
        assert!(log.is_empty());
    }

    #[test]
    fn missing_iss() {
        let mut log = Log::new("ISSUER");
        assert!(!validate_issuer(&Issuer::default(), &mut log));
        assert!(log.has(ErrorCode::DirectoryIssuerMissingIss));
    }

    #[test]
    fn invalid_iss() {
        let mut log = Log::new("ISSUER");
        assert!(!validate_issuer(&Issuer::new("not a url"), &mut log));
        assert!(log.has(ErrorCode::DirectoryIssuerInvalidProperty));
    }

    #[test]
    fn trailing_slash_warns() {
        let mut log = Log::new("ISSUER");
        assert!(validate_issuer(&Issuer::new("https://example.com/issuer/"), &mut log));
        assert_eq!(log.warnings().count(), 1);
    }

    #[test]
    fn canonical_iss_wire_name() {
        let issuer: Issuer = serde_json::from_value(json!({
            "iss": "https://example.com/alias",
            "canonical_iss": "https://example.com/issuer"
        }))
        .expect("should deserialize");
        assert_eq!(issuer.canonical_iss.as_deref(), Some("https://example.com/issuer"));
        assert!(issuer.extra.is_empty());
    }
}
