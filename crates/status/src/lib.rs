//! # Revocation Lists
//!
//! Support for issuer-published card revocation lists (CRLs).
//!
//! An issuer revokes cards by publishing, per signing key, a list of
//! revocation identifiers (rids). A rid is a short base64url identifier for a
//! card, optionally suffixed with `.<seconds>`: when present, only cards
//! issued after that time (`nbf` later than the timestamp) are revoked. Each
//! list carries a counter (`ctr`) that the issuer bumps on every change and
//! mirrors in the signing key's `crlVersion`.

mod issue;
mod rid;
mod validate;
mod verify;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use self::rid::{MAX_RID_LENGTH, Rid, validate_rid};
pub use self::validate::validate_crls;

/// The only revocation method currently defined.
pub const RID_METHOD: &str = "rid";

/// A revocation list published for one issuer key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Crl {
    /// `kid` of the key whose cards this list revokes.
    pub kid: String,

    /// Revocation method. Always `rid`.
    pub method: String,

    /// Counter bumped by the issuer whenever the list changes.
    pub ctr: u64,

    /// Revoked rids, each optionally suffixed with `.<seconds>`.
    pub rids: Vec<String>,

    /// Any other members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
