//! # Issuer Directory
//!
//! A directory is a collection of trusted issuers, each with the keys it
//! signs cards with and, optionally, the revocation lists it publishes for
//! those keys.
//!
//! Directories can be loaded from a published snapshot (such as the VCI
//! directory), from one or more directory documents, or built on demand by
//! downloading `/.well-known/jwks.json` (and any revocation lists) from a
//! list of issuer URLs. Entries for the same issuer are merged, and the
//! result is validated, with diagnostics kept on the directory.

mod directory;
mod download;
mod info;
mod issuer;

use serde_json::Value;
use shc_jose::Checks;

pub use self::directory::{Directory, Found, NotFound};
pub use self::download::{CHUNKS, download};
pub use self::info::IssuerInfo;
pub use self::issuer::{Issuer, validate_issuer};

/// Where to load a directory from.
#[derive(Clone, Debug)]
pub enum Source {
    /// The published VCI directory snapshot.
    Vci,

    /// A directory document at a URL.
    Url(String),

    /// Issuer URLs to download keys and revocation lists from.
    Issuers(Vec<String>),

    /// An in-memory directory document, list of issuer entries, or list of
    /// issuer URLs.
    Document(Value),

    /// Several in-memory documents to merge.
    Documents(Vec<Value>),
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("vci") { Self::Vci } else { Self::Url(value.to_string()) }
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Self::Document(value)
    }
}

impl From<Vec<String>> for Source {
    fn from(issuers: Vec<String>) -> Self {
        Self::Issuers(issuers)
    }
}

/// Validation settings applied to directory contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    /// Key checks.
    pub checks: Checks,

    /// Permit a revocation list to repeat a rid.
    pub allow_duplicates: bool,
}
