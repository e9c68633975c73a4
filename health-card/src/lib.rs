//! An API for decoding, validating, issuing, and verifying
//! [SMART Health Cards](https://spec.smarthealth.cards).
//!
//! A health card is an ES256-signed, DEFLATE-compressed JWS carrying a FHIR
//! bundle. It is exchanged as a QR image, the numeric `shc:/` content of that
//! image, or a compact JWS. The [`pipeline`] converts between these forms,
//! recording diagnostics in a [`Log`] as it goes. [`verify`] combines the
//! pipeline with signature, expiry, and revocation checks against a
//! [`Directory`](directory::Directory) of trusted issuers, and [`CardBuilder`]
//! issues new cards.
//!
//! # Feature Flags
//!
//! The default feature is `qr`:
//!
//! * `qr` - Enables PNG rendering of QR images.

pub mod pipeline;
pub mod render;
pub mod revocation;

mod context;
mod issue;
mod options;
mod signature;
mod types;
mod verify;

pub use shc_core::{Entry, Error, ErrorCode, Fetcher, HttpFetcher, Level, Log};

pub use self::context::{Context, SignatureInfo};
pub use self::issue::CardBuilder;
pub use self::options::Options;
pub use self::pipeline::{decode, encode};
pub use self::signature::{Trust, sign, verify as verify_signature};
pub use self::types::*;
pub use self::verify::{Reason, Verdict, verify};

/// Re-export issuer directory types and functions
pub mod directory {
    pub use shc_directory::*;
}

/// Re-export key and signature types and functions
pub mod jose {
    pub use shc_jose::*;
}

/// Re-export revocation list types and functions
pub mod status {
    pub use shc_status::*;
}
