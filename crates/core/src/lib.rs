//! # Health Card Core
//!
//! Building blocks shared by the health card crates: the byte-level codec
//! (base64url, UTF-8, raw DEFLATE), the diagnostics [`Log`] every pipeline
//! stage records into, the crate-wide [`Error`], and the [`Fetcher`] seam
//! used to download issuer keys, revocation lists, and directory snapshots.

pub mod codec;
mod error;
mod fetch;
mod log;

use std::time::Duration;

pub use self::error::Error;
pub use self::fetch::{Fetcher, HttpFetcher};
pub use self::log::{Entry, ErrorCode, Level, Log};

/// Maximum time allowed for a single download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Location of the published VCI issuer directory snapshot.
pub const VCI_SNAPSHOT_URL: &str =
    "https://raw.githubusercontent.com/the-commons-project/vci-directory/main/logs/vci_snapshot.json";

/// Largest epoch value, in seconds, a revocation timestamp may carry.
pub const MAX_EPOCH_SECONDS: u64 = 8_640_000_000_000;
