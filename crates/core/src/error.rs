//! # Errors
//!
//! Errors returned by operations that cannot report through a [`Log`].
//!
//! [`Log`]: crate::Log

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health card error codes.
#[derive(Error, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "error", content = "error_description")]
pub enum Error {
    /// A caller-supplied argument is missing, malformed, or of an
    /// unrecognized shape.
    #[error(r#"{{"error": "parameter_invalid", "error_description": "{0}"}}"#)]
    ParameterInvalid(String),

    /// A cryptographic operation could not be completed, usually because the
    /// key is unusable.
    #[error(r#"{{"error": "crypto_failure", "error_description": "{0}"}}"#)]
    CryptoFailure(String),

    /// A remote document could not be retrieved.
    #[error(r#"{{"error": "download_failed", "error_description": "{0}"}}"#)]
    DownloadFailed(String),

    /// An unexpected condition prevented the operation from completing.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Self>() {
            Some(Self::ParameterInvalid(e)) => Self::ParameterInvalid(format!("{err}: {e}")),
            Some(Self::CryptoFailure(e)) => Self::CryptoFailure(format!("{err}: {e}")),
            Some(Self::DownloadFailed(e)) => Self::DownloadFailed(format!("{err}: {e}")),
            Some(Self::ServerError(e)) => Self::ServerError(format!("{err}: {e}")),
            None => {
                let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
                let stack = stack.trim_start_matches(" -> ").to_string();
                Self::ServerError(stack)
            }
        }
    }
}

/// Construct an `Error::ParameterInvalid` error from a string or existing
/// error value.
#[macro_export]
macro_rules! invalid {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::ParameterInvalid(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::ParameterInvalid(format!($err))
    };
}
