//! # Diagnostics
//!
//! Every validation and decoding step records what it found into a [`Log`]
//! rather than failing fast. Entries carry a stable [`ErrorCode`], a
//! severity [`Level`], the label of the stage that produced them, and a
//! `fatal` flag. A fatal entry stops further chained processing.
//!
//! Entries are mirrored to `tracing` as they are recorded.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Trace-level detail.
    Debug,

    /// Informational.
    #[default]
    Info,

    /// Something unexpected that does not invalidate the artifact.
    Warning,

    /// The artifact is invalid.
    Error,
}

/// Stable diagnostic codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Informational entry with no failure attached.
    None,

    /// A caller-supplied argument was unusable.
    ParameterInvalid,

    /// The QR image could not be read.
    QrDecodeError,

    /// The numeric `shc:/` form is malformed.
    ShcFormatError,

    /// The compact JWS is malformed.
    JwsCompactFormatError,

    /// The JWS header could not be decoded.
    JwsHeaderDecodeFail,

    /// The JWS header decoded but has invalid content.
    JwsHeaderError,

    /// The JWS payload could not be decoded.
    JwsPayloadDecodeError,

    /// The JWS payload decoded but has invalid content.
    JwsPayloadError,

    /// The signature segment is malformed.
    SignatureFormatError,

    /// The signature did not verify.
    SignatureInvalid,

    /// A JWK property is missing or has the wrong value.
    JwkInvalidProperty,

    /// The JWK `kid` does not match its computed thumbprint.
    JwkIncorrectKid,

    /// The JWK carries a property outside the expected set.
    JwkUnexpectedProperty,

    /// The key was found in a supplied key list without directory metadata.
    KeysOnlyMatch,

    /// A lookup needed a directory but none was supplied.
    DirectoryMissing,

    /// The directory document does not have the expected shape.
    DirectorySchemaError,

    /// The directory document has a problem in one of its own fields.
    DirectoryError,

    /// No issuer entry matched.
    DirectoryIssuerNotFound,

    /// The issuer has no key with the requested `kid`.
    DirectoryKeyNotFound,

    /// The issuer has no revocation list for the requested `kid`.
    DirectoryCrlNotFound,

    /// The revocation list does not contain the requested rid.
    DirectoryRidNotFound,

    /// An issuer entry has no usable `iss`.
    DirectoryIssuerMissingIss,

    /// An issuer entry has an invalid property.
    DirectoryIssuerInvalidProperty,

    /// The same `iss` appears more than once.
    DirectoryIssuerDuplicate,

    /// A download failed or returned an unusable document.
    DownloadFailed,

    /// A revocation list property is missing or has the wrong value.
    CrlInvalidProperty,

    /// Two revocation lists share the same `kid` and `ctr`.
    CrlDuplicateEntries,

    /// A revocation list repeats a rid.
    CrlRidDuplicate,

    /// A revocation list's `kid` matches none of the issuer's keys.
    CrlNoMatchingKeysKid,

    /// A revocation id is malformed.
    RevocationError,

    /// The card has been revoked.
    Revoked,

    /// The card has expired.
    Expired,

    /// A timestamp lies in the future.
    NotYetValid,

    /// A cryptographic primitive failed.
    CryptoFailure,

    /// The embedded FHIR bundle is unusable.
    FhirValidationError,

    /// Encoding an artifact failed.
    EncodeFailed,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        f.write_str(code.as_str().unwrap_or_default())
    }
}

/// A single diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Human readable description.
    pub message: String,

    /// Stable code for programmatic matching.
    pub code: ErrorCode,

    /// Label of the stage that recorded the entry.
    pub label: String,

    /// Severity.
    pub level: Level,

    /// Whether the entry halts further chained processing.
    pub fatal: bool,
}

/// Ordered collection of diagnostics recorded by a stage or operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    label: String,
    entries: Vec<Entry>,
}

impl Log {
    /// Create an empty log recording under `label`.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), entries: Vec::new() }
    }

    /// The label applied to newly recorded entries.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Change the label applied to newly recorded entries.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Record an entry.
    pub fn add(&mut self, level: Level, code: ErrorCode, message: impl Into<String>, fatal: bool) {
        let message = message.into();
        let label = self.label.as_str();
        match level {
            Level::Debug => tracing::debug!(%code, label, "{message}"),
            Level::Info => tracing::info!(%code, label, "{message}"),
            Level::Warning => tracing::warn!(%code, label, "{message}"),
            Level::Error => tracing::error!(%code, label, fatal, "{message}"),
        }
        self.entries.push(Entry { message, code, label: self.label.clone(), level, fatal });
    }

    /// Record a debug entry.
    pub fn debug(&mut self, message: impl Into<String>) {
        self.add(Level::Debug, ErrorCode::None, message, false);
    }

    /// Record an informational entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.add(Level::Info, ErrorCode::None, message, false);
    }

    /// Record a warning.
    pub fn warn(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.add(Level::Warning, code, message, false);
    }

    /// Record a non-fatal error.
    pub fn error(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.add(Level::Error, code, message, false);
    }

    /// Record a fatal error.
    pub fn fatal(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.add(Level::Error, code, message, true);
    }

    /// Record a warning when `relaxed` is set, otherwise an error.
    pub fn error_or_warn(&mut self, relaxed: bool, code: ErrorCode, message: impl Into<String>) {
        let level = if relaxed { Level::Warning } else { Level::Error };
        self.add(level, code, message, false);
    }

    /// All entries, in the order recorded.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries at `level` or above.
    pub fn at_least(&self, level: Level) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.level >= level)
    }

    /// Error-level entries.
    pub fn errors(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.level == Level::Error)
    }

    /// Warning-level entries.
    pub fn warnings(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.level == Level::Warning)
    }

    /// Number of error-level entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Returns `true` if any entry is fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.entries.iter().any(|e| e.fatal)
    }

    /// Returns `true` if an entry recorded after the first `mark` entries is
    /// fatal. Take `mark` from [`Log::len`].
    #[must_use]
    pub fn is_fatal_since(&self, mark: usize) -> bool {
        self.entries.iter().skip(mark).any(|e| e.fatal)
    }

    /// Returns `true` if any entry carries `code`.
    #[must_use]
    pub fn has(&self, code: ErrorCode) -> bool {
        self.entries.iter().any(|e| e.code == code)
    }

    /// Number of entries recorded.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move the entries of `other` onto the end of this log.
    pub fn append(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }
}
