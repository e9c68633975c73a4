//! The issuer directory.

use std::collections::HashSet;
use std::fmt::{self, Display};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shc_core::{Error, ErrorCode, Fetcher, Log, VCI_SNAPSHOT_URL, invalid};
use shc_jose::Jwk;
use shc_status::{Crl, Rid};
use tracing::instrument;

use crate::download::{download, download_all};
use crate::{Issuer, IssuerInfo, Policy, Source};

const LABEL: &str = "DIRECTORY";

/// A collection of trusted issuers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Directory {
    /// Directory name.
    #[serde(rename = "directory")]
    pub name: String,

    /// When the directory was assembled, as RFC 3339.
    pub time: String,

    /// Issuer entries, at most one per `iss` once created.
    pub issuer_info: Vec<IssuerInfo>,

    #[serde(skip)]
    log: Log,
}

/// The result of a successful [`Directory::find`].
#[derive(Clone, Debug)]
pub struct Found<'a> {
    /// The issuer entry.
    pub info: &'a IssuerInfo,

    /// The key, when a `kid` was requested.
    pub key: Option<&'a Jwk>,

    /// The key's revocation list, when a rid was requested.
    pub crl: Option<&'a Crl>,

    /// The matching revocation entry, when a rid was requested.
    pub rid: Option<Rid>,
}

/// Which level of a [`Directory::find`] lookup missed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotFound {
    /// No entry for the issuer.
    Issuer,

    /// The issuer has no key with the `kid`.
    Key,

    /// The key has no revocation list.
    Crl,

    /// The revocation list does not list the rid.
    Rid,
}

impl NotFound {
    /// Diagnostic code for the miss.
    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::Issuer => ErrorCode::DirectoryIssuerNotFound,
            Self::Key => ErrorCode::DirectoryKeyNotFound,
            Self::Crl => ErrorCode::DirectoryCrlNotFound,
            Self::Rid => ErrorCode::DirectoryRidNotFound,
        }
    }
}

impl Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer => f.write_str("issuer not found in directory"),
            Self::Key => f.write_str("key not found for issuer"),
            Self::Crl => f.write_str("no revocation list for key"),
            Self::Rid => f.write_str("rid not found in revocation list"),
        }
    }
}

impl Directory {
    /// Create a directory from `source` using the default [`Policy`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterInvalid`] if an in-memory document has an
    /// unrecognized shape. Download and validation failures are recorded in
    /// the directory's [`log`](Self::log) instead.
    pub async fn create(source: impl Into<Source>, fetcher: &impl Fetcher) -> Result<Self, Error> {
        Self::create_with(source, fetcher, &Policy::default()).await
    }

    /// Create a directory from `source`, validating with `policy`.
    ///
    /// Entries for the same issuer are merged before validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterInvalid`] if an in-memory document has an
    /// unrecognized shape.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_with(
        source: impl Into<Source>, fetcher: &impl Fetcher, policy: &Policy,
    ) -> Result<Self, Error> {
        let mut directory = Self { log: Log::new(LABEL), ..Self::default() };

        match source.into() {
            Source::Vci => {
                directory.load_url(VCI_SNAPSHOT_URL, fetcher).await?;
                if directory.name.is_empty() {
                    directory.name = "VCI".to_string();
                }
            }
            Source::Url(url) => {
                directory.load_url(&url, fetcher).await?;
                if directory.name.is_empty() {
                    directory.name = url;
                }
            }
            Source::Issuers(issuers) => directory.load_issuers(issuers, fetcher).await,
            Source::Document(document) => directory.load(document, fetcher).await?,
            Source::Documents(documents) => {
                for document in documents {
                    directory.load(document, fetcher).await?;
                }
            }
        }

        directory.issuer_info = fold(std::mem::take(&mut directory.issuer_info));
        if directory.time.is_empty() {
            directory.time = now();
        }

        let mut log = std::mem::take(&mut directory.log);
        directory.validate(policy, &mut log);
        directory.log = log;

        let issuers = directory.issuer_info.len();
        tracing::debug!(name = %directory.name, issuers, "directory created");
        Ok(directory)
    }

    /// Validate the directory, recording problems in `log`.
    ///
    /// Returns `true` if no errors were recorded.
    pub fn validate(&self, policy: &Policy, log: &mut Log) -> bool {
        let before = log.error_count();

        if self.name.is_empty() {
            log.warn(ErrorCode::DirectoryError, "directory has no name");
        }
        if DateTime::parse_from_rfc3339(&self.time).is_err() {
            let message = format!("directory time '{}' is not RFC 3339", self.time);
            log.warn(ErrorCode::DirectoryError, message);
        }

        let mut seen = HashSet::new();
        for info in &self.issuer_info {
            if !seen.insert(info.issuer.iss.as_str()) {
                log.error(
                    ErrorCode::DirectoryIssuerDuplicate,
                    format!("issuer {} appears more than once", info.issuer.iss),
                );
            }
            info.validate(policy, log);
        }

        log.error_count() == before
    }

    /// Merge several directories into one, folding entries for the same
    /// issuer together.
    #[must_use]
    pub fn merge(directories: impl IntoIterator<Item = Self>) -> Self {
        let mut merged = Self { log: Log::new(LABEL), time: now(), ..Self::default() };
        for directory in directories {
            if merged.name.is_empty() {
                merged.name = directory.name;
            }
            merged.issuer_info.extend(directory.issuer_info);
            merged.log.append(directory.log);
        }
        merged.issuer_info = fold(merged.issuer_info);
        merged
    }

    /// Look up an issuer and, optionally, one of its keys and a revocation
    /// entry under that key.
    ///
    /// A `rid` is only looked up when a `kid` is also given.
    ///
    /// # Errors
    ///
    /// Returns the level at which the lookup missed.
    pub fn find(
        &self, iss: &str, kid: Option<&str>, rid: Option<&str>,
    ) -> Result<Found<'_>, NotFound> {
        let info = self.issuer(iss).ok_or(NotFound::Issuer)?;
        let mut found = Found { info, key: None, crl: None, rid: None };

        let Some(kid) = kid else {
            return Ok(found);
        };
        found.key = Some(info.key(kid).ok_or(NotFound::Key)?);

        if let Some(rid) = rid {
            let crl = info.crl(kid).ok_or(NotFound::Crl)?;
            found.rid = Some(crl.find(rid).ok_or(NotFound::Rid)?);
            found.crl = Some(crl);
        }
        Ok(found)
    }

    /// Entry for `iss`, if present.
    #[must_use]
    pub fn issuer(&self, iss: &str) -> Option<&IssuerInfo> {
        self.issuer_info.iter().find(|info| info.issuer.iss == iss)
    }

    /// Re-download the keys and revocation lists of one issuer and fold
    /// them into its existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterInvalid`] if the issuer is not in the
    /// directory, or [`Error::DownloadFailed`] if its keys could not be
    /// retrieved.
    #[instrument(level = "debug", skip(self, fetcher))]
    pub async fn update(&mut self, iss: &str, fetcher: &impl Fetcher) -> Result<(), Error> {
        let Some(index) = self.issuer_info.iter().position(|info| info.issuer.iss == iss) else {
            return Err(invalid!("issuer {iss} is not in the directory"));
        };

        let issuer = self.issuer_info[index].issuer.clone();
        let Some(fresh) = download(issuer, fetcher, &mut self.log).await else {
            return Err(Error::DownloadFailed(format!("could not refresh keys for {iss}")));
        };
        self.issuer_info[index].absorb(fresh);

        let mut log = Log::new(LABEL);
        self.issuer_info[index].validate(&Policy::default(), &mut log);
        self.log.append(log);
        Ok(())
    }

    /// Diagnostics recorded while creating and updating the directory.
    #[must_use]
    pub const fn log(&self) -> &Log {
        &self.log
    }

    /// Returns `true` if no errors have been recorded against the directory.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.log.error_count() == 0
    }

    async fn load_url(&mut self, url: &str, fetcher: &impl Fetcher) -> Result<(), Error> {
        match fetcher.fetch::<Value>(url).await {
            Ok(document) => self.load(document, fetcher).await,
            Err(e) => {
                let message = format!("failed to download {url}: {e:#}");
                self.log.error(ErrorCode::DownloadFailed, message);
                Ok(())
            }
        }
    }

    async fn load_issuers(&mut self, issuers: Vec<String>, fetcher: &impl Fetcher) {
        let issuers = issuers.into_iter().map(Issuer::new).collect();
        let (infos, log) = download_all(issuers, fetcher).await;
        self.issuer_info.extend(infos);
        self.log.append(log);
    }

    // Accepts a directory document, an array of issuer entries, or an array
    // of issuer URLs.
    async fn load(&mut self, document: Value, fetcher: &impl Fetcher) -> Result<(), Error> {
        match document {
            Value::Object(mut object) => {
                let Some(Value::Array(entries)) = object.remove("issuerInfo") else {
                    return Err(invalid!("directory document has no 'issuerInfo' array"));
                };
                match object.get("directory") {
                    Some(Value::String(name)) if self.name.is_empty() => {
                        self.name.clone_from(name);
                    }
                    Some(Value::String(_)) => {}
                    _ => self.log.warn(ErrorCode::DirectoryError, "directory document has no name"),
                }
                match object.get("time") {
                    Some(Value::String(time)) => self.time.clone_from(time),
                    _ => self.log.warn(ErrorCode::DirectoryError, "directory document has no time"),
                }
                self.load_entries(entries);
                Ok(())
            }
            Value::Array(items) if items.iter().all(Value::is_string) => {
                let issuers = items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(ToString::to_string))
                    .collect();
                self.load_issuers(issuers, fetcher).await;
                Ok(())
            }
            Value::Array(entries) if entries.iter().all(Value::is_object) => {
                self.load_entries(entries);
                Ok(())
            }
            _ => Err(invalid!("unrecognized directory source")),
        }
    }

    fn load_entries(&mut self, entries: Vec<Value>) {
        for entry in entries {
            match serde_json::from_value::<IssuerInfo>(entry) {
                Ok(info) if info.issuer.iss.is_empty() => {
                    self.log.error(ErrorCode::DirectoryIssuerMissingIss, "issuer entry has no 'iss'");
                }
                Ok(info) => self.issuer_info.push(info),
                Err(e) => {
                    let message = format!("unreadable issuer entry: {e}");
                    self.log.error(ErrorCode::DirectorySchemaError, message);
                }
            }
        }
    }
}

// Merge entries sharing an `iss`, keeping first-seen order.
fn fold(infos: Vec<IssuerInfo>) -> Vec<IssuerInfo> {
    let mut folded: Vec<IssuerInfo> = Vec::with_capacity(infos.len());
    for mut info in infos {
        match folded.iter_mut().find(|kept| kept.issuer.iss == info.issuer.iss) {
            Some(kept) => kept.absorb(info),
            None => {
                info.scrub();
                folded.push(info);
            }
        }
    }
    folded
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
