//! Downloading issuer keys and revocation lists.

use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use shc_core::{ErrorCode, Fetcher, Log};
use shc_jose::Jwk;
use shc_status::Crl;

use crate::{Issuer, IssuerInfo};

/// Number of chunks issuer downloads are split into. Chunks run
/// concurrently; issuers within a chunk are fetched one after another.
pub const CHUNKS: usize = 8;

#[derive(Deserialize)]
struct KeySet {
    keys: Vec<Value>,
}

/// Download the key set, and the revocation list published for each key, for
/// one issuer.
///
/// Failures are recorded in `log`. Returns `None` if the key set could not be
/// retrieved.
pub async fn download(
    issuer: Issuer, fetcher: &impl Fetcher, log: &mut Log,
) -> Option<IssuerInfo> {
    let iss = issuer.iss.trim_end_matches('/').to_string();

    // --------------------------------------------------
    // Fetch keys
    // --------------------------------------------------
    let jwks_url = format!("{iss}/.well-known/jwks.json");
    let key_set: KeySet = match fetcher.fetch(&jwks_url).await {
        Ok(key_set) => key_set,
        Err(e) => {
            let message = format!("failed to download keys for {iss}: {e:#}");
            log.error(ErrorCode::DownloadFailed, message);
            return None;
        }
    };

    let mut keys = Vec::with_capacity(key_set.keys.len());
    for value in key_set.keys {
        match serde_json::from_value::<Jwk>(value) {
            Ok(key) => keys.push(key),
            Err(e) => {
                log.error(ErrorCode::JwkInvalidProperty, format!("unreadable key from {iss}: {e}"));
            }
        }
    }

    // --------------------------------------------------
    // Fetch revocation lists
    // --------------------------------------------------
    let mut crls = Vec::new();
    for key in &keys {
        let crl_url = format!("{iss}/.well-known/crl/{}.json", key.kid);
        match fetcher.fetch::<Crl>(&crl_url).await {
            Ok(crl) => crls.push(crl),
            // only a key that advertises a list is expected to have one
            Err(e) if key.crl_version.is_some() => {
                log.warn(ErrorCode::DownloadFailed, format!("no CRL for key {}: {e:#}", key.kid));
            }
            Err(e) => log.debug(format!("no CRL for key {}: {e:#}", key.kid)),
        }
    }

    Some(IssuerInfo {
        issuer,
        keys,
        crls: (!crls.is_empty()).then_some(crls),
        last_retrieved: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    })
}

/// Download every issuer, fanning out over at most [`CHUNKS`] concurrent
/// chunks. Results keep the input order.
pub(crate) async fn download_all(
    issuers: Vec<Issuer>, fetcher: &impl Fetcher,
) -> (Vec<IssuerInfo>, Log) {
    let chunk_size = issuers.len().div_ceil(CHUNKS).max(1);
    let chunks = issuers.chunks(chunk_size).map(|chunk| async move {
        let mut log = Log::new("DOWNLOAD");
        let mut infos = Vec::with_capacity(chunk.len());
        for issuer in chunk {
            if let Some(info) = download(issuer.clone(), fetcher, &mut log).await {
                infos.push(info);
            }
        }
        (infos, log)
    });

    let mut log = Log::new("DOWNLOAD");
    let mut infos = Vec::with_capacity(issuers.len());
    for (chunk_infos, chunk_log) in join_all(chunks).await {
        infos.extend(chunk_infos);
        log.append(chunk_log);
    }
    tracing::debug!(issuers = issuers.len(), downloaded = infos.len(), "downloaded issuers");
    (infos, log)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_utils::{MockFetcher, fixtures};

    use super::*;

    #[tokio::test]
    async fn issuer_with_crl() {
        let mut key = fixtures::public_jwk();
        key.crl_version = Some(1);
        let fetcher = MockFetcher::new()
            .with(format!("{}/.well-known/jwks.json", fixtures::ISSUER), json!({"keys": [key]}))
            .with(
                format!("{}/.well-known/crl/{}.json", fixtures::ISSUER, fixtures::KID),
                json!({"kid": fixtures::KID, "method": "rid", "ctr": 1, "rids": ["DQVFHWiCmGs"]}),
            );

        let mut log = Log::new("DOWNLOAD");
        let info = download(Issuer::new(fixtures::ISSUER), &fetcher, &mut log)
            .await
            .expect("should download");

        assert_eq!(info.keys.len(), 1);
        assert_eq!(info.crl(fixtures::KID).map(|crl| crl.rids.len()), Some(1));
        assert!(info.last_retrieved.is_some());
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn missing_crl_warns() {
        let mut key = fixtures::public_jwk();
        key.crl_version = Some(1);
        let fetcher = MockFetcher::new()
            .with(format!("{}/.well-known/jwks.json", fixtures::ISSUER), json!({"keys": [key]}));

        let mut log = Log::new("DOWNLOAD");
        let info = download(Issuer::new(fixtures::ISSUER), &fetcher, &mut log)
            .await
            .expect("should download");

        assert!(info.crls.is_none());
        assert_eq!(log.warnings().count(), 1);
    }

    #[tokio::test]
    async fn crl_without_version() {
        let fetcher = MockFetcher::new()
            .with(
                format!("{}/.well-known/jwks.json", fixtures::ISSUER),
                json!({"keys": [fixtures::public_jwk()]}),
            )
            .with(
                format!("{}/.well-known/crl/{}.json", fixtures::ISSUER, fixtures::KID),
                json!({"kid": fixtures::KID, "method": "rid", "ctr": 1, "rids": ["DQVFHWiCmGs"]}),
            );

        let mut log = Log::new("DOWNLOAD");
        let info = download(Issuer::new(fixtures::ISSUER), &fetcher, &mut log)
            .await
            .expect("should download");

        assert_eq!(info.crl(fixtures::KID).map(|crl| crl.ctr), Some(1));
        assert_eq!(log.error_count(), 0);
    }

    #[tokio::test]
    async fn unpublished_crl_is_quiet() {
        let fetcher = MockFetcher::new().with(
            format!("{}/.well-known/jwks.json", fixtures::ISSUER),
            json!({"keys": [fixtures::public_jwk()]}),
        );

        let mut log = Log::new("DOWNLOAD");
        let info = download(Issuer::new(fixtures::ISSUER), &fetcher, &mut log)
            .await
            .expect("should download");

        assert!(info.crls.is_none());
        assert_eq!(log.error_count(), 0);
        assert_eq!(log.warnings().count(), 0);
    }

    #[tokio::test]
    async fn chunked_download_keeps_order() {
        let mut fetcher = MockFetcher::new();
        let mut issuers = Vec::new();
        for i in 0..20 {
            let iss = format!("https://issuer{i}.example.com");
            if i != 7 {
                fetcher = fetcher.with(
                    format!("{iss}/.well-known/jwks.json"),
                    json!({"keys": [fixtures::public_jwk()]}),
                );
            }
            issuers.push(Issuer::new(iss));
        }

        let (infos, log) = download_all(issuers, &fetcher).await;
        assert_eq!(infos.len(), 19);
        assert_eq!(infos[7].issuer.iss, "https://issuer8.example.com");
        assert_eq!(log.error_count(), 1);
        assert!(log.has(ErrorCode::DownloadFailed));
    }
}
