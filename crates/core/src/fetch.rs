//! # Fetcher
//!
//! Downloads are made through the [`Fetcher`] trait so callers can swap the
//! HTTP client, add caching, or stub the network in tests. [`HttpFetcher`]
//! is the default `reqwest` implementation.

use std::future::Future;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::DOWNLOAD_TIMEOUT;

/// Retrieve and deserialize a JSON document.
pub trait Fetcher: Send + Sync {
    /// Fetch the JSON document at `url` and deserialize it as `T`.
    fn fetch<T>(&self, url: &str) -> impl Future<Output = Result<T>> + Send
    where
        T: DeserializeOwned + Send;
}

/// `reqwest` backed [`Fetcher`] with a bounded per-request timeout.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher using the default download timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("issue building http client")?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        tracing::debug!(url, "downloading");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("issue fetching {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected response from {url}"))?;
        response.json::<T>().await.with_context(|| format!("issue parsing response from {url}"))
    }
}
