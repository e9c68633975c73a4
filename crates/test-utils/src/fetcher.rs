use std::collections::HashMap;

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shc_core::Fetcher;

/// A [`Fetcher`] serving canned JSON documents by URL. Unknown URLs fail.
#[derive(Clone, Debug, Default)]
pub struct MockFetcher {
    documents: HashMap<String, Value>,
}

impl MockFetcher {
    /// Create a fetcher with no documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` at `url`.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, document: Value) -> Self {
        self.documents.insert(url.into(), document);
        self
    }
}

impl Fetcher for MockFetcher {
    async fn fetch<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let document = self.documents.get(url).ok_or_else(|| anyhow!("404 Not Found: {url}"))?;
        serde_json::from_value(document.clone()).map_err(Into::into)
    }
}
