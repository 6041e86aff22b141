//! Directus REST content source.

use std::time::Duration;

use agencyos_core::{BlockKind, ItemId, config::ContentConfig};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::source::{ContentSource, Result, SourceError, wildcard_fields};

/// Response envelope used by the Directus items API.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Content source backed by the Directus items API.
#[derive(Debug, Clone)]
pub struct DirectusSource {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl DirectusSource {
    /// Create a client for the Directus instance at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let invalid = |message: String| SourceError::InvalidUrl {
            url: base_url.clone(),
            message,
        };
        let parsed = Url::parse(&base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: parsed,
            token: None,
        })
    }

    /// Create a client from the `[content]` configuration section.
    pub fn from_config(config: &ContentConfig) -> Result<Self> {
        let mut source = Self::new(&config.url, Duration::from_secs(config.timeout_secs))?;
        source.token = config.token.clone();
        Ok(source)
    }

    /// Send a static access token with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL extended with `segments`, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "not a hierarchical URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let mut request = self.client.get(url.clone()).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "content source response");

        // Directus answers 403 for records the caller may not see, which
        // includes records that do not exist.
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        Ok(Some(envelope.data))
    }
}

/// Fields requested for a page.
///
/// Many-to-any block items are not covered by wildcards, so each block
/// collection gets its own `blocks.item:<collection>` selector.
pub fn page_fields(depth: u8) -> String {
    let mut fields = vec!["*".to_string(), "blocks.*".to_string()];
    if depth > 1 {
        let nested = wildcard_fields(depth - 1);
        fields.extend(
            BlockKind::ALL
                .iter()
                .map(|kind| format!("blocks.item:{}.{nested}", kind.collection())),
        );
    }
    fields.join(",")
}

#[async_trait]
impl ContentSource for DirectusSource {
    #[instrument(skip(self), fields(source = "directus"))]
    async fn fetch_item(&self, collection: &str, id: &ItemId, depth: u8) -> Result<Option<Value>> {
        let id = id.to_string();
        let url = self.url(&["items", collection, &id])?;
        let query = [("fields", wildcard_fields(depth))];
        Ok(self
            .get::<Value>(url, &query)
            .await?
            .filter(|data| !data.is_null()))
    }

    #[instrument(skip(self), fields(source = "directus"))]
    async fn fetch_page(&self, permalink: &str, depth: u8) -> Result<Option<Value>> {
        let url = self.url(&["items", "pages"])?;
        let query = [
            ("filter[permalink][_eq]", permalink.to_string()),
            ("fields", page_fields(depth)),
            ("limit", "1".to_string()),
        ];
        let pages = self.get::<Vec<Value>>(url, &query).await?;
        Ok(pages.and_then(|pages| pages.into_iter().next()))
    }
}
