//! Page fetcher trait and the HTTP implementation.
//!
//! [`PageFetcher`] is the seam between the import engine and the
//! upstream site: one call per paginated index page, one call per
//! single record re-fetch (used by verification). Implementations own
//! all transport and extraction details.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use clubsync_core::entity::EntityType;
use clubsync_core::record::ScrapedRecord;

use crate::error::ScrapeError;

/// Fetches typed records from the upstream site.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one index page (1-based) for an entity type.
    ///
    /// An empty vector means the source is exhausted: `page` is past the
    /// last page.
    async fn fetch_page(
        &self,
        entity: EntityType,
        page: u32,
    ) -> Result<Vec<ScrapedRecord>, ScrapeError>;

    /// Re-fetch a single record by its upstream id.
    ///
    /// Returns `Ok(None)` when the record no longer exists upstream.
    async fn fetch_record(
        &self,
        entity: EntityType,
        ext_id: i64,
    ) -> Result<Option<ScrapedRecord>, ScrapeError>;
}

/// Envelope shape of an upstream export page.
#[derive(Debug, Deserialize)]
struct PageEnvelope {
    records: Vec<ScrapedRecord>,
}

/// [`PageFetcher`] backed by the upstream site's JSON export endpoints.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl HttpPageFetcher {
    /// Create a fetcher for the given upstream base URL.
    ///
    /// Panics if the HTTP client cannot be constructed, which only
    /// happens on system misconfiguration and should fail startup.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration, page_size: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            page_size,
        }
    }

    /// Upstream base URL this fetcher targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ScrapeError::from_reqwest)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScrapeError::NotFound);
        }
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ScrapeError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(
        &self,
        entity: EntityType,
        page: u32,
    ) -> Result<Vec<ScrapedRecord>, ScrapeError> {
        let url = format!(
            "{}/export/{}?page={}&per_page={}",
            self.base_url,
            entity.as_str(),
            page,
            self.page_size
        );

        tracing::debug!(entity = %entity, page, "Fetching upstream page");
        let envelope: PageEnvelope = self.get_json(&url).await?;

        // Records of the wrong entity type indicate an upstream routing
        // or layout problem; surface it rather than persisting garbage.
        if let Some(stray) = envelope
            .records
            .iter()
            .find(|r| r.entity_type() != entity)
        {
            return Err(ScrapeError::Malformed(format!(
                "Page for {entity} contained a {} record",
                stray.entity_type()
            )));
        }

        Ok(envelope.records)
    }

    async fn fetch_record(
        &self,
        entity: EntityType,
        ext_id: i64,
    ) -> Result<Option<ScrapedRecord>, ScrapeError> {
        let url = format!("{}/export/{}/{}", self.base_url, entity.as_str(), ext_id);

        match self.get_json::<ScrapedRecord>(&url).await {
            Ok(record) => Ok(Some(record)),
            Err(ScrapeError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
