//! Display metadata lookup over oEmbed.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::MediaId;
use crate::error::MetadataError;

pub const DEFAULT_OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// Title, channel and thumbnail for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl MediaMetadata {
    /// What to show when the lookup failed: the id as title, the
    /// predictable thumbnail URL.
    pub fn placeholder(id: &MediaId) -> Self {
        Self {
            title: id.to_string(),
            author_name: None,
            thumbnail_url: Some(id.thumbnail_url()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    endpoint: String,
}

impl MetadataClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_OEMBED_ENDPOINT.to_string(),
        }
    }

    /// Point the client at another oEmbed endpoint (used by tests).
    pub fn with_endpoint(endpoint: &str) -> Result<Self, MetadataError> {
        Url::parse(endpoint)?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        })
    }

    /// Fetch metadata for `id`.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status, or a
    /// body that is not oEmbed JSON.
    pub async fn fetch(&self, id: &MediaId) -> Result<MediaMetadata, MetadataError> {
        let mut url = Url::parse(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("url", &id.watch_url())
            .append_pair("format", "json");

        debug!(%id, "fetching media metadata");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status.as_u16()));
        }
        Ok(response.json::<MediaMetadata>().await?)
    }

    /// Fetch metadata, falling back to [`MediaMetadata::placeholder`].
    pub async fn fetch_or_placeholder(&self, id: &MediaId) -> MediaMetadata {
        match self.fetch(id).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(%id, error = %e, "metadata lookup failed; using placeholder");
                MediaMetadata::placeholder(id)
            }
        }
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new()
    }
}
