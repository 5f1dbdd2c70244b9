//! Sources of the photo dataset
//!
//! The map view asks its feed for the full collection exactly once, after the
//! rendering surface reports it is ready.

use crate::data::geojson::FeatureCollection;
use crate::Result;
use async_trait::async_trait;

/// Supplies the full photo dataset asynchronously
#[async_trait]
pub trait FeatureFeed: Send + Sync {
    async fn fetch(&self) -> Result<FeatureCollection>;
}

/// A collection that is already in memory
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    collection: FeatureCollection,
}

impl StaticFeed {
    pub fn new(collection: FeatureCollection) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl FeatureFeed for StaticFeed {
    async fn fetch(&self) -> Result<FeatureCollection> {
        Ok(self.collection.clone())
    }
}

/// GeoJSON file on local disk
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: std::path::PathBuf,
}

#[cfg(feature = "tokio-runtime")]
impl FileFeed {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(feature = "tokio-runtime")]
#[async_trait]
impl FeatureFeed for FileFeed {
    async fn fetch(&self) -> Result<FeatureCollection> {
        log::debug!("reading photo collection from {}", self.path.display());
        let raw = tokio::fs::read_to_string(&self.path).await?;
        FeatureCollection::from_json_str(&raw)
    }
}

/// GeoJSON document served over HTTP
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http")]
impl HttpFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl FeatureFeed for HttpFeed {
    async fn fetch(&self) -> Result<FeatureCollection> {
        log::debug!("fetching photo collection from {}", self.url);
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        FeatureCollection::from_json_str(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::data::geojson::Feature;

    #[tokio::test]
    async fn test_static_feed_returns_its_collection() {
        let collection = FeatureCollection::new(vec![Feature::photo(
            "a",
            LatLng::new(51.5, -0.1),
            "a-thumb.jpg",
            "a.jpg",
        )]);
        let feed = StaticFeed::new(collection.clone());
        assert_eq!(feed.fetch().await.unwrap(), collection);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_file_feed_reports_missing_file() {
        let feed = FileFeed::new("/definitely/not/here.geojson");
        assert!(matches!(feed.fetch().await, Err(crate::MapError::Io(_))));
    }
}
