//! # photomap
//!
//! Viewport marker synchronization for clustered photo maps.
//!
//! A [`MapView`] installs a photo collection into a clustering map engine,
//! keeps exactly one marker per unclustered photo on screen, zooms into
//! clicked clusters, recenters on the user's location and opens a detail
//! view for clicked photos. The engine and the marker presentation are
//! capabilities handed in by the host; [`engine::HeadlessEngine`] and
//! [`layers::marker::HeadlessMarkerRenderer`] implement them in-process.

pub mod animation;
pub mod core;
pub mod data;
pub mod engine;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod spatial;
pub mod telemetry;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    builder::MapViewBuilder,
    config::MapViewConfig,
    geo::{LatLng, LatLngBounds, Point},
    map::{Capabilities, MapView, PlatformFlags},
    viewport::Viewport,
};

pub use data::{
    feed::FeatureFeed,
    geojson::{Feature, FeatureCollection, FeatureId},
};

pub use engine::{ClusterError, ClusterSource, HeadlessEngine, MapEngine};

pub use layers::{
    marker::{HeadlessMarkerRenderer, ImageLoadError, Marker, MarkerRenderer},
    registry::MarkerRegistry,
};

pub use telemetry::{TelemetryEvent, TelemetrySink, ZoomTelemetryThrottle};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Map surface is not loaded yet")]
    NotReady,

    #[error("Source already exists: {0}")]
    SourceExists(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Map view is unmounted")]
    Unmounted,
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend; later calls are no-ops
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
