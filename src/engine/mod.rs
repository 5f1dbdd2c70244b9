//! Rendering engine capability set
//!
//! The map view never touches a concrete renderer. Everything it needs from
//! one (a clustering source, layers, listeners, hit testing, the cluster
//! expansion query and camera animations) goes through [`MapEngine`].

pub mod headless;
pub mod source;

use crate::core::{
    config::{ClusterOptions, ClusterTiers},
    geo::{LatLng, Point},
};
use crate::data::geojson::FeatureCollection;
use crate::input::events::{Cursor, EngineEvent, ListenerId, Subscription};
use crate::spatial::clustering::{ClusterEntry, ClusterId};
use crate::Result;
use futures::future::LocalBoxFuture;
use instant::Instant;
use std::time::Duration;

pub use headless::HeadlessEngine;
pub use source::{clicked_cluster, ClusterSource};

/// Failure of the asynchronous expansion-zoom query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("cluster {0} no longer exists at the current viewport")]
    Stale(ClusterId),
    #[error("no cluster source named {0}")]
    UnknownSource(String),
    #[error("engine dropped the expansion query")]
    Dropped,
}

/// Resolves to the zoom at which a cluster fully separates
pub type ExpansionZoomFuture = LocalBoxFuture<'static, std::result::Result<f64, ClusterError>>;

/// Target of a camera animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOptions {
    pub center: LatLng,
    /// `None` keeps the current zoom
    pub zoom: Option<f64>,
    /// `None` uses the engine default of the transition
    pub duration: Option<Duration>,
}

impl CameraOptions {
    pub fn center(center: LatLng) -> Self {
        Self {
            center,
            zoom: None,
            duration: None,
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Style layers drawn from a cluster source
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    /// Circle glyph per cluster, tiered by member count
    Clusters {
        id: String,
        source: String,
        tiers: ClusterTiers,
    },
    /// Abbreviated member count on top of each cluster glyph
    ClusterCount { id: String, source: String },
    /// Invisible circles for unclustered photos; their render events drive markers
    Unclustered { id: String, source: String },
}

impl LayerSpec {
    pub fn id(&self) -> &str {
        match self {
            LayerSpec::Clusters { id, .. }
            | LayerSpec::ClusterCount { id, .. }
            | LayerSpec::Unclustered { id, .. } => id,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            LayerSpec::Clusters { source, .. }
            | LayerSpec::ClusterCount { source, .. }
            | LayerSpec::Unclustered { source, .. } => source,
        }
    }
}

/// A feature as drawn by one layer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub layer: String,
    pub entry: ClusterEntry,
}

/// What the map view needs from a clustering-capable rendering engine
pub trait MapEngine {
    /// Registers a listener; events are only delivered while it is registered
    fn on(&mut self, subscription: Subscription) -> ListenerId;

    /// Detaches a listener, returning whether it was registered
    fn off(&mut self, listener: ListenerId) -> bool;

    /// Next pending notification for a registered listener
    fn poll_event(&mut self) -> Option<EngineEvent>;

    /// Whether the surface reported it can accept data
    fn is_loaded(&self) -> bool;

    fn add_cluster_source(
        &mut self,
        id: &str,
        collection: FeatureCollection,
        options: &ClusterOptions,
    ) -> Result<()>;

    fn add_layer(&mut self, layer: LayerSpec) -> Result<()>;

    /// Features drawn by `layers`, at a screen point or over the whole surface
    fn query_rendered_features(
        &self,
        point: Option<Point>,
        layers: &[&str],
    ) -> Vec<RenderedFeature>;

    fn cluster_expansion_zoom(&mut self, source: &str, cluster: ClusterId) -> ExpansionZoomFuture;

    /// Short animated pan + zoom
    fn ease_to(&mut self, camera: CameraOptions);

    /// Longer animated flight
    fn fly_to(&mut self, camera: CameraOptions);

    fn center(&self) -> LatLng;

    fn zoom(&self) -> f64;

    fn set_cursor(&mut self, cursor: Cursor);

    /// Clock that stamps zoom events
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Releases the rendering surface
    fn remove(&mut self);
}
