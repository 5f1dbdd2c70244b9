//! Prelude module for common photomap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use photomap::prelude::*;`

pub use crate::core::{
    builder::MapViewBuilder,
    config::{AnimationOptions, ClusterOptions, ClusterTiers, MapViewConfig, TelemetryOptions},
    geo::{LatLng, LatLngBounds, Point},
    map::{Capabilities, MapView, PlatformFlags},
    viewport::Viewport,
};

pub use crate::data::{
    feed::{FeatureFeed, StaticFeed},
    fields::{FieldFormat, FieldFormatters, FieldSpec},
    geojson::{Feature, FeatureCollection, FeatureId, PhotoProperties},
};

#[cfg(feature = "tokio-runtime")]
pub use crate::data::feed::FileFeed;

#[cfg(feature = "http")]
pub use crate::data::feed::HttpFeed;

pub use crate::engine::{CameraOptions, ClusterError, ClusterSource, HeadlessEngine, MapEngine};

pub use crate::input::{
    events::{Cursor, EngineEvent, EventKind},
    expansion::{ClusterExpansionController, ExpansionState},
};

pub use crate::layers::{
    marker::{HeadlessMarkerRenderer, ImageLoadError, Marker, MarkerRenderer},
    registry::{MarkerRegistry, ReconcileReport},
};

pub use crate::spatial::clustering::{Cluster, ClusterId, ClusterIndex};

pub use crate::telemetry::{
    ChannelSink, LogSink, NullSink, TelemetryAction, TelemetryEvent, TelemetrySink,
    ZoomTelemetryThrottle,
};

pub use crate::ui::{
    controls::{FlyToController, GpsIcon, GpsLocator, LocationControl, LocationReading},
    popup::{DetailView, PhotoDetailPresenter, SelectedFeature},
};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
