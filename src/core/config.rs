//! Configuration for the photo map view
//!
//! Every section deserializes with defaults, so a configuration file only has
//! to name the values it changes:
//!
//! ```json
//! {
//!   "cluster": { "radius": 50.0 },
//!   "detail_fields": [{ "name": "elevation", "format": { "fixed": 2 } }]
//! }
//! ```

use crate::core::{
    constants::{
        CLUSTER_MAX_ZOOM, CLUSTER_RADIUS, CLUSTER_TIER_COLORS, CLUSTER_TIER_RADII,
        CLUSTER_TIER_THRESHOLDS, CLUSTER_ZOOM_CEILING, DEFAULT_CENTER, DEFAULT_ZOOM,
        PLACEHOLDER_IMAGE, TELEMETRY_CATEGORY, ZOOM_TELEMETRY_INTERVAL_MS,
    },
    geo::{LatLng, Point},
};
use crate::data::fields::FieldSpec;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Visual weight of a cluster glyph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStyle {
    pub color: String,
    pub radius: f64,
}

/// Three size/colour tiers keyed by member count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTiers {
    /// Counts at which the second and third tier start
    pub thresholds: [usize; 2],
    pub colors: [String; 3],
    pub radii: [f64; 3],
}

impl ClusterTiers {
    /// Tier index (0, 1 or 2) for a member count
    pub fn tier_for(&self, count: usize) -> usize {
        self.thresholds.iter().filter(|t| count >= **t).count()
    }

    pub fn style_for(&self, count: usize) -> ClusterStyle {
        let tier = self.tier_for(count);
        ClusterStyle {
            color: self.colors[tier].clone(),
            radius: self.radii[tier],
        }
    }
}

impl Default for ClusterTiers {
    fn default() -> Self {
        Self {
            thresholds: CLUSTER_TIER_THRESHOLDS,
            colors: CLUSTER_TIER_COLORS.map(str::to_string),
            radii: CLUSTER_TIER_RADII,
        }
    }
}

/// Clustering policy of the photo source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Radius of each cluster in pixels
    pub radius: f64,
    /// Lowest zoom level that gets its own cluster level
    pub min_zoom: u8,
    /// Max zoom to cluster points on
    pub max_zoom: u8,
    pub tiers: ClusterTiers,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: CLUSTER_RADIUS,
            min_zoom: 0,
            max_zoom: CLUSTER_MAX_ZOOM,
            tiers: ClusterTiers::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryOptions {
    /// Minimum gap between two reported zoom changes
    pub zoom_interval_ms: u64,
    pub category: String,
}

impl TelemetryOptions {
    pub fn zoom_interval(&self) -> Duration {
        Duration::from_millis(self.zoom_interval_ms)
    }
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            zoom_interval_ms: ZOOM_TELEMETRY_INTERVAL_MS,
            category: TELEMETRY_CATEGORY.to_string(),
        }
    }
}

/// Durations of the two camera transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationOptions {
    /// Short "ease" used for cluster expansion
    pub ease_duration_ms: u64,
    /// Longer "fly" used to recenter on the user
    pub fly_duration_ms: u64,
}

impl AnimationOptions {
    pub fn ease_duration(&self) -> Duration {
        Duration::from_millis(self.ease_duration_ms)
    }

    pub fn fly_duration(&self) -> Duration {
        Duration::from_millis(self.fly_duration_ms)
    }
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            ease_duration_ms: 500,
            fly_duration_ms: 1500,
        }
    }
}

/// Top-level configuration of a map view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapViewConfig {
    pub initial_center: LatLng,
    pub initial_zoom: f64,
    /// Size of the rendering surface in pixels
    pub viewport_size: Point,
    pub cluster: ClusterOptions,
    pub telemetry: TelemetryOptions,
    pub animation: AnimationOptions,
    pub placeholder_image: String,
    /// Ordered fields of the photo detail view
    pub detail_fields: Vec<FieldSpec>,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            initial_center: LatLng::from_lng_lat(DEFAULT_CENTER),
            initial_zoom: DEFAULT_ZOOM,
            viewport_size: Point::new(800.0, 600.0),
            cluster: ClusterOptions::default(),
            telemetry: TelemetryOptions::default(),
            animation: AnimationOptions::default(),
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
            detail_fields: Vec::new(),
        }
    }
}

impl MapViewConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let cluster = &self.cluster;
        if !(cluster.radius.is_finite() && cluster.radius > 0.0) {
            return Err(MapError::Config(format!(
                "cluster radius must be positive, got {}",
                cluster.radius
            )));
        }
        if cluster.max_zoom > CLUSTER_ZOOM_CEILING {
            return Err(MapError::Config(format!(
                "cluster max_zoom {} is above {}",
                cluster.max_zoom, CLUSTER_ZOOM_CEILING
            )));
        }
        if cluster.min_zoom > cluster.max_zoom {
            return Err(MapError::Config(format!(
                "cluster min_zoom {} exceeds max_zoom {}",
                cluster.min_zoom, cluster.max_zoom
            )));
        }
        let [low, high] = cluster.tiers.thresholds;
        if low >= high {
            return Err(MapError::Config(format!(
                "cluster tier thresholds must increase, got {} then {}",
                low, high
            )));
        }
        if self.viewport_size.x <= 0.0 || self.viewport_size.y <= 0.0 {
            return Err(MapError::Config("viewport size must be non-zero".into()));
        }
        if !self.initial_center.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "{:?}",
                self.initial_center
            )));
        }
        Ok(())
    }
}
