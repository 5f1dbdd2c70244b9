//! Engine-wide defaults for the photo map view.
//! Keeping them in a single place makes it easier to tweak the magic numbers.

/// Square tile size in pixels; world size at zoom `z` is `TILE_SIZE * 2^z`.
pub const TILE_SIZE: u32 = 256;

/// Camera center used when no fresh location is known, as `[lng, lat]`.
pub const DEFAULT_CENTER: [f64; 2] = [-0.07, 51.58];

/// Starting zoom of the map view.
pub const DEFAULT_ZOOM: f64 = 10.0;

/// Radius of each cluster in pixels.
pub const CLUSTER_RADIUS: f64 = 40.0;

/// Max zoom to cluster points on; above it every feature is unclustered.
pub const CLUSTER_MAX_ZOOM: u8 = 14;

/// Highest `max_zoom` a configuration may ask to cluster on.
pub const CLUSTER_ZOOM_CEILING: u8 = 24;

/// Point counts at which a cluster glyph moves to the next tier.
pub const CLUSTER_TIER_THRESHOLDS: [usize; 2] = [100, 750];

/// Glyph colours per tier (small, medium, large).
pub const CLUSTER_TIER_COLORS: [&str; 3] = ["#51bbd6", "#f1f075", "#f28cb1"];

/// Glyph radii in pixels per tier.
pub const CLUSTER_TIER_RADII: [f64; 3] = [20.0, 30.0, 40.0];

/// Image shown when a thumbnail or main image fails to load.
pub const PLACEHOLDER_IMAGE: &str = "/custom/images/logo.svg";

/// Minimum gap between two reported zoom changes.
pub const ZOOM_TELEMETRY_INTERVAL_MS: u64 = 1000;

/// Telemetry category of every map event.
pub const TELEMETRY_CATEGORY: &str = "Map";

/// Rendered when a detail field has no value.
pub const MISSING_FIELD: &str = "-";

/// Source and layer identifiers installed on the engine.
pub const SOURCE_ID: &str = "data";
pub const CLUSTERS_LAYER: &str = "clusters";
pub const CLUSTER_COUNT_LAYER: &str = "cluster-count";
pub const UNCLUSTERED_LAYER: &str = "unclustered-point";
