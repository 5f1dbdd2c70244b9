//! GeoJSON photo features
//!
//! The photo feed is a GeoJSON `FeatureCollection` of Point features whose
//! properties carry the image references. Parsing turns the loose wire form
//! into immutable [`Feature`] records with a stable [`FeatureId`].

use crate::core::geo::LatLng;
use crate::prelude::HashSet;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use std::fmt;
use std::sync::Arc;

/// GeoJSON geometry as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    /// Any other geometry type; photos are always points
    #[serde(other)]
    Unsupported,
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<JsonMap<String, Value>>,
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
}

/// Stable identifier of a photo, unique within a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Property bag of a photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoProperties {
    raw: JsonMap<String, Value>,
}

impl PhotoProperties {
    pub fn new(raw: JsonMap<String, Value>) -> Self {
        Self { raw }
    }

    /// Thumbnail image URL used for the marker
    pub fn thumbnail(&self) -> Option<&str> {
        self.raw.get("thumbnail").and_then(Value::as_str)
    }

    /// Full resolution image URL used by the detail view
    pub fn main(&self) -> Option<&str> {
        self.raw.get("main").and_then(Value::as_str)
    }

    /// Any named display field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.raw.insert(name.into(), value);
    }

    pub fn as_map(&self) -> &JsonMap<String, Value> {
        &self.raw
    }
}

/// Immutable geotagged photo record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub coordinates: LatLng,
    pub properties: PhotoProperties,
}

impl Feature {
    pub fn new(id: impl Into<FeatureId>, coordinates: LatLng, properties: PhotoProperties) -> Self {
        Self {
            id: id.into(),
            coordinates,
            properties,
        }
    }

    /// Builds a feature whose only properties are its image references
    pub fn photo(id: &str, coordinates: LatLng, thumbnail: &str, main: &str) -> Self {
        let mut properties = PhotoProperties::default();
        properties.insert("id", Value::String(id.to_string()));
        properties.insert("thumbnail", Value::String(thumbnail.to_string()));
        properties.insert("main", Value::String(main.to_string()));
        Self::new(FeatureId::new(id), coordinates, properties)
    }

    fn from_geojson(raw: GeoJsonFeature) -> std::result::Result<Self, String> {
        let properties = raw.properties.unwrap_or_default();
        let id = properties
            .get("id")
            .and_then(FeatureId::from_json)
            .or_else(|| raw.id.as_ref().and_then(FeatureId::from_json))
            .ok_or_else(|| "feature without id".to_string())?;

        let coordinates = match raw.geometry {
            Some(GeoJsonGeometry::Point { coordinates }) => LatLng::from_lng_lat(coordinates),
            Some(GeoJsonGeometry::Unsupported) => {
                return Err(format!("feature {} is not a point", id))
            }
            None => return Err(format!("feature {} has no geometry", id)),
        };
        if !coordinates.is_valid() {
            return Err(format!("feature {} has invalid coordinates {:?}", id, coordinates));
        }

        Ok(Self::new(id, coordinates, PhotoProperties::new(properties)))
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The full photo dataset, immutable once loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Arc<Feature>>,
}

impl FeatureCollection {
    /// Collects features, keeping the first of any duplicated identifier
    pub fn new(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut seen = HashSet::default();
        let features = features
            .into_iter()
            .filter(|f| {
                let fresh = seen.insert(f.id.clone());
                if !fresh {
                    log::warn!("duplicate photo id {}, keeping the first", f.id);
                }
                fresh
            })
            .map(Arc::new)
            .collect();
        Self { features }
    }

    /// Parses a GeoJSON document, skipping records that cannot be placed on the map
    pub fn from_geojson(geojson: GeoJson) -> Self {
        let raw = match geojson {
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::FeatureCollection { features } => features,
        };

        let features = raw.into_iter().filter_map(|raw| match Feature::from_geojson(raw) {
            Ok(feature) => Some(feature),
            Err(reason) => {
                log::warn!("skipping photo feature: {}", reason);
                None
            }
        });
        Self::new(features)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let geojson: GeoJson = serde_json::from_str(json)
            .map_err(|e| MapError::ParseError(format!("Invalid GeoJSON: {}", e)))?;
        Ok(Self::from_geojson(geojson))
    }

    pub fn features(&self) -> &[Arc<Feature>] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-0.07, 51.58] },
                "properties": {
                    "id": "photo-1",
                    "thumbnail": "https://cdn.example/t/1.jpg",
                    "main": "https://cdn.example/m/1.jpg",
                    "elevation": 12.5
                }
            },
            {
                "type": "Feature",
                "id": 42,
                "geometry": { "type": "Point", "coordinates": [-0.08, 51.59] },
                "properties": { "thumbnail": "t2.jpg" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] },
                "properties": { "id": "line" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [1.0, 1.0] },
                "properties": { "main": "no-id.jpg" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [2.0, 2.0] },
                "properties": { "id": "photo-1" }
            }
        ]
    }"#;

    #[test]
    fn test_parses_points_and_skips_the_rest() {
        let collection = FeatureCollection::from_json_str(SAMPLE).unwrap();
        let ids: Vec<_> = collection.features().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["photo-1", "42"]);

        let first = &collection.features()[0];
        assert_eq!(first.coordinates, LatLng::new(51.58, -0.07));
        assert_eq!(first.properties.thumbnail(), Some("https://cdn.example/t/1.jpg"));
        assert_eq!(first.properties.main(), Some("https://cdn.example/m/1.jpg"));
        assert_eq!(first.properties.get("elevation"), Some(&Value::from(12.5)));

        let second = &collection.features()[1];
        assert_eq!(second.properties.main(), None);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let collection = FeatureCollection::from_json_str(SAMPLE).unwrap();
        let dup = collection
            .features()
            .iter()
            .filter(|f| f.id.as_str() == "photo-1")
            .count();
        assert_eq!(dup, 1);
        assert_eq!(collection.features()[0].coordinates.lng, -0.07);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let err = FeatureCollection::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, MapError::ParseError(_)));
    }
}
