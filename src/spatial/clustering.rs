//! Hierarchical point clustering
//!
//! Every integer zoom level between `min_zoom` and `max_zoom` gets its own
//! partition of the photos. Level `max_zoom + 1` holds the raw points; each
//! lower level greedily merges the items of the level above that fall within
//! the cluster radius (measured in pixels at that zoom). Clusters therefore
//! only dissolve as the zoom increases, and above `max_zoom` nothing is
//! clustered.

use crate::core::{
    config::ClusterOptions,
    constants::TILE_SIZE,
    geo::{LatLng, LatLngBounds, Point},
};
use crate::data::geojson::{Feature, FeatureCollection};
use crate::prelude::HashMap;
use crate::spatial::index::{SpatialIndex, SpatialItem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(u64);

impl ClusterId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cluster glyph as drawn at some zoom level
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Count-weighted center of the members
    pub coordinates: LatLng,
    pub point_count: usize,
}

impl Cluster {
    /// Label of the count layer, `1.2k` style above a thousand
    pub fn abbreviated_count(&self) -> String {
        abbreviate_count(self.point_count)
    }
}

pub fn abbreviate_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

/// One drawn item of a cluster level
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterEntry {
    Cluster(Cluster),
    Feature(Arc<Feature>),
}

/// Spatial partition of the visible photos at one zoom level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterView {
    pub level: u8,
    pub entries: Vec<ClusterEntry>,
}

impl ClusterView {
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.entries.iter().filter_map(|entry| match entry {
            ClusterEntry::Cluster(cluster) => Some(cluster),
            ClusterEntry::Feature(_) => None,
        })
    }

    /// Photos drawn on their own, outside any cluster glyph
    pub fn unclustered(&self) -> impl Iterator<Item = &Arc<Feature>> {
        self.entries.iter().filter_map(|entry| match entry {
            ClusterEntry::Feature(feature) => Some(feature),
            ClusterEntry::Cluster(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Point(usize),
    Cluster(ClusterId),
}

#[derive(Debug, Clone)]
struct LevelItem {
    position: Point,
    count: usize,
    node: Node,
}

struct Level {
    items: Vec<LevelItem>,
    index: SpatialIndex<usize>,
}

impl Level {
    fn new(items: Vec<LevelItem>) -> Self {
        let index = SpatialIndex::bulk_load(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| SpatialItem::new(item.position, i))
                .collect(),
        );
        Self { items, index }
    }
}

#[derive(Debug, Clone)]
struct ClusterRecord {
    position: Point,
    count: usize,
    /// Level the cluster was formed on; it splits one level above
    origin_zoom: u8,
    /// Lowest level it survives to before merging into a bigger cluster
    lowest_zoom: u8,
    children: Vec<Node>,
}

/// Per-zoom cluster hierarchy of a feature collection
pub struct ClusterIndex {
    options: ClusterOptions,
    features: Vec<Arc<Feature>>,
    /// `levels[z - min_zoom]` for z in `min_zoom..=max_zoom + 1`
    levels: Vec<Level>,
    clusters: HashMap<ClusterId, ClusterRecord>,
}

impl ClusterIndex {
    pub fn new(collection: &FeatureCollection, options: ClusterOptions) -> Self {
        let features: Vec<Arc<Feature>> = collection.features().to_vec();
        let mut index = Self {
            options,
            features,
            levels: Vec::new(),
            clusters: HashMap::default(),
        };
        index.build();
        index
    }

    fn build(&mut self) {
        let points = self
            .features
            .iter()
            .enumerate()
            .map(|(i, feature)| LevelItem {
                position: feature.coordinates.to_unit_mercator(),
                count: 1,
                node: Node::Point(i),
            })
            .collect();

        let mut levels = vec![Level::new(points)];
        let mut next_id = 0u64;
        for zoom in (self.options.min_zoom..=self.options.max_zoom).rev() {
            let above = &levels[levels.len() - 1];
            let items = self.cluster_level(&above.items, &above.index, zoom, &mut next_id);
            levels.push(Level::new(items));
        }
        levels.reverse();
        self.levels = levels;

        log::debug!(
            "clustered {} photos into {} clusters over zoom {}..={}",
            self.features.len(),
            self.clusters.len(),
            self.options.min_zoom,
            self.options.max_zoom
        );
    }

    fn cluster_level(
        &mut self,
        above: &[LevelItem],
        above_index: &SpatialIndex<usize>,
        zoom: u8,
        next_id: &mut u64,
    ) -> Vec<LevelItem> {
        let radius = self.options.radius / (TILE_SIZE as f64 * 2_f64.powi(zoom as i32));
        let mut visited = vec![false; above.len()];
        let mut items = Vec::with_capacity(above.len());

        for (i, item) in above.iter().enumerate() {
            if visited[i] {
                continue;
            }
            visited[i] = true;

            let mut neighbours: Vec<usize> = above_index
                .query_radius(&item.position, radius)
                .into_iter()
                .map(|hit| hit.data)
                .filter(|j| !visited[*j])
                .collect();

            if neighbours.is_empty() {
                if let Node::Cluster(id) = item.node {
                    if let Some(record) = self.clusters.get_mut(&id) {
                        record.lowest_zoom = zoom;
                    }
                }
                items.push(item.clone());
                continue;
            }

            neighbours.sort_unstable();
            let mut count = item.count;
            let mut weighted = item.position.multiply(item.count as f64);
            let mut children = vec![item.node];
            for j in neighbours {
                visited[j] = true;
                let other = &above[j];
                count += other.count;
                weighted = weighted.add(&other.position.multiply(other.count as f64));
                children.push(other.node);
            }

            *next_id += 1;
            let id = ClusterId(*next_id);
            let position = weighted.multiply(1.0 / count as f64);
            self.clusters.insert(
                id,
                ClusterRecord {
                    position,
                    count,
                    origin_zoom: zoom,
                    lowest_zoom: zoom,
                    children,
                },
            );
            items.push(LevelItem {
                position,
                count,
                node: Node::Cluster(id),
            });
        }

        items
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Level used to draw a fractional zoom
    pub fn level_for_zoom(&self, zoom: f64) -> u8 {
        let lowest = self.options.min_zoom as f64;
        let highest = (self.options.max_zoom as f64 + 1.0).min(u8::MAX as f64);
        zoom.floor().clamp(lowest, highest) as u8
    }

    fn level(&self, level: u8) -> Option<&Level> {
        let offset = level.checked_sub(self.options.min_zoom)?;
        self.levels.get(offset as usize)
    }

    fn entry(&self, node: Node) -> Option<ClusterEntry> {
        match node {
            Node::Point(i) => self.features.get(i).cloned().map(ClusterEntry::Feature),
            Node::Cluster(id) => self.cluster(id).map(ClusterEntry::Cluster),
        }
    }

    pub fn cluster(&self, id: ClusterId) -> Option<Cluster> {
        self.clusters.get(&id).map(|record| Cluster {
            id,
            coordinates: LatLng::from_unit_mercator(record.position),
            point_count: record.count,
        })
    }

    /// Partition of the photos inside `bounds` at `zoom`
    pub fn view(&self, bounds: &LatLngBounds, zoom: f64) -> ClusterView {
        let level = self.level_for_zoom(zoom);
        let Some(items) = self.level(level) else {
            return ClusterView {
                level,
                entries: Vec::new(),
            };
        };

        let north_west = LatLng::new(bounds.north_east.lat, bounds.south_west.lng);
        let south_east = LatLng::new(bounds.south_west.lat, bounds.north_east.lng);
        let mut hits: Vec<usize> = items
            .index
            .query(north_west.to_unit_mercator(), south_east.to_unit_mercator())
            .into_iter()
            .map(|hit| hit.data)
            .collect();
        hits.sort_unstable();

        let entries = hits
            .into_iter()
            .filter_map(|i| self.entry(items.items[i].node))
            .collect();
        ClusterView { level, entries }
    }

    /// Whether a cluster is drawn at the given level
    pub fn is_cluster_at(&self, id: ClusterId, level: u8) -> bool {
        self.clusters
            .get(&id)
            .map(|record| (record.lowest_zoom..=record.origin_zoom).contains(&level))
            .unwrap_or(false)
    }

    /// Minimum zoom at which the cluster's members are no longer grouped
    pub fn expansion_zoom(&self, id: ClusterId) -> Option<u8> {
        let mut record = self.clusters.get(&id)?;
        let mut zoom = record.origin_zoom;
        while let Some(next) = zoom.checked_add(1) {
            zoom = next;
            if record.children.len() != 1 || zoom > self.options.max_zoom {
                break;
            }
            match record.children[0] {
                Node::Cluster(child) => match self.clusters.get(&child) {
                    Some(next) => record = next,
                    None => break,
                },
                Node::Point(_) => break,
            }
        }
        Some(zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: &str, lat: f64, lng: f64) -> Feature {
        Feature::photo(id, LatLng::new(lat, lng), "t.jpg", "m.jpg")
    }

    fn world() -> LatLngBounds {
        LatLngBounds::new(LatLng::new(-85.0, -180.0), LatLng::new(85.0, 180.0))
    }

    // At zoom 8 one degree of longitude on the equator spans ~182 px.
    fn three_photos() -> FeatureCollection {
        FeatureCollection::new(vec![
            photo("a", 0.0, 0.0),
            photo("b", 0.0, 0.165),
            photo("c", 0.0, 0.6),
        ])
    }

    #[test]
    fn test_pair_clusters_at_zoom_8_and_splits_at_9() {
        let index = ClusterIndex::new(&three_photos(), ClusterOptions::default());

        let view = index.view(&world(), 8.0);
        assert_eq!(view.level, 8);
        let clusters: Vec<_> = view.clusters().collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].point_count, 2);
        assert!((clusters[0].coordinates.lng - 0.0825).abs() < 1e-9);
        let singles: Vec<_> = view.unclustered().map(|f| f.id.as_str()).collect();
        assert_eq!(singles, vec!["c"]);

        let id = clusters[0].id;
        assert_eq!(index.expansion_zoom(id), Some(9));
        assert_eq!(index.view(&world(), 9.0).unclustered().count(), 3);
        assert!(index.is_cluster_at(id, 8));
        assert!(!index.is_cluster_at(id, 9));
    }

    #[test]
    fn test_clusters_dissolve_monotonically() {
        let index = ClusterIndex::new(&three_photos(), ClusterOptions::default());
        let mut previous = 0;
        for zoom in 0..=16 {
            let singles = index.view(&world(), zoom as f64).unclustered().count();
            assert!(singles >= previous, "zoom {} lost unclustered photos", zoom);
            previous = singles;
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn test_everything_unclustered_above_max_zoom() {
        let collection = FeatureCollection::new(vec![
            photo("a", 51.5, -0.1),
            photo("b", 51.5, -0.1),
        ]);
        let index = ClusterIndex::new(&collection, ClusterOptions::default());
        assert_eq!(index.level_for_zoom(20.0), 15);
        let view = index.view(&world(), 20.0);
        assert_eq!(view.unclustered().count(), 2);
        assert_eq!(view.clusters().count(), 0);

        let view = index.view(&world(), 14.0);
        let cluster = view.clusters().next().unwrap();
        assert_eq!(index.expansion_zoom(cluster.id), Some(15));
    }

    #[test]
    fn test_low_zoom_merges_everything() {
        let index = ClusterIndex::new(&three_photos(), ClusterOptions::default());
        let view = index.view(&world(), 2.0);
        let clusters: Vec<_> = view.clusters().collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].point_count, 3);
        assert_eq!(view.unclustered().count(), 0);
        assert!(index.expansion_zoom(clusters[0].id).unwrap() > 2);
    }

    #[test]
    fn test_clustering_up_to_the_top_zoom_level() {
        let collection = FeatureCollection::new(vec![
            photo("a", 51.5, -0.1),
            photo("b", 51.5, -0.1),
        ]);
        let options = ClusterOptions {
            min_zoom: 250,
            max_zoom: u8::MAX,
            ..ClusterOptions::default()
        };
        let index = ClusterIndex::new(&collection, options);
        assert_eq!(index.level_for_zoom(300.0), u8::MAX);

        let view = index.view(&world(), 255.0);
        let cluster = view.clusters().next().unwrap();
        assert_eq!(index.expansion_zoom(cluster.id), Some(u8::MAX));
    }

    #[test]
    fn test_view_is_limited_to_bounds() {
        let index = ClusterIndex::new(&three_photos(), ClusterOptions::default());
        let bounds = LatLngBounds::new(LatLng::new(-1.0, 0.5), LatLng::new(1.0, 1.0));
        let view = index.view(&bounds, 12.0);
        let ids: Vec<_> = view.unclustered().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_unknown_cluster() {
        let index = ClusterIndex::new(&three_photos(), ClusterOptions::default());
        assert_eq!(index.expansion_zoom(ClusterId::new(999)), None);
        assert!(index.cluster(ClusterId::new(999)).is_none());
    }

    #[test]
    fn test_abbreviated_counts() {
        assert_eq!(abbreviate_count(2), "2");
        assert_eq!(abbreviate_count(999), "999");
        assert_eq!(abbreviate_count(1000), "1k");
        assert_eq!(abbreviate_count(1234), "1.2k");
        assert_eq!(abbreviate_count(15_400), "15k");
    }
}
