//! Marker registry and its reconciliation pass
//!
//! After every render notification the registry holds exactly one marker per
//! photo in the notification's unclustered list, and nothing else. Markers
//! already on screen are left alone; their photos never move.

use crate::data::geojson::Feature;
use crate::layers::marker::{Marker, MarkerId, MarkerRenderer};
use crate::prelude::{HashMap, HashSet};
use std::sync::Arc;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub removed: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.removed == 0
    }
}

/// Owned mapping from photo identifier to its on-screen marker
pub struct MarkerRegistry<H> {
    markers: HashMap<MarkerId, Marker<H>>,
    placeholder: String,
}

impl<H> MarkerRegistry<H> {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            markers: HashMap::default(),
            placeholder: placeholder.into(),
        }
    }

    /// Aligns the registry with the latest rendered unclustered photos
    pub fn reconcile<R>(&mut self, renderer: &mut R, rendered: &[Arc<Feature>]) -> ReconcileReport
    where
        R: MarkerRenderer<Handle = H>,
    {
        let visible: HashSet<&MarkerId> = rendered.iter().map(|feature| &feature.id).collect();
        let mut report = ReconcileReport::default();

        let gone: Vec<MarkerId> = self
            .markers
            .keys()
            .filter(|id| !visible.contains(id))
            .cloned()
            .collect();
        for id in gone {
            if let Some(marker) = self.markers.remove(&id) {
                marker.destroy(renderer);
                report.removed += 1;
            }
        }

        for feature in rendered {
            if self.markers.contains_key(&feature.id) {
                continue;
            }
            let marker = Marker::create(renderer, feature.clone(), &self.placeholder);
            self.markers.insert(feature.id.clone(), marker);
            report.created += 1;
        }

        if !report.is_noop() {
            log::debug!(
                "reconciled markers: +{} -{} ({} live)",
                report.created,
                report.removed,
                self.markers.len()
            );
        }
        report
    }

    /// Destroys every marker, returning how many were released
    pub fn clear<R>(&mut self, renderer: &mut R) -> usize
    where
        R: MarkerRenderer<Handle = H>,
    {
        let count = self.markers.len();
        for (_, marker) in self.markers.drain() {
            marker.destroy(renderer);
        }
        count
    }

    pub fn get(&self, id: &MarkerId) -> Option<&Marker<H>> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &MarkerId) -> bool {
        self.markers.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &MarkerId> {
        self.markers.keys()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::data::geojson::FeatureId;
    use crate::layers::marker::HeadlessMarkerRenderer;

    fn photos(ids: &[&str]) -> Vec<Arc<Feature>> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                Arc::new(Feature::photo(
                    id,
                    LatLng::new(51.0 + i as f64 * 0.01, -0.1),
                    &format!("{}.jpg", id),
                    "main.jpg",
                ))
            })
            .collect()
    }

    fn keys(registry: &MarkerRegistry<impl Sized>) -> Vec<String> {
        let mut keys: Vec<String> = registry.ids().map(|id| id.as_str().to_string()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_keys_track_each_render() {
        let mut renderer = HeadlessMarkerRenderer::new();
        let mut registry = MarkerRegistry::new("logo.svg");

        let renders = [
            vec!["a", "b"],
            vec!["b", "c", "d"],
            vec![],
            vec!["d"],
            vec!["a", "b", "c", "d", "e"],
        ];
        for render in renders {
            registry.reconcile(&mut renderer, &photos(&render));
            let mut expected: Vec<String> = render.iter().map(|s| s.to_string()).collect();
            expected.sort();
            assert_eq!(keys(&registry), expected);
            assert_eq!(renderer.live(), registry.len());
        }
    }

    #[test]
    fn test_same_render_twice_is_noop() {
        let mut renderer = HeadlessMarkerRenderer::new();
        let mut registry = MarkerRegistry::new("logo.svg");
        let render = photos(&["a", "b", "c"]);

        let first = registry.reconcile(&mut renderer, &render);
        assert_eq!(first, ReconcileReport { created: 3, removed: 0 });

        let second = registry.reconcile(&mut renderer, &render);
        assert!(second.is_noop());
        assert_eq!(renderer.created(), 3);
        assert_eq!(renderer.destroyed(), 0);
    }

    #[test]
    fn test_duplicate_ids_in_render_make_one_marker() {
        let mut renderer = HeadlessMarkerRenderer::new();
        let mut registry = MarkerRegistry::new("logo.svg");
        let mut render = photos(&["a"]);
        render.push(render[0].clone());

        let report = registry.reconcile(&mut renderer, &render);
        assert_eq!(report.created, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(renderer.live(), 1);
    }

    #[test]
    fn test_kept_markers_are_untouched() {
        let mut renderer = HeadlessMarkerRenderer::new();
        let mut registry = MarkerRegistry::new("logo.svg");

        registry.reconcile(&mut renderer, &photos(&["a", "b"]));
        let handle_before = registry.get(&FeatureId::new("b")).unwrap().handle().raw();

        let report = registry.reconcile(&mut renderer, &photos(&["b", "c"]));
        assert_eq!(report, ReconcileReport { created: 1, removed: 1 });
        assert_eq!(registry.get(&FeatureId::new("b")).unwrap().handle().raw(), handle_before);
    }

    #[test]
    fn test_removed_markers_released_exactly_once() {
        let mut renderer = HeadlessMarkerRenderer::new();
        let mut registry = MarkerRegistry::new("logo.svg");

        registry.reconcile(&mut renderer, &photos(&["a", "b", "c"]));
        registry.reconcile(&mut renderer, &photos(&["c"]));
        registry.reconcile(&mut renderer, &photos(&["c"]));
        assert_eq!(renderer.destroyed(), 2);

        assert_eq!(registry.clear(&mut renderer), 1);
        assert_eq!(registry.clear(&mut renderer), 0);
        assert_eq!(renderer.created(), renderer.destroyed());
        assert_eq!(renderer.live(), 0);
    }

    #[test]
    fn test_image_failure_is_isolated() {
        let mut renderer = HeadlessMarkerRenderer::new();
        renderer.fail_image("b.jpg");
        let mut registry = MarkerRegistry::new("logo.svg");

        let report = registry.reconcile(&mut renderer, &photos(&["a", "b", "c"]));
        assert_eq!(report.created, 3);
        let image = |id: &str| {
            registry
                .get(&FeatureId::new(id))
                .unwrap()
                .image()
                .map(str::to_string)
        };
        assert_eq!(image("a").as_deref(), Some("a.jpg"));
        assert_eq!(image("b").as_deref(), Some("logo.svg"));
        assert_eq!(image("c").as_deref(), Some("c.jpg"));
    }
}
