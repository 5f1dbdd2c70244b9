use photomap::constants::{CLUSTERS_LAYER, SOURCE_ID};
use photomap::prelude::*;
use photomap::spatial::clustering::ClusterEntry;

/// Marker synchronization driven by a full map view on the headless engine
#[cfg(test)]
mod marker_sync_tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    /// Two photos 30 px apart at zoom 8 and a third one ~100 px away
    fn three_photos() -> FeatureCollection {
        FeatureCollection::new(vec![
            Feature::photo("a", LatLng::new(0.0, 0.0), "a.jpg", "a-main.jpg"),
            Feature::photo("b", LatLng::new(0.0, 0.165), "b.jpg", "b-main.jpg"),
            Feature::photo("c", LatLng::new(0.0, 0.6), "c.jpg", "c-main.jpg"),
        ])
    }

    /// A deterministic scatter of photos around London
    fn london_photos(count: usize) -> FeatureCollection {
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 11) as f64 / (1u64 << 53) as f64
        };
        FeatureCollection::new((0..count).map(|i| {
            let lat = 51.4 + next() * 0.35;
            let lng = -0.35 + next() * 0.55;
            Feature::photo(&format!("p{}", i), LatLng::new(lat, lng), "t.jpg", "m.jpg")
        }))
    }

    fn mounted_at(center: LatLng, zoom: f64) -> MapView<HeadlessEngine, HeadlessMarkerRenderer> {
        let mut view = MapViewBuilder::new()
            .with_center_and_zoom(center, zoom)
            .with_telemetry(NullSink)
            .build_headless()
            .unwrap();
        view.engine_mut().load();
        view.pump();
        view
    }

    fn marker_keys(view: &MapView<HeadlessEngine, HeadlessMarkerRenderer>) -> Vec<String> {
        let mut keys: Vec<String> = view
            .markers()
            .ids()
            .map(|id| id.as_str().to_string())
            .collect();
        keys.sort();
        keys
    }

    fn rendered_keys(view: &MapView<HeadlessEngine, HeadlessMarkerRenderer>) -> Vec<String> {
        let source = ClusterSource::new(SOURCE_ID, ClusterOptions::default());
        let mut keys: Vec<String> = source
            .rendered_unclustered_features(view.engine())
            .iter()
            .map(|feature| feature.id.as_str().to_string())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Cluster of two plus one single photo; expanding the cluster adds two
    /// markers and leaves the existing one alone
    #[tokio::test]
    async fn test_cluster_expansion_scenario() {
        let mut view = mounted_at(LatLng::new(0.0, 0.0825), 8.0);
        view.load_features(&StaticFeed::new(three_photos())).await.unwrap();
        view.engine_mut().advance(FRAME);
        view.pump();

        let clusters: Vec<Cluster> = view
            .engine()
            .query_rendered_features(None, &[CLUSTERS_LAYER])
            .into_iter()
            .filter_map(|rendered| match rendered.entry {
                ClusterEntry::Cluster(cluster) => Some(cluster),
                ClusterEntry::Feature(_) => None,
            })
            .collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].point_count, 2);
        assert_eq!(marker_keys(&view), vec!["c"]);
        let c_handle = view.markers().get(&FeatureId::new("c")).unwrap().handle().raw();

        view.engine_mut().click(Point::new(400.0, 300.0));
        view.pump();
        assert!(matches!(view.expansion_state(), ExpansionState::Expanding { .. }));

        view.engine_mut().resolve_queries();
        assert_eq!(view.poll_expansions(), 1);
        view.engine_mut().settle(FRAME);
        view.pump();

        assert_eq!(view.zoom(), 9.0);
        assert_eq!(marker_keys(&view), vec!["a", "b", "c"]);
        assert_eq!(view.markers().get(&FeatureId::new("c")).unwrap().handle().raw(), c_handle);
        assert_eq!(view.renderer().created(), 3);
        assert_eq!(view.renderer().destroyed(), 0);
        assert_eq!(view.expansion_state(), ExpansionState::Idle);
    }

    /// After every processed render the registry mirrors the rendered set
    #[test]
    fn test_registry_matches_every_render() {
        let mut view = mounted_at(LatLng::new(51.55, -0.1), 10.0);
        view.install_features(london_photos(400)).unwrap();

        let cameras = [
            (LatLng::new(51.55, -0.1), 10.0),
            (LatLng::new(51.55, -0.1), 13.0),
            (LatLng::new(51.50, -0.12), 14.0),
            (LatLng::new(51.52, -0.2), 15.5),
            (LatLng::new(51.60, 0.05), 12.0),
            (LatLng::new(51.50, -0.12), 16.0),
            (LatLng::new(51.55, -0.1), 9.0),
        ];
        for (center, zoom) in cameras {
            view.engine_mut().jump_to(CameraOptions::center(center).with_zoom(zoom));
            view.pump();
            assert_eq!(marker_keys(&view), rendered_keys(&view), "camera {} @ {}", center, zoom);
            assert_eq!(view.renderer().live(), view.markers().len());
            assert!(view.sync_markers().is_noop());
        }
    }

    /// Animated flights reconcile every frame without leaking elements
    #[test]
    fn test_animation_frames_keep_registry_consistent() {
        let mut view = mounted_at(LatLng::new(51.55, -0.1), 11.0);
        view.install_features(london_photos(250)).unwrap();
        view.engine_mut().advance(FRAME);
        view.pump();

        view.engine_mut().ease_to(CameraOptions::center(LatLng::new(51.51, -0.13)).with_zoom(15.0));
        while view.engine().is_animating() {
            view.engine_mut().advance(FRAME);
            view.pump();
            assert_eq!(marker_keys(&view), rendered_keys(&view));
        }

        let renderer = view.renderer();
        assert_eq!(renderer.created() - renderer.destroyed(), renderer.live());
        assert_eq!(renderer.live(), view.markers().len());
    }

    /// Repeated identical renders never recreate markers
    #[test]
    fn test_idle_frames_are_noops() {
        let mut view = mounted_at(LatLng::new(0.0, 0.0825), 9.0);
        view.install_features(three_photos()).unwrap();
        view.engine_mut().advance(FRAME);
        view.pump();
        let created = view.renderer().created();

        for _ in 0..5 {
            view.engine_mut().render();
            view.pump();
        }
        assert_eq!(view.renderer().created(), created);
        assert_eq!(view.renderer().destroyed(), 0);
    }

    /// A thumbnail that fails to load does not stop the other markers
    #[test]
    fn test_thumbnail_failure_falls_back_per_marker() {
        let mut view = mounted_at(LatLng::new(0.0, 0.0825), 9.0);
        view.renderer_mut().fail_image("b.jpg");
        view.install_features(three_photos()).unwrap();
        view.engine_mut().advance(FRAME);
        view.pump();

        assert_eq!(view.markers().len(), 3);
        let image = |id: &str| {
            view.markers()
                .get(&FeatureId::new(id))
                .unwrap()
                .image()
                .map(str::to_string)
        };
        assert_eq!(image("a").as_deref(), Some("a.jpg"));
        assert_eq!(image("b").as_deref(), Some("/custom/images/logo.svg"));
        assert_eq!(image("c").as_deref(), Some("c.jpg"));
    }

    /// Above the last clustered zoom every photo in view has a marker
    #[test]
    fn test_everything_unclustered_beyond_max_zoom() {
        let mut view = mounted_at(LatLng::new(51.55, -0.1), 15.0);
        let photos = FeatureCollection::new(vec![
            Feature::photo("x", LatLng::new(51.55, -0.1), "x.jpg", "x.jpg"),
            Feature::photo("y", LatLng::new(51.55, -0.1), "y.jpg", "y.jpg"),
        ]);
        view.install_features(photos).unwrap();
        view.engine_mut().advance(FRAME);
        view.pump();
        assert_eq!(marker_keys(&view), vec!["x", "y"]);

        view.engine_mut().jump_to(CameraOptions::center(LatLng::new(51.55, -0.1)).with_zoom(14.0));
        view.pump();
        assert!(view.markers().is_empty());
    }
}
