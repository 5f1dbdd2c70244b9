//! In-process reference engine
//!
//! Keeps the camera in a [`Viewport`], clusters with [`ClusterIndex`] and
//! drives animations from a simulated clock, so the whole interaction loop
//! can run without a GPU or a browser. Time only moves through
//! [`HeadlessEngine::advance`], and expansion queries only resolve through
//! [`HeadlessEngine::resolve_queries`].

use crate::animation::transitions::{CameraFrame, CameraTransition, TransitionKind};
use crate::core::{
    config::{AnimationOptions, ClusterOptions},
    geo::{LatLng, Point},
    viewport::Viewport,
};
use crate::data::geojson::{Feature, FeatureCollection};
use crate::engine::{
    CameraOptions, ClusterError, ExpansionZoomFuture, LayerSpec, MapEngine, RenderedFeature,
};
use crate::input::events::{Cursor, EngineEvent, ListenerId, Subscription};
use crate::prelude::HashMap;
use crate::spatial::clustering::{ClusterEntry, ClusterId, ClusterIndex, ClusterView};
use crate::{MapError, Result};
use futures::channel::oneshot;
use futures::FutureExt;
use instant::Instant;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Hit radius of the invisible unclustered circles, in pixels
const UNCLUSTERED_HIT_RADIUS: f64 = 1.0;

struct PendingQuery {
    source: String,
    cluster: ClusterId,
    sender: oneshot::Sender<std::result::Result<f64, ClusterError>>,
}

pub struct HeadlessEngine {
    viewport: Viewport,
    animation: AnimationOptions,
    loaded: bool,
    removed: bool,
    sources: HashMap<String, ClusterIndex>,
    layers: Vec<LayerSpec>,
    listeners: BTreeMap<ListenerId, Subscription>,
    next_listener: u64,
    events: VecDeque<EngineEvent>,
    transition: Option<CameraTransition>,
    queries: VecDeque<PendingQuery>,
    /// Layers currently under the pointer
    hovered: Vec<String>,
    cursor: Cursor,
    clock: Instant,
    dirty: bool,
}

impl HeadlessEngine {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            animation: AnimationOptions::default(),
            loaded: false,
            removed: false,
            sources: HashMap::default(),
            layers: Vec::new(),
            listeners: BTreeMap::new(),
            next_listener: 0,
            events: VecDeque::new(),
            transition: None,
            queries: VecDeque::new(),
            hovered: Vec::new(),
            cursor: Cursor::Default,
            clock: Instant::now(),
            dirty: false,
        }
    }

    pub fn with_animation(mut self, animation: AnimationOptions) -> Self {
        self.animation = animation;
        self
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn pending_queries(&self) -> usize {
        self.queries.len()
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Marks the surface ready and notifies load listeners
    pub fn load(&mut self) {
        if self.loaded || self.removed {
            return;
        }
        self.loaded = true;
        log::debug!("headless surface loaded");
        self.emit(EngineEvent::Load);
    }

    /// Moves the camera without animation
    pub fn jump_to(&mut self, camera: CameraOptions) {
        self.transition = None;
        let zoom = camera.zoom.unwrap_or(self.viewport.zoom);
        self.apply_frame(CameraFrame {
            center: camera.center,
            zoom,
        });
        self.render();
        self.emit_move_end();
    }

    /// Advances the simulated clock by one frame
    pub fn advance(&mut self, dt: Duration) {
        if self.removed {
            return;
        }
        self.clock += dt;

        if let Some(transition) = self.transition.as_mut() {
            let frame = transition.advance(dt);
            let finished = transition.is_finished();
            self.apply_frame(frame);
            if finished {
                self.transition = None;
                self.render();
                self.emit_move_end();
                return;
            }
        }

        if self.dirty {
            self.render();
        }
    }

    /// Advances in fixed steps until no animation is running
    pub fn settle(&mut self, step: Duration) {
        self.advance(step);
        while self.transition.is_some() {
            self.advance(step);
        }
    }

    /// Repaints, notifying render listeners of every unclustered layer
    pub fn render(&mut self) {
        self.dirty = false;
        let frames: Vec<(String, Vec<Arc<Feature>>)> = self
            .layers
            .iter()
            .filter_map(|layer| match layer {
                LayerSpec::Unclustered { id, source } => {
                    let view = self.cluster_view(source)?;
                    Some((id.clone(), view.unclustered().cloned().collect()))
                }
                _ => None,
            })
            .collect();

        for (layer, features) in frames {
            self.emit(EngineEvent::Render { layer, features });
        }
    }

    /// Pointer press at a screen position.
    ///
    /// Hit testing happens now, so each click event carries what its layer
    /// drew under the pointer even if the camera moves before dispatch.
    pub fn click(&mut self, point: Point) {
        let lat_lng = self.viewport.pixel_to_lat_lng(&point);
        let ids: Vec<&str> = self.layers.iter().map(LayerSpec::id).collect();
        let mut by_layer: Vec<(String, Vec<RenderedFeature>)> = Vec::new();
        for rendered in self.query_rendered_features(Some(point), &ids) {
            match by_layer.iter_mut().find(|(layer, _)| *layer == rendered.layer) {
                Some((_, features)) => features.push(rendered),
                None => by_layer.push((rendered.layer.clone(), vec![rendered])),
            }
        }

        for (layer, features) in by_layer {
            self.emit(EngineEvent::Click {
                layer,
                point,
                lat_lng,
                features,
            });
        }
    }

    /// Pointer moved to a screen position
    pub fn hover(&mut self, point: Point) {
        let hit = self.layers_hit(point);
        let left: Vec<String> = self
            .hovered
            .iter()
            .filter(|layer| !hit.contains(layer))
            .cloned()
            .collect();
        let entered: Vec<String> = hit
            .iter()
            .filter(|layer| !self.hovered.contains(layer))
            .cloned()
            .collect();
        self.hovered = hit;

        for layer in left {
            self.emit(EngineEvent::MouseLeave { layer });
        }
        for layer in entered {
            self.emit(EngineEvent::MouseEnter { layer });
        }
    }

    /// Answers every outstanding expansion query against the current camera.
    ///
    /// Queries resolve in the order they were issued. A cluster that is no
    /// longer drawn at the current zoom level fails with [`ClusterError::Stale`].
    pub fn resolve_queries(&mut self) -> usize {
        let mut resolved = 0;
        while let Some(query) = self.queries.pop_front() {
            let result = self.expansion_zoom_now(&query.source, query.cluster);
            if query.sender.send(result).is_err() {
                log::trace!("expansion query for cluster {} was abandoned", query.cluster);
            }
            resolved += 1;
        }
        resolved
    }

    fn expansion_zoom_now(
        &self,
        source: &str,
        cluster: ClusterId,
    ) -> std::result::Result<f64, ClusterError> {
        let index = self
            .sources
            .get(source)
            .ok_or_else(|| ClusterError::UnknownSource(source.to_string()))?;
        let level = index.level_for_zoom(self.viewport.zoom);
        if !index.is_cluster_at(cluster, level) {
            return Err(ClusterError::Stale(cluster));
        }
        index
            .expansion_zoom(cluster)
            .map(f64::from)
            .ok_or(ClusterError::Stale(cluster))
    }

    fn cluster_view(&self, source: &str) -> Option<ClusterView> {
        let index = self.sources.get(source)?;
        Some(index.view(&self.viewport.bounds(), self.viewport.zoom))
    }

    /// Ids of the layers with a drawn feature under `point`
    fn layers_hit(&self, point: Point) -> Vec<String> {
        let ids: Vec<&str> = self.layers.iter().map(LayerSpec::id).collect();
        let mut hit: Vec<String> = Vec::new();
        for rendered in self.query_rendered_features(Some(point), &ids) {
            if !hit.contains(&rendered.layer) {
                hit.push(rendered.layer);
            }
        }
        hit
    }

    fn apply_frame(&mut self, frame: CameraFrame) {
        let previous = self.viewport.zoom;
        self.viewport.set_center(frame.center);
        self.viewport.set_zoom(frame.zoom);
        self.dirty = true;
        if self.viewport.zoom != previous {
            self.emit(EngineEvent::Zoom {
                zoom: self.viewport.zoom,
                timestamp: self.clock,
            });
        }
    }

    fn emit_move_end(&mut self) {
        self.emit(EngineEvent::MoveEnd {
            center: self.viewport.center,
            zoom: self.viewport.zoom,
        });
    }

    fn start_transition(&mut self, kind: TransitionKind, camera: CameraOptions, default: Duration) {
        if self.removed {
            return;
        }
        let start = CameraFrame {
            center: self.viewport.center,
            zoom: self.viewport.zoom,
        };
        let target = CameraFrame {
            center: camera.center,
            zoom: camera.zoom.unwrap_or(self.viewport.zoom),
        };
        let duration = camera.duration.unwrap_or(default);
        log::debug!(
            "{:?} to {} at zoom {:.2} over {:?}",
            kind,
            target.center,
            target.zoom,
            duration
        );
        self.transition = Some(CameraTransition::new(kind, start, target, duration));
    }

    fn emit(&mut self, event: EngineEvent) {
        if self.has_listener(&event) {
            self.events.push_back(event);
        }
    }

    fn has_listener(&self, event: &EngineEvent) -> bool {
        let kind = event.kind();
        self.listeners
            .values()
            .any(|subscription| subscription.matches(kind, event.layer()))
    }
}

impl MapEngine for HeadlessEngine {
    fn on(&mut self, subscription: Subscription) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(id, subscription);
        id
    }

    fn off(&mut self, listener: ListenerId) -> bool {
        let removed = self.listeners.remove(&listener).is_some();
        if removed {
            // queued events nobody listens to any more are dropped
            let pending = std::mem::take(&mut self.events);
            let kept: VecDeque<EngineEvent> = pending
                .into_iter()
                .filter(|event| self.has_listener(event))
                .collect();
            self.events = kept;
        }
        removed
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    fn is_loaded(&self) -> bool {
        self.loaded && !self.removed
    }

    fn add_cluster_source(
        &mut self,
        id: &str,
        collection: FeatureCollection,
        options: &ClusterOptions,
    ) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(MapError::SourceExists(id.to_string()));
        }
        let index = ClusterIndex::new(&collection, options.clone());
        self.sources.insert(id.to_string(), index);
        self.dirty = true;
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<()> {
        if !self.sources.contains_key(layer.source()) {
            return Err(MapError::UnknownSource(layer.source().to_string()));
        }
        if self.layers.iter().any(|existing| existing.id() == layer.id()) {
            return Err(MapError::Config(format!("layer '{}' already exists", layer.id())));
        }
        self.layers.push(layer);
        self.dirty = true;
        Ok(())
    }

    fn query_rendered_features(
        &self,
        point: Option<Point>,
        layers: &[&str],
    ) -> Vec<RenderedFeature> {
        let mut rendered = Vec::new();
        // topmost layer first
        for layer in self.layers.iter().rev() {
            if !layers.contains(&layer.id()) {
                continue;
            }
            let Some(view) = self.cluster_view(layer.source()) else {
                continue;
            };

            let hit = |position: &LatLng, radius: f64| match point {
                Some(point) => {
                    self.viewport.lat_lng_to_pixel(position).distance_to(&point) <= radius
                }
                None => true,
            };

            match layer {
                LayerSpec::Clusters { id, tiers, .. } => {
                    for cluster in view.clusters() {
                        if hit(&cluster.coordinates, tiers.style_for(cluster.point_count).radius) {
                            rendered.push(RenderedFeature {
                                layer: id.clone(),
                                entry: ClusterEntry::Cluster(cluster.clone()),
                            });
                        }
                    }
                }
                LayerSpec::ClusterCount { id, source } => {
                    let Some(index) = self.sources.get(source) else {
                        continue;
                    };
                    let tiers = &index.options().tiers;
                    for cluster in view.clusters() {
                        if hit(&cluster.coordinates, tiers.style_for(cluster.point_count).radius) {
                            rendered.push(RenderedFeature {
                                layer: id.clone(),
                                entry: ClusterEntry::Cluster(cluster.clone()),
                            });
                        }
                    }
                }
                LayerSpec::Unclustered { id, .. } => {
                    for feature in view.unclustered() {
                        if hit(&feature.coordinates, UNCLUSTERED_HIT_RADIUS) {
                            rendered.push(RenderedFeature {
                                layer: id.clone(),
                                entry: ClusterEntry::Feature(feature.clone()),
                            });
                        }
                    }
                }
            }
        }
        rendered
    }

    fn cluster_expansion_zoom(&mut self, source: &str, cluster: ClusterId) -> ExpansionZoomFuture {
        let (sender, receiver) = oneshot::channel();
        self.queries.push_back(PendingQuery {
            source: source.to_string(),
            cluster,
            sender,
        });
        async move {
            match receiver.await {
                Ok(result) => result,
                Err(_) => Err(ClusterError::Dropped),
            }
        }
        .boxed_local()
    }

    fn ease_to(&mut self, camera: CameraOptions) {
        let duration = self.animation.ease_duration();
        self.start_transition(TransitionKind::Ease, camera, duration);
    }

    fn fly_to(&mut self, camera: CameraOptions) {
        let duration = self.animation.fly_duration();
        self.start_transition(TransitionKind::Fly, camera, duration);
    }

    fn center(&self) -> LatLng {
        self.viewport.center
    }

    fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn now(&self) -> Instant {
        self.clock
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        self.listeners.clear();
        self.events.clear();
        self.transition = None;
        // dropping the senders fails outstanding queries
        self.queries.clear();
        self.hovered.clear();
        log::debug!("headless surface removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{CLUSTERS_LAYER, SOURCE_ID, UNCLUSTERED_LAYER};
    use crate::engine::{clicked_cluster, ClusterSource};
    use crate::input::events::EventKind;

    fn photo(id: &str, lat: f64, lng: f64) -> Feature {
        Feature::photo(id, LatLng::new(lat, lng), "t.jpg", "m.jpg")
    }

    fn loaded_engine(zoom: f64) -> HeadlessEngine {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0825), zoom, Point::new(800.0, 600.0));
        let mut engine = HeadlessEngine::new(viewport);
        engine.load();
        let mut source = ClusterSource::new(SOURCE_ID, ClusterOptions::default());
        let collection = FeatureCollection::new(vec![
            photo("a", 0.0, 0.0),
            photo("b", 0.0, 0.165),
            photo("c", 0.0, 0.6),
        ]);
        source.initialize(&mut engine, collection).unwrap();
        engine
    }

    fn drain(engine: &mut HeadlessEngine) -> Vec<EngineEvent> {
        std::iter::from_fn(|| engine.poll_event()).collect()
    }

    #[test]
    fn test_events_only_queued_for_listeners() {
        let mut engine = loaded_engine(8.0);
        engine.render();
        assert!(drain(&mut engine).is_empty());

        let id = engine.on(Subscription::on_layer(EventKind::Render, UNCLUSTERED_LAYER));
        engine.render();
        let events = drain(&mut engine);
        assert_eq!(events.len(), 1);
        match &events[0] {
            EngineEvent::Render { features, .. } => {
                let ids: Vec<_> = features.iter().map(|f| f.id.as_str()).collect();
                assert_eq!(ids, vec!["c"]);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert!(engine.off(id));
        assert!(!engine.off(id));
        engine.render();
        assert!(drain(&mut engine).is_empty());
    }

    #[test]
    fn test_load_fires_once() {
        let mut engine = HeadlessEngine::new(Viewport::default());
        engine.on(Subscription::new(EventKind::Load));
        assert!(!engine.is_loaded());
        engine.load();
        engine.load();
        assert!(engine.is_loaded());
        assert_eq!(drain(&mut engine), vec![EngineEvent::Load]);
    }

    #[test]
    fn test_ease_emits_zoom_then_move_end() {
        let mut engine = loaded_engine(8.0);
        engine.on(Subscription::new(EventKind::Zoom));
        engine.on(Subscription::new(EventKind::MoveEnd));

        engine.ease_to(CameraOptions::center(LatLng::new(0.0, 0.0825)).with_zoom(9.0));
        engine.settle(Duration::from_millis(100));

        let events = drain(&mut engine);
        assert!(events.iter().any(|e| e.kind() == EventKind::Zoom));
        match events.last() {
            Some(EngineEvent::MoveEnd { zoom, .. }) => assert_eq!(*zoom, 9.0),
            other => panic!("expected move end, got {:?}", other),
        }
        assert_eq!(engine.zoom(), 9.0);
    }

    #[test]
    fn test_cluster_hit_testing() {
        let mut engine = loaded_engine(8.0);
        engine.on(Subscription::on_layer(EventKind::Click, CLUSTERS_LAYER));
        engine.on(Subscription::on_layer(EventKind::MouseEnter, CLUSTERS_LAYER));
        engine.on(Subscription::on_layer(EventKind::MouseLeave, CLUSTERS_LAYER));

        let center = Point::new(400.0, 300.0);
        engine.click(center);
        engine.click(Point::new(10.0, 10.0));
        engine.hover(center);
        engine.hover(center);
        engine.hover(Point::new(10.0, 10.0));
        let events = drain(&mut engine);
        let kinds: Vec<_> = events.iter().map(EngineEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::Click, EventKind::MouseEnter, EventKind::MouseLeave]);

        match &events[0] {
            EngineEvent::Click { layer, features, .. } => {
                assert_eq!(layer, CLUSTERS_LAYER);
                assert_eq!(clicked_cluster(features).unwrap().point_count, 2);
            }
            other => panic!("expected click, got {:?}", other),
        }
    }

    #[test]
    fn test_expansion_query_resolves_and_goes_stale() {
        let mut engine = loaded_engine(8.0);
        let source = ClusterSource::new(SOURCE_ID, ClusterOptions::default());
        let hit = engine.query_rendered_features(Some(Point::new(400.0, 300.0)), &[CLUSTERS_LAYER]);
        let cluster = clicked_cluster(&hit).unwrap();

        let fresh = source.cluster_expansion_zoom(&mut engine, cluster.id);
        assert_eq!(engine.resolve_queries(), 1);
        assert_eq!(fresh.now_or_never(), Some(Ok(9.0)));

        let stale = source.cluster_expansion_zoom(&mut engine, cluster.id);
        engine.jump_to(CameraOptions::center(engine.center()).with_zoom(12.0));
        engine.resolve_queries();
        assert_eq!(stale.now_or_never(), Some(Err(ClusterError::Stale(cluster.id))));
    }

    #[test]
    fn test_remove_fails_pending_queries_and_drops_listeners() {
        let mut engine = loaded_engine(8.0);
        engine.on(Subscription::new(EventKind::MoveEnd));
        let query = engine.cluster_expansion_zoom(SOURCE_ID, ClusterId::new(1));
        engine.remove();

        assert_eq!(engine.listener_count(), 0);
        assert!(engine.is_removed());
        assert!(!engine.is_loaded());
        assert_eq!(query.now_or_never(), Some(Err(ClusterError::Dropped)));
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let mut engine = loaded_engine(8.0);
        let result = engine.add_cluster_source(
            SOURCE_ID,
            FeatureCollection::default(),
            &ClusterOptions::default(),
        );
        assert!(matches!(result, Err(MapError::SourceExists(_))));
        let result = engine.add_layer(LayerSpec::Unclustered {
            id: "other".into(),
            source: "missing".into(),
        });
        assert!(matches!(result, Err(MapError::UnknownSource(_))));
    }
}
