use crate::{
    core::{
        config::MapViewConfig,
        constants::{CLUSTERS_LAYER, SOURCE_ID, UNCLUSTERED_LAYER},
        geo::LatLng,
        viewport::Viewport,
    },
    data::{
        feed::FeatureFeed,
        fields::FieldFormatters,
        geojson::{FeatureCollection, FeatureId},
    },
    engine::{clicked_cluster, CameraOptions, ClusterError, ClusterSource, MapEngine},
    input::{
        events::{Cursor, EngineEvent, EventKind, ListenerId, Subscription},
        expansion::{ClusterExpansionController, ExpansionState, ExpansionTicket},
    },
    layers::{
        marker::MarkerRenderer,
        registry::{MarkerRegistry, ReconcileReport},
    },
    telemetry::{LogSink, Telemetry, TelemetrySink},
    ui::{
        controls::{FlyToController, GpsLocator, LocationControl, LocationReading, LocationStatus},
        popup::{DetailView, PhotoDetailPresenter, SelectedFeature},
    },
    spatial::clustering::Cluster,
    MapError, Result,
};
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

type ExpansionResult = (ExpansionTicket, std::result::Result<f64, ClusterError>);

/// Platform features the host reports at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformFlags {
    /// Pointer can hover, so cluster glyphs get a hover cursor
    pub hover_cursor: bool,
}

/// Everything the map view needs from its surroundings
pub struct Capabilities {
    pub telemetry: Box<dyn TelemetrySink>,
    pub platform: PlatformFlags,
}

impl Capabilities {
    pub fn new(telemetry: Box<dyn TelemetrySink>) -> Self {
        Self {
            telemetry,
            platform: PlatformFlags::default(),
        }
    }

    pub fn with_platform(mut self, platform: PlatformFlags) -> Self {
        self.platform = platform;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(Box::new(LogSink))
    }
}

/// A mounted photo map.
///
/// Owns the engine, the marker renderer and every piece of interaction
/// state. The host drives it from one thread: forward engine activity with
/// [`MapView::pump`], marker clicks with [`MapView::handle_marker_click`] and
/// expansion answers with [`MapView::poll_expansions`].
pub struct MapView<E, R>
where
    E: MapEngine,
    R: MarkerRenderer,
{
    engine: E,
    renderer: R,
    config: MapViewConfig,
    platform: PlatformFlags,
    source: ClusterSource,
    markers: MarkerRegistry<R::Handle>,
    expansion: ClusterExpansionController,
    pending: FuturesUnordered<LocalBoxFuture<'static, ExpansionResult>>,
    locator: GpsLocator,
    fly_to: FlyToController,
    detail: PhotoDetailPresenter,
    telemetry: Telemetry,
    listeners: Vec<ListenerId>,
    mounted: bool,
}

impl<E, R> MapView<E, R>
where
    E: MapEngine,
    R: MarkerRenderer,
{
    /// Camera to mount with: the user's fresh location, else the configured center
    pub fn initial_camera(config: &MapViewConfig, locator: &GpsLocator) -> CameraOptions {
        let center = match locator.status() {
            LocationStatus::Available(center) => center,
            LocationStatus::Unavailable => config.initial_center,
        };
        CameraOptions::center(center).with_zoom(config.initial_zoom)
    }

    pub fn initial_viewport(config: &MapViewConfig, locator: &GpsLocator) -> Viewport {
        let camera = Self::initial_camera(config, locator);
        Viewport::new(
            camera.center,
            camera.zoom.unwrap_or(config.initial_zoom),
            config.viewport_size,
        )
    }

    /// Takes ownership of the surface and waits for it to load
    pub fn mount(
        mut engine: E,
        renderer: R,
        config: MapViewConfig,
        capabilities: Capabilities,
    ) -> Result<Self> {
        config.validate()?;

        let load = engine.on(Subscription::new(EventKind::Load));
        let telemetry = Telemetry::new(
            capabilities.telemetry,
            &config.telemetry,
            engine.zoom(),
            engine.now(),
        );
        let detail = PhotoDetailPresenter::new(
            FieldFormatters::from_specs(&config.detail_fields),
            config.placeholder_image.clone(),
        );

        log::info!(
            "mounting map view at {} zoom {}",
            engine.center(),
            engine.zoom()
        );
        Ok(Self {
            source: ClusterSource::new(SOURCE_ID, config.cluster.clone()),
            markers: MarkerRegistry::new(config.placeholder_image.clone()),
            expansion: ClusterExpansionController::new(),
            pending: FuturesUnordered::new(),
            locator: GpsLocator::new(),
            fly_to: FlyToController::new(),
            platform: capabilities.platform,
            listeners: vec![load],
            mounted: true,
            engine,
            renderer,
            config,
            detail,
            telemetry,
        })
    }

    /// Replaces the detail view formatters built from the configuration
    pub fn set_formatters(&mut self, formatters: FieldFormatters) {
        self.detail = PhotoDetailPresenter::new(formatters, self.config.placeholder_image.clone());
    }

    /// Fetches the dataset and installs it
    pub async fn load_features<F>(&mut self, feed: &F) -> Result<()>
    where
        F: FeatureFeed + ?Sized,
    {
        let collection = feed.fetch().await?;
        self.install_features(collection)
    }

    /// Installs the clustered source and its layers, then subscribes to the
    /// render, camera and cluster interaction events
    pub fn install_features(&mut self, collection: FeatureCollection) -> Result<()> {
        if !self.mounted {
            return Err(MapError::Unmounted);
        }
        self.source.initialize(&mut self.engine, collection)?;

        let mut subscriptions = vec![
            Subscription::new(EventKind::Zoom),
            Subscription::new(EventKind::MoveEnd),
            Subscription::on_layer(EventKind::Render, UNCLUSTERED_LAYER),
            Subscription::on_layer(EventKind::Click, CLUSTERS_LAYER),
        ];
        if self.platform.hover_cursor {
            subscriptions.push(Subscription::on_layer(EventKind::MouseEnter, CLUSTERS_LAYER));
            subscriptions.push(Subscription::on_layer(EventKind::MouseLeave, CLUSTERS_LAYER));
        }
        for subscription in subscriptions {
            self.listeners.push(self.engine.on(subscription));
        }
        log::debug!("{} engine listeners registered", self.listeners.len());
        Ok(())
    }

    /// Dispatches every pending engine event, returning how many were handled
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.engine.poll_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        if !self.mounted {
            return;
        }
        match event {
            EngineEvent::Load => log::info!("map surface ready"),
            EngineEvent::Render { layer, features } => {
                if layer == UNCLUSTERED_LAYER {
                    self.markers.reconcile(&mut self.renderer, &features);
                }
            }
            EngineEvent::Zoom { zoom, timestamp } => {
                self.telemetry.zoom_changed(zoom, timestamp);
            }
            EngineEvent::MoveEnd { center, zoom } => self.telemetry.moved(center, zoom),
            EngineEvent::Click { layer, features, .. } => {
                if layer == CLUSTERS_LAYER {
                    if let Some(cluster) = clicked_cluster(&features) {
                        self.expand_cluster(&cluster);
                    }
                }
            }
            EngineEvent::MouseEnter { .. } => self.engine.set_cursor(Cursor::Pointer),
            EngineEvent::MouseLeave { .. } => self.engine.set_cursor(Cursor::Default),
        }
    }

    /// Re-runs reconciliation against what the engine draws right now
    pub fn sync_markers(&mut self) -> ReconcileReport {
        let rendered = self.source.rendered_unclustered_features(&self.engine);
        self.markers.reconcile(&mut self.renderer, &rendered)
    }

    fn expand_cluster(&mut self, cluster: &Cluster) {
        self.telemetry.cluster_clicked();

        let ticket = self.expansion.begin(cluster);
        let query = self.source.cluster_expansion_zoom(&mut self.engine, cluster.id);
        self.pending
            .push(async move { (ticket, query.await) }.boxed_local());
    }

    fn apply_expansion(
        &mut self,
        ticket: ExpansionTicket,
        result: std::result::Result<f64, ClusterError>,
    ) -> bool {
        match self.expansion.finish(ticket, result) {
            Some(camera) => {
                self.engine.ease_to(camera);
                true
            }
            None => false,
        }
    }

    /// Applies every expansion answer that is already available; returns how
    /// many of them moved the camera
    pub fn poll_expansions(&mut self) -> usize {
        let mut moved = 0;
        while let Some(Some((ticket, result))) = self.pending.next().now_or_never() {
            if self.apply_expansion(ticket, result) {
                moved += 1;
            }
        }
        moved
    }

    /// Waits for the next expansion answer; `None` when nothing is pending
    pub async fn next_expansion(&mut self) -> Option<bool> {
        let (ticket, result) = self.pending.next().await?;
        Some(self.apply_expansion(ticket, result))
    }

    pub fn expansion_state(&self) -> ExpansionState {
        self.expansion.state()
    }

    /// Opens the detail view of a marker's photo
    pub fn handle_marker_click(&mut self, id: &FeatureId) -> Option<&DetailView> {
        let feature = match self.markers.get(id) {
            Some(marker) => marker.feature().clone(),
            None => {
                log::warn!("click on unknown marker {}", id);
                return None;
            }
        };
        self.telemetry.photo_opened(feature.id.as_str());
        Some(self.detail.open(&feature))
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.current()
    }

    /// Reports a failed main image of the open detail view
    pub fn detail_image_failed(&mut self) -> bool {
        self.detail.image_failed()
    }

    pub fn close_detail(&mut self) -> Option<SelectedFeature> {
        self.detail.close()
    }

    pub fn set_location(&mut self, reading: LocationReading) {
        self.locator.update(reading);
    }

    pub fn set_welcome_shown(&mut self, shown: bool) {
        self.locator.set_welcome_shown(shown);
    }

    pub fn location_control(&self) -> LocationControl {
        self.locator.control()
    }

    /// Recenter button handler; does nothing while the button is hidden or disabled
    pub fn fly_to_current_location(&mut self) -> bool {
        let control = self.location_control();
        if !self.mounted || !(control.visible && control.enabled) {
            return false;
        }
        self.telemetry.location_button_clicked();
        self.fly_to.fly_to_current_location(&self.locator, &mut self.engine)
    }

    pub fn center(&self) -> LatLng {
        self.engine.center()
    }

    pub fn zoom(&self) -> f64 {
        self.engine.zoom()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn markers(&self) -> &MarkerRegistry<R::Handle> {
        &self.markers
    }

    pub fn config(&self) -> &MapViewConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Releases every marker, detaches every listener and the surface.
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        let released = self.markers.clear(&mut self.renderer);
        for listener in self.listeners.drain(..) {
            self.engine.off(listener);
        }
        self.pending = FuturesUnordered::new();
        self.expansion.reset();
        self.detail.close();
        self.engine.remove();

        log::info!("map view unmounted, {} markers released", released);
    }
}

impl<E, R> Drop for MapView<E, R>
where
    E: MapEngine,
    R: MarkerRenderer,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
