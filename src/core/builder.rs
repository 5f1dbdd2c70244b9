//! Map view builder for fluent configuration
//!
//! Collects the configuration, capabilities and initial location of a map
//! view, derives the initial camera from them and mounts the view on an
//! engine.

use crate::{
    core::{
        config::MapViewConfig,
        geo::{LatLng, Point},
        map::{Capabilities, MapView, PlatformFlags},
        viewport::Viewport,
    },
    data::fields::FieldFormatters,
    engine::{HeadlessEngine, MapEngine},
    layers::marker::{HeadlessMarkerRenderer, MarkerRenderer},
    telemetry::{LogSink, TelemetrySink},
    ui::controls::{GpsLocator, LocationReading},
    Result,
};
use std::path::Path;

/// Builder for creating and configuring MapView instances
pub struct MapViewBuilder {
    config: MapViewConfig,
    telemetry: Option<Box<dyn TelemetrySink>>,
    platform: PlatformFlags,
    location: Option<LocationReading>,
    welcome_shown: bool,
    formatters: Option<FieldFormatters>,
}

impl MapViewBuilder {
    pub fn new() -> Self {
        Self {
            config: MapViewConfig::default(),
            telemetry: None,
            platform: PlatformFlags::default(),
            location: None,
            welcome_shown: false,
            formatters: None,
        }
    }

    pub fn with_config(mut self, config: MapViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a JSON file
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = MapViewConfig::from_path(path)?;
        Ok(self)
    }

    /// Set the fallback center and zoom used without a fresh location
    pub fn with_center_and_zoom(mut self, center: LatLng, zoom: f64) -> Self {
        self.config.initial_center = center;
        self.config.initial_zoom = zoom;
        self
    }

    pub fn with_viewport_size(mut self, size: Point) -> Self {
        self.config.viewport_size = size;
        self
    }

    /// Set cluster radius (pixels) and the last zoom that clusters
    pub fn with_clustering(mut self, radius: f64, max_zoom: u8) -> Self {
        self.config.cluster.radius = radius;
        self.config.cluster.max_zoom = max_zoom;
        self
    }

    pub fn with_telemetry<S: TelemetrySink + 'static>(mut self, sink: S) -> Self {
        self.telemetry = Some(Box::new(sink));
        self
    }

    pub fn with_platform(mut self, platform: PlatformFlags) -> Self {
        self.platform = platform;
        self
    }

    /// Enable the pointer cursor over cluster glyphs
    pub fn with_hover_cursor(mut self, enabled: bool) -> Self {
        self.platform.hover_cursor = enabled;
        self
    }

    pub fn with_location(mut self, reading: LocationReading) -> Self {
        self.location = Some(reading);
        self
    }

    pub fn with_welcome_shown(mut self, shown: bool) -> Self {
        self.welcome_shown = shown;
        self
    }

    /// Use custom detail field formatters instead of the configured ones
    pub fn with_formatters(mut self, formatters: FieldFormatters) -> Self {
        self.formatters = Some(formatters);
        self
    }

    pub fn config(&self) -> &MapViewConfig {
        &self.config
    }

    fn locator(&self) -> GpsLocator {
        let mut locator = GpsLocator::new();
        if let Some(reading) = self.location {
            locator.update(reading);
        }
        locator.set_welcome_shown(self.welcome_shown);
        locator
    }

    /// Viewport the engine should be created with
    pub fn initial_viewport(&self) -> Viewport {
        let locator = self.locator();
        MapView::<HeadlessEngine, HeadlessMarkerRenderer>::initial_viewport(&self.config, &locator)
    }

    /// Mount on an engine created from [`MapViewBuilder::initial_viewport`]
    pub fn mount<E, R>(self, engine: E, renderer: R) -> Result<MapView<E, R>>
    where
        E: MapEngine,
        R: MarkerRenderer,
    {
        let locator = self.locator();
        let capabilities = Capabilities::new(self.telemetry.unwrap_or_else(|| Box::new(LogSink)))
            .with_platform(self.platform);

        let mut view = MapView::mount(engine, renderer, self.config, capabilities)?;
        if let Some(formatters) = self.formatters {
            view.set_formatters(formatters);
        }
        if let Some(reading) = locator.reading() {
            view.set_location(*reading);
        }
        view.set_welcome_shown(self.welcome_shown);
        Ok(view)
    }

    /// Mount on the in-process engine and marker renderer
    pub fn build_headless(self) -> Result<MapView<HeadlessEngine, HeadlessMarkerRenderer>> {
        self.config.validate()?;
        let engine = HeadlessEngine::new(self.initial_viewport())
            .with_animation(self.config.animation.clone());
        self.mount(engine, HeadlessMarkerRenderer::new())
    }
}

impl Default for MapViewBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NullSink;
    use crate::ui::controls::GpsIcon;

    #[test]
    fn test_builder_defaults() {
        let view = MapViewBuilder::new().with_telemetry(NullSink).build_headless().unwrap();
        assert_eq!(view.center(), LatLng::new(51.58, -0.07));
        assert_eq!(view.zoom(), 10.0);
        assert!(!view.location_control().visible);
    }

    #[test]
    fn test_builder_centers_on_fresh_location() {
        let view = MapViewBuilder::new()
            .with_telemetry(NullSink)
            .with_location(LocationReading {
                longitude: 2.35,
                latitude: 48.85,
                online: false,
                updated: true,
            })
            .with_welcome_shown(true)
            .build_headless()
            .unwrap();

        assert_eq!(view.center(), LatLng::new(48.85, 2.35));
        let control = view.location_control();
        assert!(control.visible && control.enabled);
        assert_eq!(control.icon, GpsIcon::Off);
    }

    #[test]
    fn test_invalid_config_fails_to_build() {
        let result = MapViewBuilder::new()
            .with_telemetry(NullSink)
            .with_clustering(0.0, 14)
            .build_headless();
        assert!(result.is_err());
    }

    #[test]
    fn test_initial_viewport_uses_configured_size() {
        let builder = MapViewBuilder::new()
            .with_center_and_zoom(LatLng::new(1.0, 2.0), 6.0)
            .with_viewport_size(Point::new(1024.0, 768.0));
        let viewport = builder.initial_viewport();
        assert_eq!(viewport.center, LatLng::new(1.0, 2.0));
        assert_eq!(viewport.zoom, 6.0);
        assert_eq!(viewport.size, Point::new(1024.0, 768.0));
    }
}
