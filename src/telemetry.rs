//! Analytics events emitted by the map view
//!
//! Events go to a [`TelemetrySink`] handed in at construction. Zoom changes
//! pass through [`ZoomTelemetryThrottle`] first; move-end reports do not.

use crate::core::config::TelemetryOptions;
use crate::core::geo::LatLng;
use crossbeam_channel::{unbounded, Receiver, Sender};
use instant::Instant;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed taxonomy of map telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelemetryAction {
    Zoom,
    MovedAtZoom,
    MovedAtLocation,
    ClusterClicked,
    LocationButtonClicked,
    PhotoOpened,
}

impl TelemetryAction {
    /// Event name as reported to analytics
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryAction::Zoom => "Zoom",
            TelemetryAction::MovedAtZoom => "Moved at zoom",
            TelemetryAction::MovedAtLocation => "Moved at location",
            TelemetryAction::ClusterClicked => "Cluster Clicked",
            TelemetryAction::LocationButtonClicked => "Location FAB clicked",
            TelemetryAction::PhotoOpened => "Photo Opened",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub action: TelemetryAction,
    pub category: String,
    pub label: Option<String>,
}

impl TelemetryEvent {
    pub fn new(
        action: TelemetryAction,
        category: impl Into<String>,
        label: Option<String>,
    ) -> Self {
        Self {
            action,
            category: category.into(),
            label,
        }
    }

    pub fn name(&self) -> &'static str {
        self.action.name()
    }
}

/// Destination of telemetry events
pub trait TelemetrySink {
    fn track(&self, event: TelemetryEvent);
}

/// Writes events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn track(&self, event: TelemetryEvent) {
        match &event.label {
            Some(label) => log::info!("[{}] {}: {}", event.category, event.name(), label),
            None => log::info!("[{}] {}", event.category, event.name()),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn track(&self, _event: TelemetryEvent) {}
}

/// Forwards events to a channel, typically drained by a test or an uploader
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<TelemetryEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<TelemetryEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl TelemetrySink for ChannelSink {
    fn track(&self, event: TelemetryEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("telemetry receiver dropped");
        }
    }
}

/// Rate limit for zoom-changed reports.
///
/// A zoom change is reported only when its rounded level differs from the
/// last reported level and the interval has elapsed since that report.
#[derive(Debug, Clone)]
pub struct ZoomTelemetryThrottle {
    interval: Duration,
    last_level: i32,
    last_reported: Instant,
}

impl ZoomTelemetryThrottle {
    /// Starts as if `initial_zoom` had been reported at `now`
    pub fn new(initial_zoom: f64, now: Instant, interval: Duration) -> Self {
        Self {
            interval,
            last_level: round_zoom(initial_zoom),
            last_reported: now,
        }
    }

    /// Returns the rounded level to report, if this change is reportable
    pub fn observe(&mut self, zoom: f64, at: Instant) -> Option<i32> {
        let level = round_zoom(zoom);
        if level == self.last_level {
            return None;
        }
        if at.saturating_duration_since(self.last_reported) < self.interval {
            return None;
        }
        self.last_level = level;
        self.last_reported = at;
        Some(level)
    }

    pub fn last_level(&self) -> i32 {
        self.last_level
    }
}

pub fn round_zoom(zoom: f64) -> i32 {
    zoom.round() as i32
}

/// Telemetry front of the map view: sink, category and zoom throttle
pub struct Telemetry {
    sink: Box<dyn TelemetrySink>,
    category: String,
    throttle: ZoomTelemetryThrottle,
}

impl Telemetry {
    pub fn new(
        sink: Box<dyn TelemetrySink>,
        options: &TelemetryOptions,
        initial_zoom: f64,
        now: Instant,
    ) -> Self {
        Self {
            sink,
            category: options.category.clone(),
            throttle: ZoomTelemetryThrottle::new(initial_zoom, now, options.zoom_interval()),
        }
    }

    fn track(&self, action: TelemetryAction, label: Option<String>) {
        self.sink
            .track(TelemetryEvent::new(action, self.category.as_str(), label));
    }

    /// Reports a zoom change if the throttle lets it through
    pub fn zoom_changed(&mut self, zoom: f64, at: Instant) -> bool {
        match self.throttle.observe(zoom, at) {
            Some(level) => {
                self.track(TelemetryAction::Zoom, Some(level.to_string()));
                true
            }
            None => false,
        }
    }

    /// Reports the camera after a completed move
    pub fn moved(&self, center: LatLng, zoom: f64) {
        self.track(TelemetryAction::MovedAtZoom, Some(round_zoom(zoom).to_string()));
        self.track(TelemetryAction::MovedAtLocation, Some(center.to_string()));
    }

    pub fn cluster_clicked(&self) {
        self.track(TelemetryAction::ClusterClicked, None);
    }

    pub fn location_button_clicked(&self) {
        self.track(TelemetryAction::LocationButtonClicked, None);
    }

    pub fn photo_opened(&self, id: &str) {
        self.track(TelemetryAction::PhotoOpened, Some(id.to_string()));
    }
}
