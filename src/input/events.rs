use crate::core::geo::{LatLng, Point};
use crate::data::geojson::Feature;
use crate::engine::RenderedFeature;
use instant::Instant;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notifications a map engine can deliver to registered listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The rendering surface is ready to accept data
    Load,
    Render,
    Zoom,
    MoveEnd,
    Click,
    MouseEnter,
    MouseLeave,
}

/// Handle of one listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// A listener registration: event kind, optionally scoped to one layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub kind: EventKind,
    pub layer: Option<String>,
}

impl Subscription {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, layer: None }
    }

    pub fn on_layer(kind: EventKind, layer: &str) -> Self {
        Self {
            kind,
            layer: Some(layer.to_string()),
        }
    }

    /// Whether an event of `kind` raised on `layer` reaches this listener
    pub fn matches(&self, kind: EventKind, layer: Option<&str>) -> bool {
        self.kind == kind
            && match (&self.layer, layer) {
                (None, _) => true,
                (Some(own), Some(layer)) => own == layer,
                (Some(_), None) => false,
            }
    }
}

/// Events delivered by the engine on the interaction thread
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Load,
    /// Features drawn by `layer` after the last frame
    Render {
        layer: String,
        features: Vec<Arc<Feature>>,
    },
    Zoom {
        zoom: f64,
        timestamp: Instant,
    },
    MoveEnd {
        center: LatLng,
        zoom: f64,
    },
    /// Pointer press on `layer`; `features` is what the layer drew under the
    /// pointer at the moment of the click
    Click {
        layer: String,
        point: Point,
        lat_lng: LatLng,
        features: Vec<RenderedFeature>,
    },
    MouseEnter {
        layer: String,
    },
    MouseLeave {
        layer: String,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Load => EventKind::Load,
            EngineEvent::Render { .. } => EventKind::Render,
            EngineEvent::Zoom { .. } => EventKind::Zoom,
            EngineEvent::MoveEnd { .. } => EventKind::MoveEnd,
            EngineEvent::Click { .. } => EventKind::Click,
            EngineEvent::MouseEnter { .. } => EventKind::MouseEnter,
            EngineEvent::MouseLeave { .. } => EventKind::MouseLeave,
        }
    }

    /// Layer the event was raised on, if it is layer-scoped
    pub fn layer(&self) -> Option<&str> {
        match self {
            EngineEvent::Render { layer, .. }
            | EngineEvent::Click { layer, .. }
            | EngineEvent::MouseEnter { layer }
            | EngineEvent::MouseLeave { layer } => Some(layer),
            _ => None,
        }
    }
}

/// Cursor shown over the rendering surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_scoped_subscription() {
        let sub = Subscription::on_layer(EventKind::Click, "clusters");
        assert!(sub.matches(EventKind::Click, Some("clusters")));
        assert!(!sub.matches(EventKind::Click, Some("unclustered-point")));
        assert!(!sub.matches(EventKind::Click, None));
        assert!(!sub.matches(EventKind::Render, Some("clusters")));
    }

    #[test]
    fn test_global_subscription_sees_every_layer() {
        let sub = Subscription::new(EventKind::MoveEnd);
        assert!(sub.matches(EventKind::MoveEnd, None));
        assert!(sub.matches(EventKind::MoveEnd, Some("anything")));
    }

    #[test]
    fn test_event_kind_and_layer() {
        let event = EngineEvent::MouseEnter {
            layer: "clusters".into(),
        };
        assert_eq!(event.kind(), EventKind::MouseEnter);
        assert_eq!(event.layer(), Some("clusters"));
        assert_eq!(EngineEvent::Load.layer(), None);
    }
}
