use crate::core::geo::LatLng;
use crate::engine::{CameraOptions, MapEngine};
use serde::{Deserialize, Serialize};

/// One sample of the device location stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    pub longitude: f64,
    pub latitude: f64,
    /// Device has connectivity
    pub online: bool,
    /// The fix is fresh
    pub updated: bool,
}

impl LocationReading {
    pub fn coordinates(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Icon of the recenter button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpsIcon {
    Fixed,
    Off,
}

/// Render state of the recenter button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationControl {
    pub visible: bool,
    pub enabled: bool,
    pub icon: GpsIcon,
}

/// Whether the map can be recentered on the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationStatus {
    Available(LatLng),
    Unavailable,
}

/// Last known device location and the signals derived from it
#[derive(Debug, Clone, Default)]
pub struct GpsLocator {
    reading: Option<LocationReading>,
    welcome_shown: bool,
}

impl GpsLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reading(mut self, reading: LocationReading) -> Self {
        self.reading = Some(reading);
        self
    }

    pub fn update(&mut self, reading: LocationReading) {
        if !reading.coordinates().is_valid() {
            log::warn!(
                "ignoring location reading outside the world: {}, {}",
                reading.latitude,
                reading.longitude
            );
            return;
        }
        self.reading = Some(reading);
    }

    /// The button only appears once the welcome screen is dismissed
    pub fn set_welcome_shown(&mut self, shown: bool) {
        self.welcome_shown = shown;
    }

    pub fn reading(&self) -> Option<&LocationReading> {
        self.reading.as_ref()
    }

    pub fn is_online(&self) -> bool {
        self.reading.map(|r| r.online).unwrap_or(false)
    }

    pub fn is_updated(&self) -> bool {
        self.reading.map(|r| r.updated).unwrap_or(false)
    }

    pub fn status(&self) -> LocationStatus {
        match self.reading {
            Some(reading) if reading.updated => LocationStatus::Available(reading.coordinates()),
            _ => LocationStatus::Unavailable,
        }
    }

    pub fn control(&self) -> LocationControl {
        LocationControl {
            visible: self.welcome_shown,
            enabled: self.is_updated(),
            icon: if self.is_online() {
                GpsIcon::Fixed
            } else {
                GpsIcon::Off
            },
        }
    }
}

/// Recenters the camera on the last fresh location
#[derive(Debug, Clone, Copy, Default)]
pub struct FlyToController;

impl FlyToController {
    pub fn new() -> Self {
        Self
    }

    /// Camera target for the current location, keeping the zoom
    pub fn target(&self, locator: &GpsLocator) -> Option<CameraOptions> {
        match locator.status() {
            LocationStatus::Available(center) => Some(CameraOptions::center(center)),
            LocationStatus::Unavailable => None,
        }
    }

    /// Starts the flight; returns false when no fresh location is known
    pub fn fly_to_current_location<E: MapEngine>(
        &self,
        locator: &GpsLocator,
        engine: &mut E,
    ) -> bool {
        match self.target(locator) {
            Some(camera) => {
                log::debug!("flying to current location {}", camera.center);
                engine.fly_to(camera);
                true
            }
            None => {
                log::debug!("recenter requested without a fresh location");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(online: bool, updated: bool) -> LocationReading {
        LocationReading {
            longitude: -0.12,
            latitude: 51.5,
            online,
            updated,
        }
    }

    #[test]
    fn test_control_signals_are_independent() {
        let mut locator = GpsLocator::new().with_reading(reading(false, true));
        locator.set_welcome_shown(true);
        assert_eq!(
            locator.control(),
            LocationControl {
                visible: true,
                enabled: true,
                icon: GpsIcon::Off,
            }
        );

        locator.update(reading(true, false));
        let control = locator.control();
        assert!(!control.enabled);
        assert_eq!(control.icon, GpsIcon::Fixed);
    }

    #[test]
    fn test_hidden_until_welcome_dismissed() {
        let locator = GpsLocator::new().with_reading(reading(true, true));
        assert!(!locator.control().visible);
    }

    #[test]
    fn test_no_reading_is_unavailable() {
        let locator = GpsLocator::new();
        assert_eq!(locator.status(), LocationStatus::Unavailable);
        assert!(FlyToController::new().target(&locator).is_none());
        assert_eq!(locator.control().icon, GpsIcon::Off);
    }

    #[test]
    fn test_target_keeps_zoom() {
        let locator = GpsLocator::new().with_reading(reading(true, true));
        let camera = FlyToController::new().target(&locator).unwrap();
        assert_eq!(camera.center, LatLng::new(51.5, -0.12));
        assert_eq!(camera.zoom, None);
    }

    #[test]
    fn test_invalid_reading_ignored() {
        let mut locator = GpsLocator::new().with_reading(reading(true, true));
        locator.update(LocationReading {
            longitude: 500.0,
            latitude: 0.0,
            online: true,
            updated: true,
        });
        assert_eq!(locator.reading().map(|r| r.longitude), Some(-0.12));
    }
}
