use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};

/// Easing curves used by camera transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EasingFunction {
    EaseOutQuad,
    EaseInOutCubic,
}

impl EasingFunction {
    /// Apply the easing function to a normalized time value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingFunction::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            EasingFunction::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Interpolation helpers
pub struct Interpolation;

impl Interpolation {
    pub fn linear(start: f64, end: f64, t: f64) -> f64 {
        start + (end - start) * t
    }

    pub fn lat_lng(start: &LatLng, end: &LatLng, t: f64) -> LatLng {
        LatLng::new(
            Self::linear(start.lat, end.lat, t),
            Self::linear(start.lng, end.lng, t),
        )
    }

    /// Spherical interpolation for geographical coordinates (great circle path)
    pub fn slerp_lat_lng(start: &LatLng, end: &LatLng, t: f64) -> LatLng {
        let to_cartesian = |c: &LatLng| {
            let (lat, lng) = (c.lat.to_radians(), c.lng.to_radians());
            (lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin())
        };
        let a = to_cartesian(start);
        let b = to_cartesian(end);

        let dot = a.0 * b.0 + a.1 * b.1 + a.2 * b.2;
        let theta = dot.clamp(-1.0, 1.0).acos();
        if theta.abs() < 1e-6 {
            return Self::lat_lng(start, end, t);
        }

        let sin_theta = theta.sin();
        let wa = ((1.0 - t) * theta).sin() / sin_theta;
        let wb = (t * theta).sin() / sin_theta;
        let (x, y, z) = (
            wa * a.0 + wb * b.0,
            wa * a.1 + wb * b.1,
            wa * a.2 + wb * b.2,
        );

        LatLng::new(z.asin().to_degrees(), y.atan2(x).to_degrees())
    }
}
