use crate::animation::interpolation::{EasingFunction, Interpolation};
use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Types of camera transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Short, direct pan + zoom
    Ease,
    /// Longer flight that zooms out mid-way when travelling far
    Fly,
}

/// State of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Running,
    Completed,
    Cancelled,
}

/// Camera position produced by one animation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub center: LatLng,
    pub zoom: f64,
}

/// An animated move of the camera between two positions
#[derive(Debug, Clone)]
pub struct CameraTransition {
    pub kind: TransitionKind,
    pub easing: EasingFunction,
    pub state: TransitionState,
    pub start: CameraFrame,
    pub target: CameraFrame,
    duration: Duration,
    elapsed: Duration,
    /// Zoom levels given up at the apex of a flight
    flight_dip: f64,
}

impl CameraTransition {
    pub fn new(
        kind: TransitionKind,
        start: CameraFrame,
        target: CameraFrame,
        duration: Duration,
    ) -> Self {
        let flight_dip = match kind {
            TransitionKind::Ease => 0.0,
            TransitionKind::Fly => {
                let a = start.center.to_unit_mercator();
                let b = target.center.to_unit_mercator();
                // distance in tiles at the start zoom
                let tiles = a.distance_to(&b) * 2_f64.powf(start.zoom);
                (1.0 + tiles).log2().min(2.0)
            }
        };

        Self {
            kind,
            easing: match kind {
                TransitionKind::Ease => EasingFunction::EaseOutQuad,
                TransitionKind::Fly => EasingFunction::EaseInOutCubic,
            },
            state: TransitionState::Running,
            start,
            target,
            duration,
            elapsed: Duration::ZERO,
            flight_dip,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state != TransitionState::Running
    }

    pub fn cancel(&mut self) {
        if self.state == TransitionState::Running {
            self.state = TransitionState::Cancelled;
        }
    }

    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Advances the clock and returns the camera for the new time
    pub fn advance(&mut self, dt: Duration) -> CameraFrame {
        if self.state != TransitionState::Running {
            return self.frame_at(self.progress());
        }

        self.elapsed = (self.elapsed + dt).min(self.duration);
        let progress = self.progress();
        if progress >= 1.0 {
            self.state = TransitionState::Completed;
            return self.target;
        }
        self.frame_at(progress)
    }

    fn frame_at(&self, progress: f64) -> CameraFrame {
        let t = self.easing.apply(progress);
        match self.kind {
            TransitionKind::Ease => CameraFrame {
                center: Interpolation::lat_lng(&self.start.center, &self.target.center, t),
                zoom: Interpolation::linear(self.start.zoom, self.target.zoom, t),
            },
            TransitionKind::Fly => {
                let base = Interpolation::linear(self.start.zoom, self.target.zoom, t);
                // parabolic arc peaking half way
                let arc = 4.0 * t * (1.0 - t);
                CameraFrame {
                    center: Interpolation::slerp_lat_lng(
                        &self.start.center,
                        &self.target.center,
                        t,
                    ),
                    zoom: base - self.flight_dip * arc,
                }
            }
        }
    }
}
