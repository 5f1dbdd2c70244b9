use crate::core::geo::LatLng;
use crate::engine::{CameraOptions, ClusterError};
use crate::spatial::clustering::{Cluster, ClusterId};

/// Whether a cluster expansion is in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpansionState {
    Idle,
    Expanding {
        generation: u64,
        cluster: ClusterId,
        center: LatLng,
    },
}

/// Ticket of one expansion query; results carry it back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpansionTicket(u64);

impl ExpansionTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Zooms into a clicked cluster once its expansion zoom is known.
///
/// Every click starts a new generation; only the latest one can move the
/// camera, so a slow answer for an earlier click is dropped.
#[derive(Debug)]
pub struct ClusterExpansionController {
    state: ExpansionState,
    generation: u64,
}

impl ClusterExpansionController {
    pub fn new() -> Self {
        Self {
            state: ExpansionState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> ExpansionState {
        self.state
    }

    pub fn is_expanding(&self) -> bool {
        matches!(self.state, ExpansionState::Expanding { .. })
    }

    /// Starts an expansion for a clicked cluster, superseding any pending one
    pub fn begin(&mut self, cluster: &Cluster) -> ExpansionTicket {
        self.generation += 1;
        if let ExpansionState::Expanding { cluster: previous, .. } = self.state {
            log::debug!("cluster {} expansion superseded by {}", previous, cluster.id);
        }
        self.state = ExpansionState::Expanding {
            generation: self.generation,
            cluster: cluster.id,
            center: cluster.coordinates,
        };
        ExpansionTicket(self.generation)
    }

    /// Applies the answer of an expansion query.
    ///
    /// Returns the camera target when the answer belongs to the latest click
    /// and succeeded; superseded answers are ignored and failures go back to
    /// idle without moving the camera.
    pub fn finish(
        &mut self,
        ticket: ExpansionTicket,
        result: Result<f64, ClusterError>,
    ) -> Option<CameraOptions> {
        let ExpansionState::Expanding {
            generation,
            cluster,
            center,
        } = self.state
        else {
            log::debug!("expansion result {} arrived while idle", ticket.0);
            return None;
        };
        if generation != ticket.0 {
            log::debug!("discarding superseded expansion result {}", ticket.0);
            return None;
        }

        self.state = ExpansionState::Idle;
        match result {
            Ok(zoom) => Some(CameraOptions::center(center).with_zoom(zoom)),
            Err(err) => {
                log::warn!("cluster {} expansion dropped: {}", cluster, err);
                None
            }
        }
    }

    /// Forgets any pending expansion
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = ExpansionState::Idle;
    }
}

impl Default for ClusterExpansionController {
    fn default() -> Self {
        Self::new()
    }
}
