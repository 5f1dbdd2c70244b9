pub mod marker;
pub mod registry;

pub use marker::{Marker, MarkerRenderer};
pub use registry::{MarkerRegistry, ReconcileReport};
