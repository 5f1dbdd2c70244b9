pub mod clustering;
pub mod index;

pub use clustering::{Cluster, ClusterEntry, ClusterId, ClusterIndex, ClusterView};
pub use index::{SpatialIndex, SpatialItem};
