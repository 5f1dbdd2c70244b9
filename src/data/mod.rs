pub mod feed;
pub mod fields;
pub mod geojson;

pub use feed::FeatureFeed;
pub use fields::{FieldFormat, FieldFormatters};
pub use geojson::{Feature, FeatureCollection, FeatureId};
