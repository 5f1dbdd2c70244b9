use crate::core::geo::LatLng;
use crate::data::fields::{DetailRow, FieldFormatters};
use crate::data::geojson::{Feature, FeatureId, PhotoProperties};

/// Copy of a photo taken when its marker was clicked.
///
/// Owning the data keeps an open detail view intact when the marker that
/// opened it is reconciled away.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFeature {
    pub id: FeatureId,
    pub coordinates: LatLng,
    pub properties: PhotoProperties,
}

impl From<&Feature> for SelectedFeature {
    fn from(feature: &Feature) -> Self {
        Self {
            id: feature.id.clone(),
            coordinates: feature.coordinates,
            properties: feature.properties.clone(),
        }
    }
}

/// Content of the open detail dialog
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub feature: SelectedFeature,
    /// Main image, or the placeholder once it failed to load
    pub image: String,
    pub image_failed: bool,
    pub rows: Vec<DetailRow>,
}

/// Opens and closes the photo detail dialog; at most one photo at a time
#[derive(Debug)]
pub struct PhotoDetailPresenter {
    formatters: FieldFormatters,
    placeholder: String,
    current: Option<DetailView>,
}

impl PhotoDetailPresenter {
    pub fn new(formatters: FieldFormatters, placeholder: impl Into<String>) -> Self {
        Self {
            formatters,
            placeholder: placeholder.into(),
            current: None,
        }
    }

    /// Shows a photo, replacing whatever was open
    pub fn open(&mut self, feature: &Feature) -> &DetailView {
        let feature = SelectedFeature::from(feature);
        let (image, image_failed) = match feature.properties.main() {
            Some(url) => (url.to_string(), false),
            None => {
                log::warn!("photo {} has no main image", feature.id);
                (self.placeholder.clone(), true)
            }
        };
        let rows = self.formatters.rows(&feature.properties);

        log::debug!("opening photo {}", feature.id);
        self.current.insert(DetailView {
            feature,
            image,
            image_failed,
            rows,
        })
    }

    /// Swaps the main image for the placeholder after a load failure
    pub fn image_failed(&mut self) -> bool {
        match self.current.as_mut() {
            Some(view) if !view.image_failed => {
                log::warn!(
                    "main image {} of photo {} failed, using placeholder",
                    view.image,
                    view.feature.id
                );
                view.image = self.placeholder.clone();
                view.image_failed = true;
                true
            }
            _ => false,
        }
    }

    pub fn close(&mut self) -> Option<SelectedFeature> {
        self.current.take().map(|view| view.feature)
    }

    pub fn current(&self) -> Option<&DetailView> {
        self.current.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }
}
