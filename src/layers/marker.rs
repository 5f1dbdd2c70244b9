use crate::core::geo::LatLng;
use crate::data::geojson::{Feature, FeatureId};
use crate::prelude::{HashMap, HashSet};
use std::sync::Arc;

/// Markers are keyed by the identifier of the photo they show
pub type MarkerId = FeatureId;

/// A thumbnail or main image could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load image {url}: {reason}")]
pub struct ImageLoadError {
    pub url: String,
    pub reason: String,
}

impl ImageLoadError {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// What a renderer needs to build the visual element of a marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub id: MarkerId,
    pub position: LatLng,
}

impl MarkerSpec {
    pub fn for_feature(feature: &Feature) -> Self {
        Self {
            id: feature.id.clone(),
            position: feature.coordinates,
        }
    }
}

/// Presentation capability that owns the visual side of markers.
///
/// Handles are consumed by [`MarkerRenderer::destroy`], so each visual
/// resource can only be released once.
pub trait MarkerRenderer {
    type Handle;

    fn create(&mut self, spec: &MarkerSpec) -> Self::Handle;

    fn set_image(&mut self, handle: &Self::Handle, url: &str) -> Result<(), ImageLoadError>;

    /// Routes clicks on the element back to the map view as `id`
    fn bind_click(&mut self, handle: &Self::Handle, id: &MarkerId);

    fn destroy(&mut self, handle: Self::Handle);
}

/// A visual element bound to one unclustered photo
#[derive(Debug)]
pub struct Marker<H> {
    feature: Arc<Feature>,
    handle: H,
    image: Option<String>,
}

impl<H> Marker<H> {
    /// Builds the element and loads its thumbnail, falling back to `placeholder`
    pub fn create<R>(renderer: &mut R, feature: Arc<Feature>, placeholder: &str) -> Self
    where
        R: MarkerRenderer<Handle = H>,
    {
        let handle = renderer.create(&MarkerSpec::for_feature(&feature));

        let loaded = match feature.properties.thumbnail() {
            Some(url) => match renderer.set_image(&handle, url) {
                Ok(()) => Some(url.to_string()),
                Err(err) => {
                    log::warn!("marker {}: {}, using placeholder", feature.id, err);
                    None
                }
            },
            None => {
                log::warn!("marker {} has no thumbnail, using placeholder", feature.id);
                None
            }
        };
        let image = loaded.or_else(|| match renderer.set_image(&handle, placeholder) {
            Ok(()) => Some(placeholder.to_string()),
            Err(err) => {
                log::warn!("marker {}: {}", feature.id, err);
                None
            }
        });

        renderer.bind_click(&handle, &feature.id);
        Self { feature, handle, image }
    }

    pub fn id(&self) -> &MarkerId {
        &self.feature.id
    }

    pub fn position(&self) -> LatLng {
        self.feature.coordinates
    }

    pub fn feature(&self) -> &Arc<Feature> {
        &self.feature
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Image actually shown: the thumbnail, the placeholder, or nothing
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Releases the visual element
    pub fn destroy<R>(self, renderer: &mut R)
    where
        R: MarkerRenderer<Handle = H>,
    {
        renderer.destroy(self.handle);
    }
}

/// Handle of an element created by [`HeadlessMarkerRenderer`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HeadlessHandle(u64);

impl HeadlessHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// State of one live element of the headless renderer
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMarker {
    pub id: MarkerId,
    pub position: LatLng,
    pub image: Option<String>,
    pub click_target: Option<MarkerId>,
}

/// Renderer keeping marker elements in memory, with injectable image failures
#[derive(Debug, Default)]
pub struct HeadlessMarkerRenderer {
    next: u64,
    live: HashMap<u64, HeadlessMarker>,
    failing: HashSet<String>,
    created: usize,
    destroyed: usize,
}

impl HeadlessMarkerRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later load of `url` fail
    pub fn fail_image(&mut self, url: impl Into<String>) {
        self.failing.insert(url.into());
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }

    pub fn element(&self, handle: &HeadlessHandle) -> Option<&HeadlessMarker> {
        self.live.get(&handle.0)
    }

    pub fn elements(&self) -> impl Iterator<Item = &HeadlessMarker> {
        self.live.values()
    }
}

impl MarkerRenderer for HeadlessMarkerRenderer {
    type Handle = HeadlessHandle;

    fn create(&mut self, spec: &MarkerSpec) -> HeadlessHandle {
        self.next += 1;
        self.created += 1;
        self.live.insert(
            self.next,
            HeadlessMarker {
                id: spec.id.clone(),
                position: spec.position,
                image: None,
                click_target: None,
            },
        );
        HeadlessHandle(self.next)
    }

    fn set_image(&mut self, handle: &HeadlessHandle, url: &str) -> Result<(), ImageLoadError> {
        if self.failing.contains(url) {
            return Err(ImageLoadError::new(url, "unreachable"));
        }
        match self.live.get_mut(&handle.0) {
            Some(element) => {
                element.image = Some(url.to_string());
                Ok(())
            }
            None => Err(ImageLoadError::new(url, "element was destroyed")),
        }
    }

    fn bind_click(&mut self, handle: &HeadlessHandle, id: &MarkerId) {
        if let Some(element) = self.live.get_mut(&handle.0) {
            element.click_target = Some(id.clone());
        }
    }

    fn destroy(&mut self, handle: HeadlessHandle) {
        if self.live.remove(&handle.0).is_some() {
            self.destroyed += 1;
        } else {
            log::warn!("destroying unknown marker element {}", handle.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(id: &str, thumbnail: &str) -> Arc<Feature> {
        Arc::new(Feature::photo(id, LatLng::new(51.5, -0.1), thumbnail, "main.jpg"))
    }

    #[test]
    fn test_marker_loads_thumbnail_and_binds_click() {
        let mut renderer = HeadlessMarkerRenderer::new();
        let marker = Marker::create(&mut renderer, feature("p1", "thumb.jpg"), "logo.svg");

        assert_eq!(marker.image(), Some("thumb.jpg"));
        let element = renderer.element(marker.handle()).unwrap();
        assert_eq!(element.click_target, Some(FeatureId::new("p1")));
        assert_eq!(element.position, LatLng::new(51.5, -0.1));
    }

    #[test]
    fn test_thumbnail_failure_falls_back_to_placeholder() {
        let mut renderer = HeadlessMarkerRenderer::new();
        renderer.fail_image("broken.jpg");
        let marker = Marker::create(&mut renderer, feature("p1", "broken.jpg"), "logo.svg");

        assert_eq!(marker.image(), Some("logo.svg"));
        assert_eq!(
            renderer.element(marker.handle()).unwrap().image.as_deref(),
            Some("logo.svg")
        );
    }

    #[test]
    fn test_both_images_failing_still_creates_marker() {
        let mut renderer = HeadlessMarkerRenderer::new();
        renderer.fail_image("broken.jpg");
        renderer.fail_image("logo.svg");
        let marker = Marker::create(&mut renderer, feature("p1", "broken.jpg"), "logo.svg");

        assert_eq!(marker.image(), None);
        assert_eq!(renderer.live(), 1);
    }

    #[test]
    fn test_destroy_releases_element() {
        let mut renderer = HeadlessMarkerRenderer::new();
        let marker = Marker::create(&mut renderer, feature("p1", "thumb.jpg"), "logo.svg");
        marker.destroy(&mut renderer);

        assert_eq!(renderer.live(), 0);
        assert_eq!(renderer.created(), 1);
        assert_eq!(renderer.destroyed(), 1);
    }
}
