pub mod controls;
pub mod popup;

pub use controls::{
    FlyToController, GpsIcon, GpsLocator, LocationControl, LocationReading, LocationStatus,
};

pub use popup::{DetailView, PhotoDetailPresenter, SelectedFeature};
