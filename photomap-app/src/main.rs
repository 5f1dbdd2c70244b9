use photomap::constants::CLUSTERS_LAYER;
use photomap::prelude::*;
use photomap::spatial::clustering::ClusterEntry;

const FRAME: Duration = Duration::from_millis(16);

/// Runs a scripted photo map session on the headless engine.
///
/// Usage: `photomap-app [features.geojson] [config.json]`
#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    photomap::init_logging();

    let mut args = std::env::args().skip(1);
    let features = args.next();
    let mut builder = MapViewBuilder::new()
        .with_welcome_shown(true)
        .with_hover_cursor(true);
    if let Some(config) = args.next() {
        builder = builder.with_config_file(config)?;
    }

    let mut view = builder.build_headless()?;
    view.engine_mut().load();
    view.pump();

    match features {
        Some(path) => view.load_features(&FileFeed::new(path)).await?,
        None => view.load_features(&StaticFeed::new(sample_photos())).await?,
    }
    view.engine_mut().advance(FRAME);
    view.pump();
    log::info!("{} markers after the first frame", view.markers().len());

    expand_largest_cluster(&mut view).await;

    let first_id = view.markers().ids().next().cloned();
    if let Some(id) = first_id {
        if let Some(detail) = view.handle_marker_click(&id) {
            for row in &detail.rows {
                log::info!("{} : {}", row.name, row.value);
            }
            log::info!("photo {} shows {}", detail.feature.id, detail.image);
        }
        view.close_detail();
    }

    view.set_location(LocationReading {
        longitude: -0.1276,
        latitude: 51.5072,
        online: true,
        updated: true,
    });
    if view.fly_to_current_location() {
        view.engine_mut().settle(FRAME);
        view.pump();
        log::info!(
            "recentered on {} with {} markers",
            view.center(),
            view.markers().len()
        );
    }

    view.teardown();
    log::info!(
        "session done: {} markers created, {} released",
        view.renderer().created(),
        view.renderer().destroyed()
    );
    Ok(())
}

/// Clicks the biggest drawn cluster and follows the camera to its expansion zoom
async fn expand_largest_cluster(view: &mut MapView<HeadlessEngine, HeadlessMarkerRenderer>) {
    let largest = view
        .engine()
        .query_rendered_features(None, &[CLUSTERS_LAYER])
        .into_iter()
        .filter_map(|rendered| match rendered.entry {
            ClusterEntry::Cluster(cluster) => Some(cluster),
            ClusterEntry::Feature(_) => None,
        })
        .max_by_key(|cluster| cluster.point_count);
    let Some(cluster) = largest else {
        log::info!("nothing clustered at zoom {:.1}", view.zoom());
        return;
    };

    log::info!(
        "expanding cluster of {} at {}",
        cluster.point_count,
        cluster.coordinates
    );
    let point = view.engine().viewport().lat_lng_to_pixel(&cluster.coordinates);
    view.engine_mut().click(point);
    view.pump();
    view.engine_mut().resolve_queries();

    if view.next_expansion().await == Some(true) {
        view.engine_mut().settle(FRAME);
        view.pump();
        log::info!(
            "zoomed to {:.1}, {} markers on screen",
            view.zoom(),
            view.markers().len()
        );
    }
}

/// A handful of photos around north London
fn sample_photos() -> FeatureCollection {
    let spots = [
        ("heron", 51.5890, -0.0700),
        ("kingfisher", 51.5895, -0.0690),
        ("egret", 51.5880, -0.0712),
        ("swan", 51.5600, -0.1200),
        ("coot", 51.6100, -0.0200),
        ("grebe", 51.5420, -0.1500),
    ];
    FeatureCollection::new(spots.iter().map(|(id, lat, lng)| {
        let mut photo = Feature::photo(
            id,
            LatLng::new(*lat, *lng),
            &format!("/photos/{}-thumb.jpg", id),
            &format!("/photos/{}.jpg", id),
        );
        photo.properties.insert("title", format!("A {}", id).into());
        photo
    }))
}
