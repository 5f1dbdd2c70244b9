use crate::core::{
    config::ClusterOptions,
    constants::{CLUSTERS_LAYER, CLUSTER_COUNT_LAYER, UNCLUSTERED_LAYER},
};
use crate::data::geojson::{Feature, FeatureCollection};
use crate::engine::{ExpansionZoomFuture, LayerSpec, MapEngine, RenderedFeature};
use crate::spatial::clustering::{Cluster, ClusterEntry, ClusterId};
use crate::{MapError, Result};
use std::sync::Arc;

/// The photo collection installed in the engine's clustering index
#[derive(Debug, Clone)]
pub struct ClusterSource {
    id: String,
    options: ClusterOptions,
    installed: bool,
}

impl ClusterSource {
    pub fn new(id: impl Into<String>, options: ClusterOptions) -> Self {
        Self {
            id: id.into(),
            options,
            installed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Installs the collection with clustering enabled, plus its three layers.
    ///
    /// Single shot, and only once the surface reported it is loaded. The
    /// source counts as installed as soon as the engine accepted it, so a
    /// failing layer leaves the source in place and a retry is rejected.
    pub fn initialize<E: MapEngine>(
        &mut self,
        engine: &mut E,
        features: FeatureCollection,
    ) -> Result<()> {
        if self.installed {
            return Err(MapError::SourceExists(self.id.clone()));
        }
        if !engine.is_loaded() {
            return Err(MapError::NotReady);
        }

        let count = features.len();
        engine.add_cluster_source(&self.id, features, &self.options)?;
        self.installed = true;

        for layer in [
            LayerSpec::Clusters {
                id: CLUSTERS_LAYER.to_string(),
                source: self.id.clone(),
                tiers: self.options.tiers.clone(),
            },
            LayerSpec::ClusterCount {
                id: CLUSTER_COUNT_LAYER.to_string(),
                source: self.id.clone(),
            },
            LayerSpec::Unclustered {
                id: UNCLUSTERED_LAYER.to_string(),
                source: self.id.clone(),
            },
        ] {
            engine.add_layer(layer)?;
        }

        log::info!(
            "installed {} photos in source '{}' (radius {}px, max zoom {})",
            count,
            self.id,
            self.options.radius,
            self.options.max_zoom
        );
        Ok(())
    }

    /// Photos drawn on screen outside any cluster glyph
    pub fn rendered_unclustered_features<E: MapEngine>(&self, engine: &E) -> Vec<Arc<Feature>> {
        engine
            .query_rendered_features(None, &[UNCLUSTERED_LAYER])
            .into_iter()
            .filter_map(|rendered| match rendered.entry {
                ClusterEntry::Feature(feature) => Some(feature),
                ClusterEntry::Cluster(_) => None,
            })
            .collect()
    }

    pub fn cluster_expansion_zoom<E: MapEngine>(
        &self,
        engine: &mut E,
        cluster: ClusterId,
    ) -> ExpansionZoomFuture {
        engine.cluster_expansion_zoom(&self.id, cluster)
    }
}

/// Topmost cluster glyph among the features hit by a click
pub fn clicked_cluster(features: &[RenderedFeature]) -> Option<Cluster> {
    features.iter().find_map(|rendered| match &rendered.entry {
        ClusterEntry::Cluster(cluster) => Some(cluster.clone()),
        ClusterEntry::Feature(_) => None,
    })
}
