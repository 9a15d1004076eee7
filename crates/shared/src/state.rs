//! Owned map state: the only place that mutates the marker layer.
//!
//! Data and filter changes rebuild the cluster index and bump the
//! generation; viewport changes only re-query it.

use crate::cluster::{ClusterIndex, ClusterOptions};
use crate::filter::{apply_filters, compute_fit_bounds, regions, FitBounds};
use crate::geo::{prepare_points, CoordinateBounds, Rejection, NETHERLANDS};
use crate::heat::{HeatLayer, HeatmapMode};
use crate::markers::{LabelContext, MarkerFactory, MarkerHandle, MarkerLayer, ReconcileStats};
use crate::models::{ClusterFeature, ClusterId, FilterState, GeoPoint, GeoPointInput, LngLat};
use crate::viewport::{ViewKey, ViewportState};

#[derive(Debug, Clone, PartialEq)]
pub struct PointsUpdate {
    pub accepted: usize,
    pub rejected: Vec<(String, Rejection)>,
    /// Points left after the current filter.
    pub visible: usize,
}

/// Where the camera should go after a cluster click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterExpansion {
    pub zoom: f64,
    pub center: LngLat,
}

pub struct MapState<H: MarkerHandle> {
    options: ClusterOptions,
    bounds: CoordinateBounds,
    filter: FilterState,
    mode: HeatmapMode,
    points: Vec<GeoPoint>,
    filtered: Vec<GeoPoint>,
    index: ClusterIndex,
    generation: u64,
    features: Vec<ClusterFeature>,
    view: Option<ViewKey>,
    markers: MarkerLayer<H>,
}

impl<H: MarkerHandle> MapState<H> {
    pub fn new(options: ClusterOptions) -> Self {
        Self::with_bounds(options, NETHERLANDS)
    }

    pub fn with_bounds(options: ClusterOptions, bounds: CoordinateBounds) -> Self {
        MapState {
            options,
            bounds,
            filter: FilterState::default(),
            mode: HeatmapMode::default(),
            points: Vec::new(),
            filtered: Vec::new(),
            index: ClusterIndex::default(),
            generation: 0,
            features: Vec::new(),
            view: None,
            markers: MarkerLayer::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn mode(&self) -> HeatmapMode {
        self.mode
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn filtered(&self) -> &[GeoPoint] {
        &self.filtered
    }

    pub fn visible_count(&self) -> usize {
        self.filtered.len()
    }

    /// Features from the last index query.
    pub fn features(&self) -> &[ClusterFeature] {
        &self.features
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn point(&self, id: &str) -> Option<&GeoPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn regions(&self) -> Vec<String> {
        regions(&self.points)
    }

    /// Replace the data set. Invalid records are dropped and reported.
    pub fn set_points(&mut self, inputs: &[GeoPointInput]) -> PointsUpdate {
        let prepared = prepare_points(inputs, &self.bounds);
        self.points = prepared.points;
        self.rebuild();
        PointsUpdate {
            accepted: self.points.len(),
            rejected: prepared.rejected,
            visible: self.filtered.len(),
        }
    }

    /// Apply a new filter, rebuilding only if it differs from the current one.
    pub fn set_filter(&mut self, filter: FilterState) -> usize {
        if filter != self.filter {
            self.filter = filter;
            self.rebuild();
        }
        self.filtered.len()
    }

    pub fn set_mode(&mut self, mode: HeatmapMode) {
        self.mode = mode;
    }

    fn rebuild(&mut self) {
        self.filtered = apply_filters(&self.points, &self.filter);
        self.index = ClusterIndex::build(self.filtered.clone(), self.options);
        self.generation += 1;
        self.features.clear();
        self.view = None;
        tracing::debug!(
            generation = self.generation,
            total = self.points.len(),
            visible = self.filtered.len(),
            "Rebuilt cluster index"
        );
    }

    /// Bring mounted markers in line with the viewport.
    ///
    /// The index is only re-queried when the generation, bbox or integer zoom
    /// changed; labels always follow the fractional zoom and width.
    pub fn render<F>(&mut self, viewport: &ViewportState, factory: &mut F) -> ReconcileStats
    where
        F: MarkerFactory<Handle = H>,
    {
        if !self.mode.shows_markers() {
            let destroyed = self.markers.clear();
            self.view = None;
            return ReconcileStats {
                destroyed,
                ..ReconcileStats::default()
            };
        }

        let key = ViewKey {
            generation: self.generation,
            bbox: viewport.bbox,
            level: self.index.level_for_zoom(viewport.zoom),
        };
        if self.view != Some(key) {
            self.features = self.index.query(&viewport.bbox, viewport.zoom);
            self.view = Some(key);
        }

        let ctx = LabelContext {
            zoom: viewport.zoom,
            viewport_width_px: viewport.width_px,
            generation: self.generation,
        };
        let stats = self.markers.reconcile(&self.features, &ctx, factory);
        if !stats.is_noop() {
            tracing::debug!(
                created = stats.created,
                updated = stats.updated,
                destroyed = stats.destroyed,
                "Reconciled markers"
            );
        }
        stats
    }

    /// Zoom target for a clicked cluster.
    ///
    /// `None` when the click came from an older generation or the id is
    /// unknown, so stale markers do nothing.
    pub fn expand_cluster(&self, cluster_id: ClusterId, generation: u64) -> Option<ClusterExpansion> {
        if generation != self.generation {
            tracing::debug!(cluster_id, generation, current = self.generation, "Ignoring stale cluster click");
            return None;
        }
        let zoom = self.index.expansion_zoom(cluster_id)?;
        let center = match self
            .features
            .iter()
            .find(|f| f.cluster_id() == Some(cluster_id))
        {
            Some(f) => f.coordinates(),
            None => {
                let members = self.index.leaves(cluster_id, usize::MAX, 0)?;
                if members.is_empty() {
                    return None;
                }
                let n = members.len() as f64;
                LngLat::new(
                    members.iter().map(|p| p.longitude).sum::<f64>() / n,
                    members.iter().map(|p| p.latitude).sum::<f64>() / n,
                )
            }
        };
        Some(ClusterExpansion {
            zoom: zoom as f64,
            center,
        })
    }

    /// Density layer for the filtered set, or `None` when the mode hides it.
    pub fn heat_layer(&self) -> Option<HeatLayer> {
        self.mode
            .shows_heatmap()
            .then(|| HeatLayer::from_points(&self.filtered))
    }

    pub fn fit_bounds(&self) -> Option<FitBounds> {
        compute_fit_bounds(&self.filtered)
    }

    /// Destroy every marker. Used on teardown.
    pub fn clear(&mut self) -> usize {
        self.view = None;
        self.features.clear();
        self.markers.clear()
    }
}
