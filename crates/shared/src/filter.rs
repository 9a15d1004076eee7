use serde::{Deserialize, Serialize};

use crate::geo::{prepare_points, CoordinateBounds};
use crate::models::{BoundingBox, FilterState, GeoPoint, GeoPointInput};

/// Degrees added on every side of the tight bounding box.
pub const FIT_PADDING_DEG: f64 = 0.02;
/// Fitting never zooms closer than this, so a lone company keeps some context.
pub const FIT_MAX_ZOOM: f64 = 12.0;
/// Screen padding handed to the engine when fitting.
pub const FIT_PADDING_PX: f64 = 40.0;

/// Viewport target produced for a non-empty point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitBounds {
    pub bounds: BoundingBox,
    pub max_zoom: f64,
    pub padding_px: f64,
}

/// Points matching the region and minimum-weight filter, in input order.
pub fn apply_filters(points: &[GeoPoint], filter: &FilterState) -> Vec<GeoPoint> {
    points.iter().filter(|p| filter.accepts(p)).cloned().collect()
}

/// Number of valid feed records the filter lets through. Works without a map.
pub fn count_visible(inputs: &[GeoPointInput], bounds: &CoordinateBounds, filter: &FilterState) -> usize {
    prepare_points(inputs, bounds)
        .points
        .iter()
        .filter(|p| filter.accepts(p))
        .count()
}

/// Padded bounds of `points`, or `None` when there is nothing to fit.
pub fn compute_fit_bounds(points: &[GeoPoint]) -> Option<FitBounds> {
    let first = points.first()?;
    let mut bounds = BoundingBox {
        west: first.longitude,
        south: first.latitude,
        east: first.longitude,
        north: first.latitude,
    };
    for p in &points[1..] {
        bounds.west = bounds.west.min(p.longitude);
        bounds.east = bounds.east.max(p.longitude);
        bounds.south = bounds.south.min(p.latitude);
        bounds.north = bounds.north.max(p.latitude);
    }

    Some(FitBounds {
        bounds: bounds.expand(FIT_PADDING_DEG),
        max_zoom: FIT_MAX_ZOOM,
        padding_px: FIT_PADDING_PX,
    })
}

/// Distinct non-empty regions, sorted, for the region selector.
pub fn regions(points: &[GeoPoint]) -> Vec<String> {
    let mut out: Vec<String> = points
        .iter()
        .map(|p| p.region.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}
