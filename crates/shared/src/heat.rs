use serde::{Deserialize, Serialize};

use crate::models::GeoPoint;

/// Fixed colour ramp for the density overlay, from transparent to hot.
pub const HEAT_GRADIENT: [(f64, &str); 6] = [
    (0.0, "rgba(33,102,172,0)"),
    (0.2, "rgb(103,169,207)"),
    (0.4, "rgb(209,229,240)"),
    (0.6, "rgb(253,219,199)"),
    (0.8, "rgb(239,138,98)"),
    (1.0, "rgb(178,24,43)"),
];

pub const HEAT_RADIUS_PX: f64 = 25.0;
pub const HEAT_BLUR_PX: f64 = 15.0;

/// Which layers the map shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapMode {
    #[default]
    Markers,
    Heatmap,
    Both,
}

impl HeatmapMode {
    pub fn shows_markers(self) -> bool {
        matches!(self, HeatmapMode::Markers | HeatmapMode::Both)
    }

    pub fn shows_heatmap(self) -> bool {
        matches!(self, HeatmapMode::Heatmap | HeatmapMode::Both)
    }
}

/// `[lat, lng, weight]` triples, one per point.
pub fn build_heat_points(points: &[GeoPoint]) -> Vec<[f64; 3]> {
    points
        .iter()
        .map(|p| [p.latitude, p.longitude, p.weight as f64])
        .collect()
}

/// Largest weight in the set, never below 1 so normalization cannot divide by zero.
pub fn heat_max(points: &[GeoPoint]) -> f64 {
    points
        .iter()
        .map(|p| p.weight as f64)
        .fold(1.0, f64::max)
}

/// Weight normalized into [0, 1] against `max`.
pub fn intensity(weight: f64, max: f64) -> f64 {
    if max <= 0.0 || !weight.is_finite() {
        return 0.0;
    }
    (weight / max).clamp(0.0, 1.0)
}

/// Everything an engine needs to draw the density overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatLayer {
    pub points: Vec<[f64; 3]>,
    pub max: f64,
    pub radius_px: f64,
    pub blur_px: f64,
    pub gradient: Vec<(f64, String)>,
}

impl HeatLayer {
    /// Built fresh from the current filtered set; `max` follows the data.
    pub fn from_points(points: &[GeoPoint]) -> Self {
        HeatLayer {
            points: build_heat_points(points),
            max: heat_max(points),
            radius_px: HEAT_RADIUS_PX,
            blur_px: HEAT_BLUR_PX,
            gradient: HEAT_GRADIENT
                .iter()
                .map(|(stop, color)| (*stop, color.to_string()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
