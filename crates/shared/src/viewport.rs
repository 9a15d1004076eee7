//! Camera maths on 512 px Web-Mercator tiles.
//!
//! These mirror what the map engine does internally so fit-to-bounds and
//! visible-area calculations can be tested without a canvas.

use serde::{Deserialize, Serialize};

use crate::filter::FitBounds;
use crate::geo::{lat_y, lng_x, x_lng, y_lat};
use crate::models::{BoundingBox, LngLat};

pub const TILE_SIZE_PX: f64 = 512.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: LngLat,
    pub zoom: f64,
}

/// What the host reports after every move/zoom/resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub bbox: BoundingBox,
    pub zoom: f64,
    pub width_px: f64,
}

/// Clustering only has to be re-queried when this changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewKey {
    pub generation: u64,
    pub bbox: BoundingBox,
    pub level: usize,
}

/// Camera that shows `fit.bounds` inside the container, zoom clamped to `fit.max_zoom`.
///
/// Returns `None` for a container that has not been laid out yet.
pub fn fit_camera(fit: &FitBounds, width: f64, height: f64) -> Option<Camera> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    let pad = fit.padding_px.max(0.0);
    let usable_w = if width > 2.0 * pad { width - 2.0 * pad } else { width };
    let usable_h = if height > 2.0 * pad { height - 2.0 * pad } else { height };

    let x0 = lng_x(fit.bounds.west);
    let x1 = lng_x(fit.bounds.east);
    let y0 = lat_y(fit.bounds.north);
    let y1 = lat_y(fit.bounds.south);
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();

    let zoom_for = |span: f64, px: f64| {
        if span <= 0.0 {
            f64::INFINITY
        } else {
            (px / (TILE_SIZE_PX * span)).log2()
        }
    };
    let zoom = zoom_for(dx, usable_w)
        .min(zoom_for(dy, usable_h))
        .clamp(0.0, fit.max_zoom);

    Some(Camera {
        center: LngLat::new(x_lng((x0 + x1) / 2.0), y_lat((y0 + y1) / 2.0)),
        zoom,
    })
}
