//! Zoom- and width-responsive marker text and sizing.
//!
//! Marker sizes depend only on the container width; zoom changes only the
//! scale transform, so the label never overflows its badge.

use serde::{Deserialize, Serialize};

/// Below this zoom every marker shows its abbreviation.
pub const LOW_ZOOM: f64 = 7.0;
/// Mobile widths keep abbreviations one zoom level longer.
pub const MOBILE_LOW_ZOOM: f64 = 8.0;
/// Below this zoom only very short names are shown in full.
pub const MEDIUM_ZOOM: f64 = 9.0;

pub const MOBILE_WIDTH_PX: f64 = 768.0;
pub const SMALL_WIDTH_PX: f64 = 360.0;
pub const TABLET_WIDTH_PX: f64 = 1024.0;

const MEDIUM_CAP_MOBILE: usize = 3;
const MEDIUM_CAP_DESKTOP: usize = 5;

const ELLIPSIS: char = '\u{2026}';

pub const SCALE_MIN: f64 = 0.85;
pub const SCALE_MAX: f64 = 1.0;
const SCALE_ZOOM_START: f64 = 6.0;
const SCALE_ZOOM_END: f64 = 12.0;

/// Fixed pixel geometry of a marker badge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSize {
    pub max_width_px: f64,
    pub height_px: f64,
    pub padding_px: f64,
    pub font_size_px: f64,
    pub border_radius_px: f64,
}

const SIZE_SMALL: MarkerSize = MarkerSize {
    max_width_px: 64.0,
    height_px: 20.0,
    padding_px: 4.0,
    font_size_px: 10.0,
    border_radius_px: 10.0,
};

const SIZE_MOBILE: MarkerSize = MarkerSize {
    max_width_px: 80.0,
    height_px: 22.0,
    padding_px: 6.0,
    font_size_px: 11.0,
    border_radius_px: 11.0,
};

const SIZE_TABLET: MarkerSize = MarkerSize {
    max_width_px: 100.0,
    height_px: 24.0,
    padding_px: 6.0,
    font_size_px: 12.0,
    border_radius_px: 12.0,
};

const SIZE_DESKTOP: MarkerSize = MarkerSize {
    max_width_px: 120.0,
    height_px: 26.0,
    padding_px: 8.0,
    font_size_px: 13.0,
    border_radius_px: 13.0,
};

fn is_mobile(width: f64) -> bool {
    width < MOBILE_WIDTH_PX
}

/// Two-letter abbreviation: `"Philips"` → `"PH"`, `"InnovatieHub Rotterdam"` → `"IR"`.
pub fn abbreviate(name: &str) -> String {
    let mut words = name.split_whitespace();
    let Some(first) = words.next() else {
        return "?".to_string();
    };
    match words.next() {
        Some(second) => first
            .chars()
            .take(1)
            .chain(second.chars().take(1))
            .flat_map(char::to_uppercase)
            .collect(),
        None => first.chars().take(2).flat_map(char::to_uppercase).collect(),
    }
}

/// Character cap for the full-name tier.
pub fn full_name_cap(width: f64) -> usize {
    if width < SMALL_WIDTH_PX {
        6
    } else if width < MOBILE_WIDTH_PX {
        8
    } else {
        12
    }
}

/// Truncate to `cap` characters, keeping `cap - 2` and appending an ellipsis.
fn truncate(name: &str, cap: usize) -> String {
    if name.chars().count() <= cap {
        return name.to_string();
    }
    let mut out: String = name.chars().take(cap.saturating_sub(2)).collect();
    out.push(ELLIPSIS);
    out
}

/// Marker text for `name` at the given zoom and container width.
pub fn compute_label(name: &str, zoom: f64, viewport_width_px: f64) -> String {
    let name = name.trim();
    let mobile = is_mobile(viewport_width_px);

    if zoom < LOW_ZOOM || (mobile && zoom < MOBILE_LOW_ZOOM) {
        return abbreviate(name);
    }

    if zoom < MEDIUM_ZOOM {
        let cap = if mobile {
            MEDIUM_CAP_MOBILE
        } else {
            MEDIUM_CAP_DESKTOP
        };
        return if !name.is_empty() && name.chars().count() <= cap {
            name.to_string()
        } else {
            abbreviate(name)
        };
    }

    if name.is_empty() {
        return abbreviate(name);
    }
    truncate(name, full_name_cap(viewport_width_px))
}

/// Badge geometry for the container width tier.
pub fn compute_marker_size(viewport_width_px: f64) -> MarkerSize {
    if viewport_width_px < SMALL_WIDTH_PX {
        SIZE_SMALL
    } else if viewport_width_px < MOBILE_WIDTH_PX {
        SIZE_MOBILE
    } else if viewport_width_px < TABLET_WIDTH_PX {
        SIZE_TABLET
    } else {
        SIZE_DESKTOP
    }
}

/// CSS scale applied to markers, ramping from 0.85 at zoom 6 to 1.0 at zoom 12.
pub fn compute_scale(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return SCALE_MIN;
    }
    let t = ((zoom - SCALE_ZOOM_START) / (SCALE_ZOOM_END - SCALE_ZOOM_START)).clamp(0.0, 1.0);
    SCALE_MIN + t * (SCALE_MAX - SCALE_MIN)
}
