//! JSON option objects handed to Mapbox GL.
//!
//! Kept free of any browser types so they can be tested natively.

use serde_json::{json, Value};
use vacaturekaart_shared::heat::{intensity, HeatLayer};
use vacaturekaart_shared::models::LngLat;
use vacaturekaart_shared::viewport::Camera;

pub const HEAT_SOURCE_ID: &str = "vacatures-heat";
pub const HEAT_LAYER_ID: &str = "vacatures-heat-layer";

/// Duration of camera animations triggered by cluster clicks.
const EASE_DURATION_MS: u32 = 500;

/// Base `new mapboxgl.Map(...)` options. The container element is attached separately.
pub fn map_options(style_url: &str, camera: &Camera) -> Value {
    json!({
        "style": style_url,
        "center": [camera.center.lng, camera.center.lat],
        "zoom": camera.zoom,
        "attributionControl": true,
    })
}

pub fn ease_options(center: LngLat, zoom: f64) -> Value {
    json!({
        "center": [center.lng, center.lat],
        "zoom": zoom,
        "duration": EASE_DURATION_MS,
    })
}

/// GeoJSON payload for the heat source, one feature per point. Each feature
/// carries its weight already normalized against the current maximum.
pub fn heat_source_data(layer: &HeatLayer) -> Value {
    let features: Vec<Value> = layer
        .points
        .iter()
        .map(|[lat, lng, weight]| {
            json!({
                "type": "Feature",
                "properties": { "weight": weight, "intensity": intensity(*weight, layer.max) },
                "geometry": { "type": "Point", "coordinates": [lng, lat] }
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

pub fn heat_source(layer: &HeatLayer) -> Value {
    json!({ "type": "geojson", "data": heat_source_data(layer) })
}

/// Heatmap layer style. The gradient maps density through the fixed stop table.
pub fn heat_layer_style(layer: &HeatLayer) -> Value {
    let mut color: Vec<Value> = vec![
        json!("interpolate"),
        json!(["linear"]),
        json!(["heatmap-density"]),
    ];
    for (stop, c) in &layer.gradient {
        color.push(json!(stop));
        color.push(json!(c));
    }

    json!({
        "id": HEAT_LAYER_ID,
        "type": "heatmap",
        "source": HEAT_SOURCE_ID,
        "paint": {
            "heatmap-weight": ["get", "intensity"],
            // Mapbox has no separate blur; the kernel extent covers both.
            "heatmap-radius": layer.radius_px + layer.blur_px,
            "heatmap-color": color,
            "heatmap-opacity": 0.8
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vacaturekaart_shared::models::GeoPoint;

    fn point(id: &str, lat: f64, lng: f64, weight: u32) -> GeoPoint {
        GeoPoint {
            id: id.to_string(),
            label: id.to_string(),
            latitude: lat,
            longitude: lng,
            weight,
            region: "Utrecht".to_string(),
            items: vec![],
        }
    }

    #[test]
    fn test_heat_source_swaps_to_lng_lat() {
        let layer = HeatLayer::from_points(&[point("a", 52.09, 5.12, 4)]);
        let data = heat_source_data(&layer);
        assert_eq!(data["features"][0]["geometry"]["coordinates"], json!([5.12, 52.09]));
        assert_eq!(data["features"][0]["properties"]["weight"], 4.0);
        assert_eq!(data["features"][0]["properties"]["intensity"], 1.0);
    }

    #[test]
    fn test_heat_intensity_follows_current_max() {
        let layer = HeatLayer::from_points(&[point("a", 52.0, 5.0, 2), point("b", 52.1, 5.1, 8)]);
        let data = heat_source_data(&layer);
        assert_eq!(data["features"][0]["properties"]["intensity"], 0.25);
        assert_eq!(data["features"][1]["properties"]["intensity"], 1.0);
    }

    #[test]
    fn test_heat_style_reads_intensity_and_gradient() {
        let layer = HeatLayer::from_points(&[point("a", 52.0, 5.0, 2), point("b", 52.1, 5.1, 10)]);
        let style = heat_layer_style(&layer);
        assert_eq!(style["paint"]["heatmap-weight"], json!(["get", "intensity"]));
        assert_eq!(style["paint"]["heatmap-radius"], 40.0);
        // 3 header entries + 2 per gradient stop
        assert_eq!(style["paint"]["heatmap-color"].as_array().unwrap().len(), 3 + 12);
        assert_eq!(style["source"], HEAT_SOURCE_ID);
    }

    #[test]
    fn test_map_options_center_is_lng_lat() {
        let camera = Camera {
            center: LngLat::new(5.3, 52.2),
            zoom: 6.5,
        };
        let options = map_options("mapbox://styles/mapbox/light-v11", &camera);
        assert_eq!(options["center"], json!([5.3, 52.2]));
        assert_eq!(options["zoom"], 6.5);
    }

    #[test]
    fn test_ease_options() {
        let options = ease_options(LngLat::new(5.0, 52.0), 9.0);
        assert_eq!(options["center"], json!([5.0, 52.0]));
        assert_eq!(options["zoom"], 9.0);
    }
}
