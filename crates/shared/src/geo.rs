//! Coordinate validation and Web-Mercator projection.
//!
//! Feed records carry coordinates as numbers, numeric strings or null.
//! Anything that does not parse to a finite value inside the national
//! bounding box is rejected before it reaches clustering or rendering.

use std::collections::HashSet;
use std::f64::consts::PI;

use crate::models::{CoordinateValue, GeoPoint, GeoPointInput};

/// Axis-aligned validity box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// European Netherlands including the Wadden islands and South Limburg.
pub const NETHERLANDS: CoordinateBounds = CoordinateBounds {
    min_lat: 50.7,
    max_lat: 53.6,
    min_lng: 3.3,
    max_lng: 7.3,
};

impl CoordinateBounds {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

/// Why a feed record was excluded from the plotted set.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    MissingCoordinate,
    Unparseable(String),
    NotFinite,
    OutOfBounds { lat: f64, lng: f64 },
    DuplicateId,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingCoordinate => write!(f, "missing coordinate"),
            Rejection::Unparseable(raw) => write!(f, "unparseable coordinate {:?}", raw),
            Rejection::NotFinite => write!(f, "non-finite coordinate"),
            Rejection::OutOfBounds { lat, lng } => {
                write!(f, "coordinate ({}, {}) outside the national bounds", lat, lng)
            }
            Rejection::DuplicateId => write!(f, "duplicate id"),
        }
    }
}

/// Parse a single coordinate value.
///
/// Strings are trimmed; `"52,37"` is read as `52.37` when the string has no dot.
pub fn parse_coordinate(value: &CoordinateValue) -> Result<f64, Rejection> {
    let v = match value {
        CoordinateValue::Null => return Err(Rejection::MissingCoordinate),
        CoordinateValue::Number(n) => *n,
        CoordinateValue::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(Rejection::MissingCoordinate);
            }
            let normalized = if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
                trimmed.replace(',', ".")
            } else {
                trimmed.to_string()
            };
            normalized
                .parse::<f64>()
                .map_err(|_| Rejection::Unparseable(raw.clone()))?
        }
    };
    if !v.is_finite() {
        return Err(Rejection::NotFinite);
    }
    Ok(v)
}

/// Non-negative integer weight; NaN and negatives collapse to 0.
pub fn normalize_weight(raw: f64) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.floor().min(u32::MAX as f64) as u32
}

impl GeoPoint {
    /// Validate a feed record against `bounds`.
    pub fn from_input(input: &GeoPointInput, bounds: &CoordinateBounds) -> Result<GeoPoint, Rejection> {
        let lat = parse_coordinate(&input.lat)?;
        let lng = parse_coordinate(&input.lng)?;
        if !bounds.contains(lat, lng) {
            return Err(Rejection::OutOfBounds { lat, lng });
        }
        Ok(GeoPoint {
            id: input.id.clone(),
            label: input.name.clone(),
            latitude: lat,
            longitude: lng,
            weight: normalize_weight(input.weight),
            region: input.region.trim().to_string(),
            items: input.items.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedPoints {
    pub points: Vec<GeoPoint>,
    pub rejected: Vec<(String, Rejection)>,
}

/// Validate a whole feed. Order is preserved; the first record wins on duplicate ids.
pub fn prepare_points(inputs: &[GeoPointInput], bounds: &CoordinateBounds) -> PreparedPoints {
    let mut seen: HashSet<&str> = HashSet::with_capacity(inputs.len());
    let mut prepared = PreparedPoints::default();

    for input in inputs {
        let result = if seen.contains(input.id.as_str()) {
            Err(Rejection::DuplicateId)
        } else {
            GeoPoint::from_input(input, bounds)
        };
        match result {
            Ok(point) => {
                seen.insert(input.id.as_str());
                prepared.points.push(point);
            }
            Err(reason) => {
                tracing::warn!(id = %input.id, name = %input.name, %reason, "Skipping map point");
                prepared.rejected.push((input.id.clone(), reason));
            }
        }
    }

    prepared
}

/// Longitude to normalized Mercator x in [0, 1].
pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Latitude to normalized Mercator y in [0, 1] (0 = north).
pub fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, lat: CoordinateValue, lng: CoordinateValue) -> GeoPointInput {
        GeoPointInput {
            id: id.to_string(),
            name: format!("Bedrijf {}", id),
            lat,
            lng,
            region: "Utrecht".to_string(),
            weight: 3.0,
            items: vec![],
        }
    }

    #[test]
    fn test_parse_number_and_string() {
        assert_eq!(parse_coordinate(&52.37.into()), Ok(52.37));
        assert_eq!(parse_coordinate(&" 4.90 ".into()), Ok(4.90));
        assert_eq!(parse_coordinate(&"52,09".into()), Ok(52.09));
    }

    #[test]
    fn test_parse_rejects_null_and_garbage() {
        assert_eq!(
            parse_coordinate(&CoordinateValue::Null),
            Err(Rejection::MissingCoordinate)
        );
        assert_eq!(parse_coordinate(&"".into()), Err(Rejection::MissingCoordinate));
        assert!(matches!(
            parse_coordinate(&"abc".into()),
            Err(Rejection::Unparseable(_))
        ));
        assert_eq!(parse_coordinate(&f64::NAN.into()), Err(Rejection::NotFinite));
        assert_eq!(parse_coordinate(&"NaN".into()), Err(Rejection::NotFinite));
    }

    #[test]
    fn test_from_input_rejects_out_of_bounds() {
        // Paris
        let i = input("p", 48.85.into(), 2.35.into());
        assert!(matches!(
            GeoPoint::from_input(&i, &NETHERLANDS),
            Err(Rejection::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_from_input_accepts_amsterdam() {
        let i = input("a", 52.37.into(), "4.90".into());
        let p = GeoPoint::from_input(&i, &NETHERLANDS).unwrap();
        assert_eq!(p.id, "a");
        assert_eq!(p.label, "Bedrijf a");
        assert!((p.longitude - 4.90).abs() < 1e-9);
        assert_eq!(p.weight, 3);
    }

    #[test]
    fn test_from_input_trims_region() {
        let mut i = input("u", 52.09.into(), 5.12.into());
        i.region = " Utrecht ".to_string();
        let p = GeoPoint::from_input(&i, &NETHERLANDS).unwrap();
        assert_eq!(p.region, "Utrecht");
    }

    #[test]
    fn test_normalize_weight() {
        assert_eq!(normalize_weight(5.0), 5);
        assert_eq!(normalize_weight(2.9), 2);
        assert_eq!(normalize_weight(-4.0), 0);
        assert_eq!(normalize_weight(f64::NAN), 0);
    }

    #[test]
    fn test_prepare_points_drops_invalid_and_duplicates() {
        let inputs = vec![
            input("a", 52.37.into(), 4.90.into()),
            input("b", CoordinateValue::Null, 4.48.into()),
            input("a", 52.09.into(), 5.12.into()),
            input("c", 52.09.into(), 5.12.into()),
        ];
        let prepared = prepare_points(&inputs, &NETHERLANDS);
        let ids: Vec<&str> = prepared.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(prepared.rejected.len(), 2);
        assert_eq!(prepared.rejected[0].1, Rejection::MissingCoordinate);
        assert_eq!(prepared.rejected[1].1, Rejection::DuplicateId);
    }

    #[test]
    fn test_mercator_roundtrip() {
        let x = lng_x(4.9);
        let y = lat_y(52.37);
        assert!((x_lng(x) - 4.9).abs() < 1e-9);
        assert!((y_lat(y) - 52.37).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_orientation() {
        assert!((lng_x(0.0) - 0.5).abs() < 1e-12);
        assert!((lat_y(0.0) - 0.5).abs() < 1e-12);
        // North is up: larger latitude, smaller y
        assert!(lat_y(53.0) < lat_y(51.0));
        assert_eq!(lat_y(90.0), 0.0);
    }
}
