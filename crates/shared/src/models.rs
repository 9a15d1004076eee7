use serde::{Deserialize, Serialize};

/// Raw coordinate as it arrives from the feed: a number, a numeric string or null.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateValue {
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl From<f64> for CoordinateValue {
    fn from(v: f64) -> Self {
        CoordinateValue::Number(v)
    }
}

impl From<&str> for CoordinateValue {
    fn from(v: &str) -> Self {
        CoordinateValue::Text(v.to_string())
    }
}

/// A child row shown inside a company popup (an open position).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupItem {
    pub id: String,
    pub title: String,
}

/// Company record as supplied by the host, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPointInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lat: CoordinateValue,
    #[serde(default)]
    pub lng: CoordinateValue,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub items: Vec<PopupItem>,
}

/// A validated point that can be plotted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: String,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weight: u32,
    pub region: String,
    pub items: Vec<PopupItem>,
}

impl GeoPoint {
    pub fn position(&self) -> LngLat {
        LngLat {
            lng: self.longitude,
            lat: self.latitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        LngLat { lng, lat }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// The whole Web-Mercator world.
    pub const WORLD: BoundingBox = BoundingBox {
        west: -180.0,
        south: -85.0,
        east: 180.0,
        north: 85.0,
    };

    pub fn center(&self) -> LngLat {
        LngLat {
            lng: (self.west + self.east) / 2.0,
            lat: (self.south + self.north) / 2.0,
        }
    }

    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.west && p.lng <= self.east && p.lat >= self.south && p.lat <= self.north
    }

    /// Grow the box by `degrees` on every side.
    pub fn expand(&self, degrees: f64) -> BoundingBox {
        BoundingBox {
            west: self.west - degrees,
            south: self.south - degrees,
            east: self.east + degrees,
            north: self.north + degrees,
        }
    }
}

/// Region selector. The wire value `"all"` disables region filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionFilter {
    #[default]
    All,
    Region(String),
}

pub const ALL_REGIONS: &str = "all";

impl RegionFilter {
    pub fn from_wire(value: &str) -> Self {
        if value == ALL_REGIONS {
            RegionFilter::All
        } else {
            RegionFilter::Region(value.to_string())
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            RegionFilter::All => ALL_REGIONS,
            RegionFilter::Region(r) => r,
        }
    }

    pub fn matches(&self, region: &str) -> bool {
        match self {
            RegionFilter::All => true,
            RegionFilter::Region(r) => r == region,
        }
    }
}

impl std::fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// Filter parameters as they travel over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterInput {
    pub region: String,
    pub min_weight: u32,
}

impl Default for FilterInput {
    fn default() -> Self {
        FilterInput {
            region: ALL_REGIONS.to_string(),
            min_weight: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub selected_region: RegionFilter,
    /// Inclusive lower bound on `GeoPoint::weight`.
    pub min_weight: u32,
}

impl FilterState {
    pub fn new(selected_region: RegionFilter, min_weight: u32) -> Self {
        FilterState {
            selected_region,
            min_weight,
        }
    }

    pub fn is_default(&self) -> bool {
        self.selected_region == RegionFilter::All && self.min_weight == 0
    }

    pub fn accepts(&self, point: &GeoPoint) -> bool {
        self.selected_region.matches(&point.region) && point.weight >= self.min_weight
    }
}

impl From<&FilterInput> for FilterState {
    fn from(input: &FilterInput) -> Self {
        FilterState {
            selected_region: RegionFilter::from_wire(&input.region),
            min_weight: input.min_weight,
        }
    }
}

impl From<&FilterState> for FilterInput {
    fn from(state: &FilterState) -> Self {
        FilterInput {
            region: state.selected_region.as_wire().to_string(),
            min_weight: state.min_weight,
        }
    }
}

pub type ClusterId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub cluster_id: ClusterId,
    pub coordinates: LngLat,
    pub point_count: usize,
    /// Sum of member weights (open vacancies in the cluster).
    pub total_weight: u64,
}

/// Output of a clustering query: a single point or an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterFeature {
    Leaf(GeoPoint),
    Cluster(ClusterSummary),
}

impl ClusterFeature {
    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusterFeature::Cluster(_))
    }

    /// `[lng, lat]` position of the feature.
    pub fn coordinates(&self) -> LngLat {
        match self {
            ClusterFeature::Leaf(p) => p.position(),
            ClusterFeature::Cluster(c) => c.coordinates,
        }
    }

    pub fn point_count(&self) -> usize {
        match self {
            ClusterFeature::Leaf(_) => 1,
            ClusterFeature::Cluster(c) => c.point_count,
        }
    }

    pub fn cluster_id(&self) -> Option<ClusterId> {
        match self {
            ClusterFeature::Leaf(_) => None,
            ClusterFeature::Cluster(c) => Some(c.cluster_id),
        }
    }

    pub fn source_point(&self) -> Option<&GeoPoint> {
        match self {
            ClusterFeature::Leaf(p) => Some(p),
            ClusterFeature::Cluster(_) => None,
        }
    }

    pub fn key(&self) -> MarkerKey {
        match self {
            ClusterFeature::Leaf(p) => MarkerKey::Point(p.id.clone()),
            ClusterFeature::Cluster(c) => MarkerKey::Cluster(c.cluster_id),
        }
    }
}

/// Identity of a mounted marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKey {
    Point(String),
    Cluster(ClusterId),
}

impl std::fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerKey::Point(id) => write!(f, "{}", id),
            MarkerKey::Cluster(id) => write!(f, "cluster-{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_accepts_numbers_strings_and_null() {
        let json = r#"[
            {"id":"a","name":"A","lat":52.37,"lng":"4.90","region":"Noord-Holland","weight":5},
            {"id":"b","name":"B","lat":null,"lng":null,"region":"Zuid-Holland","weight":2}
        ]"#;
        let inputs: Vec<GeoPointInput> = serde_json::from_str(json).unwrap();
        assert_eq!(inputs[0].lat, CoordinateValue::Number(52.37));
        assert_eq!(inputs[0].lng, CoordinateValue::Text("4.90".to_string()));
        assert_eq!(inputs[1].lat, CoordinateValue::Null);
        assert!(inputs[1].items.is_empty());
    }

    #[test]
    fn test_input_missing_coordinates_default_to_null() {
        let json = r#"{"id":"c","name":"C","region":"Utrecht","weight":1}"#;
        let input: GeoPointInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.lat, CoordinateValue::Null);
        assert_eq!(input.lng, CoordinateValue::Null);
    }

    #[test]
    fn test_region_filter_wire_value() {
        assert_eq!(RegionFilter::from_wire("all"), RegionFilter::All);
        assert_eq!(
            RegionFilter::from_wire("Utrecht"),
            RegionFilter::Region("Utrecht".to_string())
        );
        assert_eq!(RegionFilter::All.to_string(), "all");
    }

    #[test]
    fn test_region_filter_is_exact_match() {
        let f = RegionFilter::Region("Utrecht".to_string());
        assert!(f.matches("Utrecht"));
        assert!(!f.matches("utrecht"));
        assert!(RegionFilter::All.matches("anything"));
    }

    #[test]
    fn test_filter_input_deserializes_camel_case() {
        let input: FilterInput = serde_json::from_str(r#"{"region":"all","minWeight":3}"#).unwrap();
        let state = FilterState::from(&input);
        assert_eq!(state.selected_region, RegionFilter::All);
        assert_eq!(state.min_weight, 3);
        assert!(!state.is_default());
        assert!(FilterState::default().is_default());
    }

    #[test]
    fn test_marker_key_display() {
        assert_eq!(MarkerKey::Point("abc".to_string()).to_string(), "abc");
        assert_eq!(MarkerKey::Cluster(97).to_string(), "cluster-97");
    }

    #[test]
    fn test_bbox_expand_and_contains() {
        let b = BoundingBox {
            west: 4.0,
            south: 52.0,
            east: 5.0,
            north: 53.0,
        };
        assert!(b.contains(LngLat::new(4.5, 52.5)));
        assert!(!b.contains(LngLat::new(5.5, 52.5)));
        let e = b.expand(0.5);
        assert!(e.contains(LngLat::new(5.5, 52.5)));
        let c = b.center();
        assert!((c.lng - 4.5).abs() < 1e-9);
        assert!((c.lat - 52.5).abs() < 1e-9);
    }
}
