//! Hierarchical greedy point clustering.
//!
//! The index keeps one KD-tree per integer zoom level, built bottom-up from
//! `max_zoom + 1` (raw points) to `min_zoom`. At each level every unvisited
//! node absorbs the unvisited neighbours within `radius` pixels; the merged
//! node sits at the count-weighted centroid of its members.
//!
//! Cluster ids encode the index of the seed node and the level it was
//! absorbed at, so `children` and `expansion_zoom` can find it again without
//! any extra lookup table. Ids are only meaningful for the index that
//! produced them.

use crate::geo::{lat_y, lng_x, x_lng, y_lat};
use crate::kdtree::KdTree;
use crate::models::{BoundingBox, ClusterFeature, ClusterId, ClusterSummary, GeoPoint, LngLat};

/// Marks a node that has not been visited at any zoom yet.
const UNVISITED: i32 = i32::MAX;

/// Zoom is packed into the low five bits of a cluster id.
const ZOOM_BITS: u32 = 5;
const MAX_SUPPORTED_ZOOM: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Cluster radius in pixels.
    pub radius: f64,
    /// Tile extent the radius is measured against.
    pub extent: f64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Minimum members for a cluster to form.
    pub min_points: usize,
    /// Leaf size of the KD-trees.
    pub node_size: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            radius: 60.0,
            extent: 512.0,
            min_zoom: 0,
            max_zoom: 16,
            min_points: 2,
            node_size: 64,
        }
    }
}

impl ClusterOptions {
    fn sanitized(mut self) -> Self {
        self.max_zoom = self.max_zoom.min(MAX_SUPPORTED_ZOOM);
        self.min_zoom = self.min_zoom.min(self.max_zoom);
        self.min_points = self.min_points.max(2);
        self.node_size = self.node_size.max(1);
        if !(self.radius.is_finite() && self.radius >= 0.0) {
            self.radius = 0.0;
        }
        if !(self.extent.is_finite() && self.extent > 0.0) {
            self.extent = 512.0;
        }
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    x: f64,
    y: f64,
    /// Last zoom this node was visited at.
    zoom: i32,
    /// Source point index for leaves, cluster id for aggregates.
    id: u64,
    parent: Option<ClusterId>,
    num_points: usize,
    weight: u64,
}

impl Node {
    fn is_cluster(&self) -> bool {
        self.num_points > 1
    }
}

#[derive(Debug, Clone, Default)]
struct Level {
    nodes: Vec<Node>,
    tree: KdTree,
}

impl Level {
    fn new(nodes: Vec<Node>, node_size: usize) -> Self {
        let tree = KdTree::new(nodes.iter().map(|n| (n.x, n.y)), node_size);
        Level { nodes, tree }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterIndex {
    options: ClusterOptions,
    points: Vec<GeoPoint>,
    /// Indexed by zoom; entries below `min_zoom` stay empty.
    levels: Vec<Level>,
}

impl ClusterIndex {
    pub fn build(points: Vec<GeoPoint>, options: ClusterOptions) -> Self {
        let options = options.sanitized();
        let n = points.len() as u64;
        let top = options.max_zoom as usize + 1;

        let leaves: Vec<Node> = points
            .iter()
            .enumerate()
            .map(|(i, p)| Node {
                x: lng_x(p.longitude),
                y: lat_y(p.latitude),
                zoom: UNVISITED,
                id: i as u64,
                parent: None,
                num_points: 1,
                weight: p.weight as u64,
            })
            .collect();

        let mut levels: Vec<Level> = vec![Level::default(); top + 1];
        levels[top] = Level::new(leaves, options.node_size);

        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let z = zoom as usize;
            let next = cluster_level(&mut levels[z + 1], zoom as i32, n, &options);
            levels[z] = Level::new(next, options.node_size);
        }

        tracing::debug!(
            points = points.len(),
            clusters_at_min_zoom = levels[options.min_zoom as usize].nodes.len(),
            "Built cluster index"
        );

        ClusterIndex {
            options,
            points,
            levels,
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Clamp a fractional map zoom to the level that serves it.
    pub fn level_for_zoom(&self, zoom: f64) -> usize {
        let min = self.options.min_zoom as f64;
        let max = self.options.max_zoom as f64 + 1.0;
        if zoom.is_nan() {
            return min as usize;
        }
        zoom.floor().clamp(min, max) as usize
    }

    /// Clusters and points visible in `bbox` at `zoom`.
    pub fn query(&self, bbox: &BoundingBox, zoom: f64) -> Vec<ClusterFeature> {
        let Some(level) = self.levels.get(self.level_for_zoom(zoom)) else {
            return Vec::new();
        };
        if level.nodes.is_empty() {
            return Vec::new();
        }

        let wrap = |lng: f64| ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0;
        let min_lat = bbox.south.clamp(-90.0, 90.0);
        let max_lat = bbox.north.clamp(-90.0, 90.0);
        let (mut min_lng, mut max_lng) = (
            wrap(bbox.west),
            if bbox.east == 180.0 { 180.0 } else { wrap(bbox.east) },
        );

        if bbox.east - bbox.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            // Crosses the antimeridian: query both halves.
            let mut east = self.query_range(level, min_lng, min_lat, 180.0, max_lat);
            east.extend(self.query_range(level, -180.0, min_lat, max_lng, max_lat));
            return east;
        }

        self.query_range(level, min_lng, min_lat, max_lng, max_lat)
    }

    fn query_range(
        &self,
        level: &Level,
        min_lng: f64,
        min_lat: f64,
        max_lng: f64,
        max_lat: f64,
    ) -> Vec<ClusterFeature> {
        level
            .tree
            .range(lng_x(min_lng), lat_y(max_lat), lng_x(max_lng), lat_y(min_lat))
            .into_iter()
            .filter_map(|i| self.feature(&level.nodes[i]))
            .collect()
    }

    fn feature(&self, node: &Node) -> Option<ClusterFeature> {
        if node.is_cluster() {
            Some(ClusterFeature::Cluster(ClusterSummary {
                cluster_id: node.id,
                coordinates: LngLat::new(x_lng(node.x), y_lat(node.y)),
                point_count: node.num_points,
                total_weight: node.weight,
            }))
        } else {
            self.points
                .get(node.id as usize)
                .cloned()
                .map(ClusterFeature::Leaf)
        }
    }

    /// Split a cluster id into (seed node index, level it lives on).
    fn decode(&self, cluster_id: ClusterId) -> Option<(usize, usize)> {
        let offset = cluster_id.checked_sub(self.points.len() as u64)?;
        let origin_index = (offset >> ZOOM_BITS) as usize;
        let origin_zoom = (offset % (1 << ZOOM_BITS)) as usize;
        if origin_zoom <= self.options.min_zoom as usize
            || origin_zoom > self.options.max_zoom as usize + 1
        {
            return None;
        }
        Some((origin_index, origin_zoom))
    }

    /// Direct children of a cluster, or `None` if this index never produced the id.
    pub fn children(&self, cluster_id: ClusterId) -> Option<Vec<ClusterFeature>> {
        let (origin_index, origin_zoom) = self.decode(cluster_id)?;
        let level = self.levels.get(origin_zoom)?;
        let seed = level.nodes.get(origin_index)?;
        if seed.parent != Some(cluster_id) {
            return None;
        }

        let r = self.options.radius / (self.options.extent * 2f64.powi(origin_zoom as i32 - 1));
        let children: Vec<ClusterFeature> = level
            .tree
            .within(seed.x, seed.y, r)
            .into_iter()
            .map(|i| &level.nodes[i])
            .filter(|n| n.parent == Some(cluster_id))
            .filter_map(|n| self.feature(n))
            .collect();

        if children.is_empty() {
            None
        } else {
            Some(children)
        }
    }

    /// Lowest zoom at which the cluster breaks apart.
    ///
    /// Returns `None` for ids that do not belong to this index, so a click on
    /// a marker from a previous build is ignored instead of misfiring.
    pub fn expansion_zoom(&self, cluster_id: ClusterId) -> Option<u8> {
        let (_, origin_zoom) = self.decode(cluster_id)?;
        let mut expansion = origin_zoom as i32 - 1;
        let mut current = cluster_id;

        while expansion <= self.options.max_zoom as i32 {
            let children = self.children(current)?;
            expansion += 1;
            if children.len() != 1 {
                break;
            }
            match children[0].cluster_id() {
                Some(id) => current = id,
                None => break,
            }
        }

        Some(expansion.clamp(0, u8::MAX as i32) as u8)
    }

    /// Member points of a cluster, paginated.
    pub fn leaves(&self, cluster_id: ClusterId, limit: usize, offset: usize) -> Option<Vec<GeoPoint>> {
        let mut out = Vec::new();
        let mut skipped = 0;
        self.append_leaves(cluster_id, limit, offset, &mut skipped, &mut out)?;
        Some(out)
    }

    fn append_leaves(
        &self,
        cluster_id: ClusterId,
        limit: usize,
        offset: usize,
        skipped: &mut usize,
        out: &mut Vec<GeoPoint>,
    ) -> Option<()> {
        for child in self.children(cluster_id)? {
            if out.len() >= limit {
                break;
            }
            match child {
                ClusterFeature::Cluster(c) => {
                    if *skipped + c.point_count <= offset {
                        *skipped += c.point_count;
                    } else {
                        self.append_leaves(c.cluster_id, limit, offset, skipped, out)?;
                    }
                }
                ClusterFeature::Leaf(p) => {
                    if *skipped < offset {
                        *skipped += 1;
                    } else {
                        out.push(p);
                    }
                }
            }
        }
        Some(())
    }
}

/// Merge the nodes of `level` (zoom + 1) into the node list for `zoom`.
fn cluster_level(level: &mut Level, zoom: i32, num_source_points: u64, options: &ClusterOptions) -> Vec<Node> {
    let r = options.radius / (options.extent * 2f64.powi(zoom));
    let mut next = Vec::with_capacity(level.nodes.len());

    for i in 0..level.nodes.len() {
        if level.nodes[i].zoom <= zoom {
            continue;
        }
        level.nodes[i].zoom = zoom;

        let seed = level.nodes[i];
        let neighbors = level.tree.within(seed.x, seed.y, r);

        let num_points = seed.num_points
            + neighbors
                .iter()
                .map(|&k| &level.nodes[k])
                .filter(|n| n.zoom > zoom)
                .map(|n| n.num_points)
                .sum::<usize>();

        if num_points > seed.num_points && num_points >= options.min_points {
            let id = ((i as u64) << ZOOM_BITS) + (zoom as u64 + 1) + num_source_points;
            let mut wx = seed.x * seed.num_points as f64;
            let mut wy = seed.y * seed.num_points as f64;
            let mut weight = seed.weight;

            for &k in &neighbors {
                let n = &mut level.nodes[k];
                if n.zoom <= zoom {
                    continue;
                }
                n.zoom = zoom;
                n.parent = Some(id);
                wx += n.x * n.num_points as f64;
                wy += n.y * n.num_points as f64;
                weight += n.weight;
            }
            level.nodes[i].parent = Some(id);

            next.push(Node {
                x: wx / num_points as f64,
                y: wy / num_points as f64,
                zoom: UNVISITED,
                id,
                parent: None,
                num_points,
                weight,
            });
        } else {
            next.push(seed);
            if num_points > 1 {
                for &k in &neighbors {
                    let n = &mut level.nodes[k];
                    if n.zoom <= zoom {
                        continue;
                    }
                    n.zoom = zoom;
                    next.push(*n);
                }
            }
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, lat: f64, lng: f64, weight: u32) -> GeoPoint {
        GeoPoint {
            id: id.to_string(),
            label: id.to_string(),
            latitude: lat,
            longitude: lng,
            weight,
            region: "NL".to_string(),
            items: vec![],
        }
    }

    fn amsterdam_utrecht() -> Vec<GeoPoint> {
        vec![
            point("amsterdam", 52.37, 4.90, 5),
            point("utrecht", 52.09, 5.12, 8),
        ]
    }

    fn membership(features: &[ClusterFeature]) -> Vec<(bool, usize, String)> {
        features
            .iter()
            .map(|f| match f {
                ClusterFeature::Leaf(p) => (false, 1, p.id.clone()),
                ClusterFeature::Cluster(c) => (true, c.point_count, c.cluster_id.to_string()),
            })
            .collect()
    }

    /// Deterministic pseudo-random scatter across the Netherlands.
    fn scatter(n: usize) -> Vec<GeoPoint> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f64 / 10_000.0
        };
        (0..n)
            .map(|i| {
                let lat = 50.8 + next() * 2.7;
                let lng = 3.4 + next() * 3.8;
                point(&format!("p{}", i), lat, lng, (i % 7) as u32)
            })
            .collect()
    }

    #[test]
    fn test_low_zoom_merges_nearby_cities() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        let features = index.query(&BoundingBox::WORLD, 6.0);
        assert_eq!(features.len(), 1);
        assert!(features[0].is_cluster());
        assert_eq!(features[0].point_count(), 2);
        match &features[0] {
            ClusterFeature::Cluster(c) => assert_eq!(c.total_weight, 13),
            _ => panic!("expected a cluster"),
        }
    }

    #[test]
    fn test_high_zoom_returns_leaves() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        let features = index.query(&BoundingBox::WORLD, 14.0);
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| !f.is_cluster()));
    }

    #[test]
    fn test_cluster_centroid_lies_between_members() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        let c = index.query(&BoundingBox::WORLD, 6.0)[0].coordinates();
        assert!(c.lng > 4.90 && c.lng < 5.12);
        assert!(c.lat > 52.09 && c.lat < 52.37);
    }

    #[test]
    fn test_expansion_zoom_splits_cluster() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        let id = index.query(&BoundingBox::WORLD, 6.0)[0].cluster_id().unwrap();
        let zoom = index.expansion_zoom(id).unwrap();
        assert_eq!(zoom, 7);
        let at_expansion = index.query(&BoundingBox::WORLD, zoom as f64);
        assert_eq!(at_expansion.len(), 2);
    }

    #[test]
    fn test_children_and_leaves() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        let id = index.query(&BoundingBox::WORLD, 3.0)[0].cluster_id().unwrap();
        let children = index.children(id).unwrap();
        assert_eq!(children.len(), 2);
        let mut ids: Vec<String> = index
            .leaves(id, 10, 0)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["amsterdam", "utrecht"]);
        assert_eq!(index.leaves(id, 1, 0).unwrap().len(), 1);
        assert_eq!(index.leaves(id, 10, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_cluster_id_is_ignored() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        assert_eq!(index.expansion_zoom(0), None);
        assert_eq!(index.expansion_zoom(999_999), None);
        assert!(index.children(12345).is_none());
        assert!(index.leaves(12345, 10, 0).is_none());
    }

    #[test]
    fn test_cluster_id_from_other_index_is_rejected() {
        let big = ClusterIndex::build(scatter(300), ClusterOptions::default());
        let id = big
            .query(&BoundingBox::WORLD, 5.0)
            .iter()
            .find_map(|f| f.cluster_id())
            .unwrap();
        let small = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        assert_eq!(small.expansion_zoom(id), None);
    }

    #[test]
    fn test_query_is_deterministic() {
        let pts = scatter(500);
        let index = ClusterIndex::build(pts.clone(), ClusterOptions::default());
        let bbox = BoundingBox {
            west: 3.0,
            south: 50.5,
            east: 7.5,
            north: 53.8,
        };
        for zoom in [4.0, 7.0, 9.5, 12.0] {
            let a = membership(&index.query(&bbox, zoom));
            let b = membership(&index.query(&bbox, zoom));
            assert_eq!(a, b);
        }
        let rebuilt = ClusterIndex::build(pts, ClusterOptions::default());
        assert_eq!(
            membership(&index.query(&bbox, 8.0)),
            membership(&rebuilt.query(&bbox, 8.0))
        );
    }

    #[test]
    fn test_point_counts_are_conserved() {
        let pts = scatter(400);
        let index = ClusterIndex::build(pts, ClusterOptions::default());
        for zoom in 0..=17 {
            let total: usize = index
                .query(&BoundingBox::WORLD, zoom as f64)
                .iter()
                .map(|f| f.point_count())
                .sum();
            assert_eq!(total, 400, "zoom {}", zoom);
        }
    }

    #[test]
    fn test_bbox_limits_results() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        let around_amsterdam = BoundingBox {
            west: 4.8,
            south: 52.3,
            east: 5.0,
            north: 52.4,
        };
        let features = index.query(&around_amsterdam, 14.0);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].source_point().unwrap().id, "amsterdam");
    }

    #[test]
    fn test_antimeridian_bbox_wraps() {
        let pts = vec![point("fiji", -17.7, 178.0, 1), point("samoa", -13.8, -172.0, 1)];
        let index = ClusterIndex::build(pts, ClusterOptions::default());
        let bbox = BoundingBox {
            west: 170.0,
            south: -20.0,
            east: -165.0,
            north: -10.0,
        };
        assert_eq!(index.query(&bbox, 14.0).len(), 2);
    }

    #[test]
    fn test_empty_index() {
        let index = ClusterIndex::build(vec![], ClusterOptions::default());
        assert!(index.is_empty());
        assert!(index.query(&BoundingBox::WORLD, 5.0).is_empty());
    }

    #[test]
    fn test_zoom_is_clamped() {
        let index = ClusterIndex::build(amsterdam_utrecht(), ClusterOptions::default());
        assert_eq!(index.level_for_zoom(-3.0), 0);
        assert_eq!(index.level_for_zoom(7.9), 7);
        assert_eq!(index.level_for_zoom(40.0), 17);
        assert_eq!(index.level_for_zoom(f64::NAN), 0);
    }
}
