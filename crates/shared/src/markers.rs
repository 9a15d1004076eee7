//! Marker lifecycle: derive a spec per feature, diff against what is
//! mounted, and apply the minimum set of create/update/destroy calls.
//!
//! Engines plug in through [`MarkerFactory`] and [`MarkerHandle`]; nothing
//! here touches a DOM or a canvas.

use std::collections::BTreeMap;

use crate::label::{compute_label, compute_marker_size, compute_scale, MarkerSize};
use crate::models::{ClusterFeature, ClusterId, GeoPoint, LngLat, MarkerKey, PopupItem};

/// Leaf popups list at most this many child items.
pub const POPUP_ITEM_LIMIT: usize = 5;

/// Inputs to spec derivation that do not come from the feature itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelContext {
    pub zoom: f64,
    pub viewport_width_px: f64,
    /// Cluster index generation the features were queried from.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerVisual {
    pub text: String,
    /// Count shown next to the text (open vacancies or cluster members).
    pub badge: String,
    pub scale: f64,
    pub position: LngLat,
    pub size: MarkerSize,
    pub is_cluster: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupContent {
    Point {
        title: String,
        region: String,
        weight: u32,
        items: Vec<PopupItem>,
        /// Items left out because of [`POPUP_ITEM_LIMIT`].
        more: usize,
    },
    Cluster {
        point_count: usize,
        total_weight: u64,
    },
}

/// What a click on the marker asks the host to do.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerAction {
    Select(String),
    ExpandCluster {
        cluster_id: ClusterId,
        coordinates: LngLat,
        generation: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub visual: MarkerVisual,
    pub popup: PopupContent,
    pub action: MarkerAction,
}

fn point_popup(p: &GeoPoint) -> PopupContent {
    PopupContent::Point {
        title: p.label.clone(),
        region: p.region.clone(),
        weight: p.weight,
        items: p.items.iter().take(POPUP_ITEM_LIMIT).cloned().collect(),
        more: p.items.len().saturating_sub(POPUP_ITEM_LIMIT),
    }
}

impl MarkerSpec {
    pub fn for_feature(feature: &ClusterFeature, ctx: &LabelContext) -> MarkerSpec {
        let size = compute_marker_size(ctx.viewport_width_px);
        let scale = compute_scale(ctx.zoom);
        match feature {
            ClusterFeature::Leaf(p) => MarkerSpec {
                visual: MarkerVisual {
                    text: compute_label(&p.label, ctx.zoom, ctx.viewport_width_px),
                    badge: p.weight.to_string(),
                    scale,
                    position: p.position(),
                    size,
                    is_cluster: false,
                },
                popup: point_popup(p),
                action: MarkerAction::Select(p.id.clone()),
            },
            ClusterFeature::Cluster(c) => MarkerSpec {
                visual: MarkerVisual {
                    text: c.point_count.to_string(),
                    badge: c.total_weight.to_string(),
                    scale,
                    position: c.coordinates,
                    size,
                    is_cluster: true,
                },
                popup: PopupContent::Cluster {
                    point_count: c.point_count,
                    total_weight: c.total_weight,
                },
                action: MarkerAction::ExpandCluster {
                    cluster_id: c.cluster_id,
                    coordinates: c.coordinates,
                    generation: ctx.generation,
                },
            },
        }
    }
}

/// A mounted marker owned by the layer.
pub trait MarkerHandle {
    /// Apply a changed spec in place (text, scale, position, popup, action).
    fn update(&mut self, spec: &MarkerSpec);
    /// Detach from the map and drop listeners.
    fn destroy(self);
}

/// Engine binding that mounts new markers.
pub trait MarkerFactory {
    type Handle: MarkerHandle;

    fn create(&mut self, key: &MarkerKey, spec: &MarkerSpec) -> Self::Handle;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
    pub unchanged: usize,
}

impl ReconcileStats {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.destroyed == 0
    }
}

struct Mounted<H> {
    handle: H,
    spec: MarkerSpec,
}

/// Mounted markers keyed by point id or cluster id; at most one per key.
pub struct MarkerLayer<H: MarkerHandle> {
    mounted: BTreeMap<MarkerKey, Mounted<H>>,
}

impl<H: MarkerHandle> Default for MarkerLayer<H> {
    fn default() -> Self {
        MarkerLayer {
            mounted: BTreeMap::new(),
        }
    }
}

impl<H: MarkerHandle> MarkerLayer<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    pub fn contains(&self, key: &MarkerKey) -> bool {
        self.mounted.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MarkerKey> {
        self.mounted.keys()
    }

    pub fn spec(&self, key: &MarkerKey) -> Option<&MarkerSpec> {
        self.mounted.get(key).map(|m| &m.spec)
    }

    /// Bring the mounted set in line with `features`.
    ///
    /// Stale keys are destroyed before anything is created, changed specs are
    /// updated in place, and identical specs are left alone.
    pub fn reconcile<F>(&mut self, features: &[ClusterFeature], ctx: &LabelContext, factory: &mut F) -> ReconcileStats
    where
        F: MarkerFactory<Handle = H>,
    {
        let mut stats = ReconcileStats::default();

        let mut wanted: BTreeMap<MarkerKey, MarkerSpec> = BTreeMap::new();
        for feature in features {
            wanted
                .entry(feature.key())
                .or_insert_with(|| MarkerSpec::for_feature(feature, ctx));
        }

        let stale: Vec<MarkerKey> = self
            .mounted
            .keys()
            .filter(|k| !wanted.contains_key(*k))
            .cloned()
            .collect();
        for key in stale {
            if let Some(m) = self.mounted.remove(&key) {
                m.handle.destroy();
                stats.destroyed += 1;
            }
        }

        for (key, spec) in wanted {
            match self.mounted.get_mut(&key) {
                Some(m) if m.spec == spec => stats.unchanged += 1,
                Some(m) => {
                    m.handle.update(&spec);
                    m.spec = spec;
                    stats.updated += 1;
                }
                None => {
                    let handle = factory.create(&key, &spec);
                    self.mounted.insert(key, Mounted { handle, spec });
                    stats.created += 1;
                }
            }
        }

        stats
    }

    /// Destroy every mounted marker. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let mounted = std::mem::take(&mut self.mounted);
        let count = mounted.len();
        for (_, m) in mounted {
            m.handle.destroy();
        }
        count
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeFactory;
    use super::*;
    use crate::models::ClusterSummary;

    fn leaf(id: &str, lat: f64, lng: f64, weight: u32) -> ClusterFeature {
        ClusterFeature::Leaf(GeoPoint {
            id: id.to_string(),
            label: format!("Bedrijf {}", id),
            latitude: lat,
            longitude: lng,
            weight,
            region: "Utrecht".to_string(),
            items: (0..7)
                .map(|i| PopupItem {
                    id: format!("{}-{}", id, i),
                    title: format!("Vacature {}", i),
                })
                .collect(),
        })
    }

    fn cluster(id: ClusterId, count: usize) -> ClusterFeature {
        ClusterFeature::Cluster(ClusterSummary {
            cluster_id: id,
            coordinates: LngLat::new(5.0, 52.0),
            point_count: count,
            total_weight: 10,
        })
    }

    fn ctx(zoom: f64) -> LabelContext {
        LabelContext {
            zoom,
            viewport_width_px: 1200.0,
            generation: 1,
        }
    }

    #[test]
    fn test_first_render_creates_everything() {
        let mut layer = MarkerLayer::new();
        let mut factory = FakeFactory::default();
        let features = vec![leaf("a", 52.0, 5.0, 1), leaf("b", 52.1, 5.1, 2), cluster(99, 4)];
        let stats = layer.reconcile(&features, &ctx(10.0), &mut factory);
        assert_eq!(stats.created, 3);
        assert_eq!(layer.len(), 3);
        assert!(layer.contains(&MarkerKey::Cluster(99)));
    }

    #[test]
    fn test_unchanged_inputs_produce_no_churn() {
        let mut layer = MarkerLayer::new();
        let mut factory = FakeFactory::default();
        let features = vec![leaf("a", 52.0, 5.0, 1), cluster(99, 4)];
        layer.reconcile(&features, &ctx(10.0), &mut factory);
        let stats = layer.reconcile(&features, &ctx(10.0), &mut factory);
        assert!(stats.is_noop());
        assert_eq!(stats.unchanged, 2);
        let journal = factory.journal.borrow();
        assert_eq!(journal.created.len(), 2);
        assert!(journal.updated.is_empty());
        assert!(journal.destroyed.is_empty());
    }

    #[test]
    fn test_diff_counts_match_set_difference() {
        let mut layer = MarkerLayer::new();
        let mut factory = FakeFactory::default();
        layer.reconcile(
            &[leaf("a", 52.0, 5.0, 1), leaf("b", 52.1, 5.1, 1), leaf("c", 52.2, 5.2, 1)],
            &ctx(10.0),
            &mut factory,
        );
        let stats = layer.reconcile(
            &[leaf("b", 52.1, 5.1, 1), leaf("d", 52.3, 5.3, 1)],
            &ctx(10.0),
            &mut factory,
        );
        assert_eq!(stats.created, 1);
        assert_eq!(stats.destroyed, 2);
        assert_eq!(stats.unchanged, 1);
        let journal = factory.journal.borrow();
        assert_eq!(journal.destroyed, vec!["a", "c"]);
    }

    #[test]
    fn test_stale_handles_destroyed_before_creation() {
        let mut layer = MarkerLayer::new();
        let mut factory = FakeFactory::default();
        layer.reconcile(&[leaf("a", 52.0, 5.0, 1), leaf("b", 52.0, 5.0, 1)], &ctx(12.0), &mut factory);
        layer.reconcile(&[cluster(7, 2)], &ctx(6.0), &mut factory);
        let journal = factory.journal.borrow();
        assert_eq!(journal.destroyed.len(), 2);
        assert_eq!(journal.created.last().unwrap(), "cluster-7");
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn test_visual_change_updates_in_place() {
        let mut layer = MarkerLayer::new();
        let mut factory = FakeFactory::default();
        let features = vec![leaf("a", 52.0, 5.0, 1)];
        layer.reconcile(&features, &ctx(10.0), &mut factory);
        // Zoom changes label text and scale but not identity.
        let stats = layer.reconcile(&features, &ctx(5.0), &mut factory);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(stats.destroyed, 0);
        assert_eq!(layer.spec(&MarkerKey::Point("a".into())).unwrap().visual.text, "BA");
    }

    #[test]
    fn test_duplicate_feature_keys_mount_once() {
        let mut layer = MarkerLayer::new();
        let mut factory = FakeFactory::default();
        let stats = layer.reconcile(&[leaf("a", 52.0, 5.0, 1), leaf("a", 52.0, 5.0, 1)], &ctx(10.0), &mut factory);
        assert_eq!(stats.created, 1);
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn test_clear_destroys_everything() {
        let mut layer = MarkerLayer::new();
        let mut factory = FakeFactory::default();
        layer.reconcile(&[leaf("a", 52.0, 5.0, 1), cluster(3, 2)], &ctx(10.0), &mut factory);
        assert_eq!(layer.clear(), 2);
        assert!(layer.is_empty());
        assert_eq!(factory.journal.borrow().destroyed.len(), 2);
    }

    #[test]
    fn test_point_spec_popup_is_capped() {
        let spec = MarkerSpec::for_feature(&leaf("a", 52.0, 5.0, 6), &ctx(10.0));
        match spec.popup {
            PopupContent::Point { items, more, weight, .. } => {
                assert_eq!(items.len(), POPUP_ITEM_LIMIT);
                assert_eq!(more, 2);
                assert_eq!(weight, 6);
            }
            _ => panic!("expected point popup"),
        }
        assert_eq!(spec.action, MarkerAction::Select("a".to_string()));
        assert_eq!(spec.visual.badge, "6");
    }

    #[test]
    fn test_cluster_spec_expands() {
        let spec = MarkerSpec::for_feature(&cluster(42, 5), &ctx(6.0));
        assert_eq!(spec.visual.text, "5");
        assert!(spec.visual.is_cluster);
        assert_eq!(
            spec.action,
            MarkerAction::ExpandCluster {
                cluster_id: 42,
                coordinates: LngLat::new(5.0, 52.0),
                generation: 1,
            }
        );
    }

    #[test]
    fn test_size_ignores_zoom() {
        let a = MarkerSpec::for_feature(&leaf("a", 52.0, 5.0, 1), &ctx(4.0));
        let b = MarkerSpec::for_feature(&leaf("a", 52.0, 5.0, 1), &ctx(15.0));
        assert_eq!(a.visual.size, b.visual.size);
        assert!(a.visual.scale < b.visual.scale);
    }
}
