use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, InputObject, Object, SimpleObject};
use vacaturekaart_shared::{
    filter::{compute_fit_bounds, regions},
    heat::HeatLayer,
    models::{self, FilterState, RegionFilter},
};

use crate::config::Config;
use crate::dataset::Dataset;

// GraphQL output types

#[derive(SimpleObject)]
pub struct GqlMapConfig {
    /// `null` when the server has no Mapbox token; the client shows its fallback.
    pub access_token: Option<String>,
    pub style_url: String,
}

#[derive(SimpleObject, Clone)]
pub struct GqlPopupItem {
    pub id: String,
    pub title: String,
}

/// A validated company in feed shape, so clients can feed it straight back
/// into their own point preparation.
#[derive(SimpleObject)]
pub struct GqlMapPoint {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub region: String,
    pub weight: u32,
    pub items: Vec<GqlPopupItem>,
}

impl From<models::GeoPoint> for GqlMapPoint {
    fn from(p: models::GeoPoint) -> Self {
        GqlMapPoint {
            id: p.id,
            name: p.label,
            lat: p.latitude,
            lng: p.longitude,
            region: p.region,
            weight: p.weight,
            items: p
                .items
                .into_iter()
                .map(|i| GqlPopupItem {
                    id: i.id,
                    title: i.title,
                })
                .collect(),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlBoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

#[derive(SimpleObject)]
pub struct GqlFitBounds {
    pub bounds: GqlBoundingBox,
    pub max_zoom: f64,
    pub padding_px: f64,
}

#[derive(SimpleObject)]
pub struct GqlGradientStop {
    pub stop: f64,
    pub color: String,
}

#[derive(SimpleObject)]
pub struct GqlHeatmap {
    /// `[lat, lng, weight]` triples.
    pub points: Vec<Vec<f64>>,
    pub max: f64,
    pub radius_px: f64,
    pub blur_px: f64,
    pub gradient: Vec<GqlGradientStop>,
}

impl From<HeatLayer> for GqlHeatmap {
    fn from(h: HeatLayer) -> Self {
        GqlHeatmap {
            points: h.points.iter().map(|p| p.to_vec()).collect(),
            max: h.max,
            radius_px: h.radius_px,
            blur_px: h.blur_px,
            gradient: h
                .gradient
                .into_iter()
                .map(|(stop, color)| GqlGradientStop { stop, color })
                .collect(),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlRejection {
    pub id: String,
    pub reason: String,
}

#[derive(SimpleObject)]
pub struct GqlDatasetInfo {
    pub point_count: u64,
    pub rejected_count: u64,
    pub rejections: Vec<GqlRejection>,
    pub loaded_at: String,
}

// Input types

#[derive(InputObject, Default)]
pub struct MapFilterInput {
    /// Exact region name, or `"all"`.
    pub region: Option<String>,
    pub min_weight: Option<u32>,
}

impl From<MapFilterInput> for FilterState {
    fn from(input: MapFilterInput) -> Self {
        FilterState::new(
            input
                .region
                .as_deref()
                .map(RegionFilter::from_wire)
                .unwrap_or_default(),
            input.min_weight.unwrap_or(0),
        )
    }
}

/// A missing filter argument means "show everything".
fn filter_state(input: Option<MapFilterInput>) -> FilterState {
    input.map(FilterState::from).unwrap_or_default()
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn map_config(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlMapConfig> {
        let config = ctx.data::<Arc<Config>>()?;
        Ok(GqlMapConfig {
            access_token: config.mapbox_token.clone(),
            style_url: config.mapbox_style.clone(),
        })
    }

    async fn map_points(
        &self,
        ctx: &Context<'_>,
        filter: Option<MapFilterInput>,
    ) -> async_graphql::Result<Vec<GqlMapPoint>> {
        let dataset = ctx.data::<Arc<Dataset>>()?;
        Ok(dataset
            .filtered(&filter_state(filter))
            .into_iter()
            .map(GqlMapPoint::from)
            .collect())
    }

    async fn regions(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<String>> {
        let dataset = ctx.data::<Arc<Dataset>>()?;
        Ok(regions(&dataset.points))
    }

    /// `null` when the filter leaves nothing to fit.
    async fn fit_bounds(
        &self,
        ctx: &Context<'_>,
        filter: Option<MapFilterInput>,
    ) -> async_graphql::Result<Option<GqlFitBounds>> {
        let dataset = ctx.data::<Arc<Dataset>>()?;
        let fit = compute_fit_bounds(&dataset.filtered(&filter_state(filter)));
        Ok(fit.map(|f| GqlFitBounds {
            bounds: GqlBoundingBox {
                west: f.bounds.west,
                south: f.bounds.south,
                east: f.bounds.east,
                north: f.bounds.north,
            },
            max_zoom: f.max_zoom,
            padding_px: f.padding_px,
        }))
    }

    async fn heatmap(
        &self,
        ctx: &Context<'_>,
        filter: Option<MapFilterInput>,
    ) -> async_graphql::Result<GqlHeatmap> {
        let dataset = ctx.data::<Arc<Dataset>>()?;
        Ok(HeatLayer::from_points(&dataset.filtered(&filter_state(filter))).into())
    }

    async fn dataset(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlDatasetInfo> {
        let dataset = ctx.data::<Arc<Dataset>>()?;
        Ok(GqlDatasetInfo {
            point_count: dataset.points.len() as u64,
            rejected_count: dataset.rejected.len() as u64,
            rejections: dataset
                .rejected
                .iter()
                .map(|(id, reason)| GqlRejection {
                    id: id.clone(),
                    reason: reason.to_string(),
                })
                .collect(),
            loaded_at: dataset.loaded_at.to_rfc3339(),
        })
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema(config: Arc<Config>, dataset: Arc<Dataset>) -> Schema {
    async_graphql::Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(config)
        .data(dataset)
        .finish()
}
