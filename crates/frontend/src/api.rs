use serde::{Deserialize, Serialize};
use vacaturekaart_shared::models::{FilterInput, GeoPointInput};

const POINT_FIELDS: &str = "id name lat lng region weight items { id title }";

/// Build the variables JSON for a filtered query.
pub fn build_filter_variables(filter: &FilterInput) -> serde_json::Value {
    serde_json::json!({
        "filter": {
            "region": filter.region,
            "minWeight": filter.min_weight
        }
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

fn api_url() -> Result<String, String> {
    let window = web_sys::window().ok_or("No window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| "No location origin".to_string())?;
    Ok(format!("{}/graphql", origin))
}

async fn query<T: for<'de> Deserialize<'de>>(
    query_str: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, String> {
    let req = GraphQLRequest {
        query: query_str.to_string(),
        variables,
    };

    let resp = reqwest::Client::new()
        .post(api_url()?)
        .json(&req)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;

    if let Some(errors) = gql_resp.errors {
        if !errors.is_empty() {
            return Err(errors[0].message.clone());
        }
    }

    gql_resp.data.ok_or_else(|| "No data returned".to_string())
}

// Types mirroring the GraphQL schema

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfigData {
    pub access_token: Option<String>,
    pub style_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetData {
    pub point_count: u64,
    pub rejected_count: u64,
    pub loaded_at: String,
}

// API functions

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfigResponse {
    pub map_config: MapConfigData,
}

pub async fn fetch_map_config() -> Result<MapConfigData, String> {
    let resp: MapConfigResponse =
        query(r#"query { mapConfig { accessToken styleUrl } }"#, None).await?;
    Ok(resp.map_config)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPointsResponse {
    pub map_points: Vec<GeoPointInput>,
}

/// Company records in feed shape. Without a filter the full valid set comes back.
pub async fn fetch_map_points(filter: Option<&FilterInput>) -> Result<Vec<GeoPointInput>, String> {
    let resp: MapPointsResponse = match filter {
        Some(f) => {
            query(
                &format!(
                    "query MapPoints($filter: MapFilterInput) {{ mapPoints(filter: $filter) {{ {} }} }}",
                    POINT_FIELDS
                ),
                Some(build_filter_variables(f)),
            )
            .await?
        }
        None => query(&format!("query {{ mapPoints {{ {} }} }}", POINT_FIELDS), None).await?,
    };
    Ok(resp.map_points)
}

#[derive(Deserialize)]
pub struct RegionsResponse {
    pub regions: Vec<String>,
}

pub async fn fetch_regions() -> Result<Vec<String>, String> {
    let resp: RegionsResponse = query(r#"query { regions }"#, None).await?;
    Ok(resp.regions)
}

#[derive(Deserialize)]
pub struct DatasetResponse {
    pub dataset: DatasetData,
}

pub async fn fetch_dataset() -> Result<DatasetData, String> {
    let resp: DatasetResponse =
        query(r#"query { dataset { pointCount rejectedCount loadedAt } }"#, None).await?;
    Ok(resp.dataset)
}
