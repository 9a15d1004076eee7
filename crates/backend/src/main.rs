mod config;
mod dataset;
mod graphql;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::http::HeaderValue;
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use config::Config;
use dataset::Dataset;
use graphql::Schema;

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

/// Build a cache-controlled static file router.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Build the full application router.
fn build_app(schema: Schema, config: &Config) -> Router {
    let static_files = Router::new()
        .nest(
            "/static",
            cached_static_router(&config.assets_dir, CACHE_1DAY),
        )
        .nest(
            "/dist",
            cached_static_router(&config.dist_dir, CACHE_IMMUTABLE),
        )
        .nest(
            "/assets",
            cached_static_router(&config.dist_dir.join("assets"), CACHE_IMMUTABLE),
        );

    let index_path = config.dist_dir.join("index.html");
    let index = get(move || serve_index(index_path.clone()));

    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/", index.clone())
        .route("/kaart", index)
        .with_state(schema)
        .merge(static_files)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    if config.mapbox_token.is_none() {
        tracing::warn!("MAPBOX_TOKEN is not set; the map will show its fallback panel");
    }

    let dataset = Dataset::load(&config.data_path).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Starting with an empty company feed");
        Dataset::empty()
    });

    let config = Arc::new(config);
    let schema = graphql::build_schema(config.clone(), Arc::new(dataset));
    let app = build_app(schema, &config);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server running at http://localhost:{}", config.port);
    tracing::info!("GraphiQL playground at http://localhost:{}/graphql", config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

async fn serve_index(path: PathBuf) -> Html<String> {
    // Serve the built frontend, fall back to a simple message
    match std::fs::read_to_string(&path) {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>Vacaturekaart</title></head>
<body>
<h1>Vacaturekaart</h1>
<p>Frontend not built yet. Visit <a href="/graphql">GraphiQL</a> to explore the API.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use vacaturekaart_shared::models::GeoPointInput;

    struct Dirs {
        assets: tempfile::TempDir,
        dist: tempfile::TempDir,
    }

    fn dirs() -> Dirs {
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join("companies.json"), "[]").unwrap();
        let dist = tempfile::tempdir().unwrap();
        std::fs::create_dir(dist.path().join("assets")).unwrap();
        std::fs::write(dist.path().join("app-abc123.js"), "bundle()").unwrap();
        std::fs::write(dist.path().join("assets").join("main-xyz.css"), "body{}").unwrap();
        Dirs { assets, dist }
    }

    fn app(dirs: &Dirs) -> Router {
        let assets = dirs.assets.path().to_string_lossy().to_string();
        let dist = dirs.dist.path().to_string_lossy().to_string();
        let config = Config::from_lookup(|key| match key {
            "ASSETS_DIR" => Some(assets.clone()),
            "DIST_DIR" => Some(dist.clone()),
            _ => None,
        })
        .unwrap();
        let inputs: Vec<GeoPointInput> = serde_json::from_str(
            r#"[{"id":"utr","name":"Bol.com","lat":52.09,"lng":5.12,"region":"Utrecht","weight":8}]"#,
        )
        .unwrap();
        let schema = graphql::build_schema(
            Arc::new(config.clone()),
            Arc::new(Dataset::from_inputs(&inputs)),
        );
        build_app(schema, &config)
    }

    async fn get_uri(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_static_files_have_1day_cache() {
        let dirs = dirs();
        let resp = get_uri(app(&dirs), "/static/companies.json").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=86400, must-revalidate"
        );
    }

    #[tokio::test]
    async fn test_bundles_have_immutable_cache() {
        let dirs = dirs();
        for uri in ["/dist/app-abc123.js", "/assets/main-xyz.css"] {
            let resp = get_uri(app(&dirs), uri).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
            assert_eq!(
                resp.headers().get("cache-control").unwrap(),
                "public, max-age=31536000, immutable"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_static_file_returns_404() {
        let dirs = dirs();
        let resp = get_uri(app(&dirs), "/static/nonexistent.txt").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_falls_back_when_not_built() {
        let dirs = dirs();
        let resp = get_uri(app(&dirs), "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Frontend not built yet"));
    }

    #[tokio::test]
    async fn test_map_route_serves_built_index() {
        let dirs = dirs();
        std::fs::write(dirs.dist.path().join("index.html"), "<html>kaart</html>").unwrap();
        let resp = get_uri(app(&dirs), "/kaart").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "<html>kaart</html>");
    }

    #[tokio::test]
    async fn test_graphql_post() {
        let dirs = dirs();
        let resp = app(&dirs)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"{ regions }"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["data"]["regions"], serde_json::json!(["Utrecht"]));
    }
}
