//! Wish Tree API Server
//!
//! REST API for the New Year wish tree page: random predictions, visitor
//! wishes, recent wish listing and stats.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;

pub use config::{LogFormat, ServerConfig};
pub use error::ApiError;

use rate_limit::RateLimitError;
use wishtree_storage::Repository;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus renderer, installed by the binary only
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub predictions: u64,
    pub total_wishes: u64,
}

/// Create the application router
pub fn create_router(
    state: Arc<AppState>,
    config: &ServerConfig,
) -> Result<Router, RateLimitError> {
    let mut wish_routes = Router::new().route("/api/wish/add", post(routes::wishes::add_wish));
    if config.rate_limit.enabled {
        let governor = rate_limit::create_governor_config(&config.rate_limit)?;
        wish_routes = wish_routes.layer(GovernorLayer { config: governor });
    }

    let index = ServeFile::new(config.static_dir.join("index.html"));

    let router = Router::new()
        .route("/api/prediction/random", get(routes::predictions::get_random))
        .route("/api/wishes/recent", get(routes::wishes::get_recent))
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(wish_routes)
        .route_service("/", index)
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

/// Health check handler
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let predictions = state.repository.prediction_count().await?;
    let total_wishes = state.repository.get_wish_count().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        predictions,
        total_wishes,
    }))
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(
    level: &str,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
}

/// Initialize the database and serve until Ctrl-C
pub async fn run_server(
    config: ServerConfig,
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    let repository = Repository::new(&config.database_path);
    repository
        .initialize()
        .await
        .context("Failed to initialize database")?;

    let mut state = AppState::new(repository);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = create_router(Arc::new(state), &config)?;

    let addr = config.bind_address();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request};
    use crate::rate_limit::RateLimitConfig;
    use serde_json::{json, Value};
    use sqlx::Connection;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wishtree_storage::Color;

    fn is_palette_color(value: &Value) -> bool {
        let name = value.as_str().unwrap();
        Color::PALETTE.iter().any(|color| color.as_str() == name)
    }

    fn test_config(dir: &TempDir) -> ServerConfig {
        ServerConfig {
            database_path: dir.path().join("wishes.db"),
            static_dir: dir.path().to_path_buf(),
            rate_limit: RateLimitConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn app_with(dir: &TempDir, initialize: bool) -> Router {
        let config = test_config(dir);
        let repository = Repository::new(&config.database_path);
        if initialize {
            repository.initialize().await.unwrap();
        }
        create_router(Arc::new(AppState::new(repository)), &config).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_wish(body: Value) -> Request<Body> {
        post_raw(body.to_string())
    }

    fn post_raw(body: String) -> Request<Body> {
        Request::post("/api/wish/add")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_random_prediction() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        let (status, body) = send(&app, get_req("/api/prediction/random")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let id = body["prediction"]["id"].as_i64().unwrap();
        assert!((1..=10).contains(&id));
        assert!(!body["prediction"]["text"].as_str().unwrap().is_empty());
        assert!(is_palette_color(&body["prediction"]["color"]));
    }

    #[tokio::test]
    async fn test_random_prediction_not_found() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        let url = format!("sqlite:{}", dir.path().join("wishes.db").display());
        let mut conn = sqlx::SqliteConnection::connect(&url).await.unwrap();
        sqlx::query("DELETE FROM predictions")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();

        let (status, body) = send(&app, get_req("/api/prediction/random")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "error": "No predictions found"}));
    }

    #[tokio::test]
    async fn test_add_wish() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        let (status, body) = send(&app, post_wish(json!({"text": "  Happy New Year!  "}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Шарик добавлен на ёлку!");
        assert_eq!(body["wish"]["text"], "Happy New Year!");
        assert!(is_palette_color(&body["wish"]["color"]));
        assert!(body["wish"]["created_at"].is_string());

        let first_id = body["wish"]["id"].as_i64().unwrap();
        let (_, body) = send(&app, post_wish(json!({"text": "second"}))).await;
        assert!(body["wish"]["id"].as_i64().unwrap() > first_id);
    }

    #[tokio::test]
    async fn test_add_wish_rejects_empty() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        for request in [
            post_wish(json!({"text": ""})),
            post_wish(json!({"text": "   \n\t"})),
            post_wish(json!({})),
            post_wish(json!({"text": null})),
            post_wish(json!({"text": 42})),
            post_raw("{not json".to_string()),
        ] {
            let (status, body) = send(&app, request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Текст пожелания не может быть пустым");
        }

        let (_, stats) = send(&app, get_req("/api/stats")).await;
        assert_eq!(stats["total_wishes"], 0);
    }

    #[tokio::test]
    async fn test_add_wish_rejects_too_long() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        let (status, body) = send(&app, post_wish(json!({"text": "a".repeat(201)}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Пожелание слишком длинное (макс. 200 символов)");

        let (status, _) = send(&app, post_wish(json!({"text": "ё".repeat(200)}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_wish_storage_failure_is_generic() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, false).await;

        let (status, body) = send(&app, post_wish(json!({"text": "hello"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"success": false, "error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_recent_wishes() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        let (status, body) = send(&app, get_req("/api/wishes/recent")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "wishes": [], "count": 0}));

        for i in 0..25 {
            send(&app, post_wish(json!({"text": format!("wish {i}")}))).await;
        }

        let (_, body) = send(&app, get_req("/api/wishes/recent")).await;
        assert_eq!(body["count"], 20);

        let (_, body) = send(&app, get_req("/api/wishes/recent?limit=3")).await;
        assert_eq!(body["count"], 3);
        let texts: Vec<&str> = body["wishes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["wish 24", "wish 23", "wish 22"]);

        let (status, body) = send(&app, get_req("/api/wishes/recent?limit=oops")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 20);

        let (_, body) = send(&app, get_req("/api/wishes/recent?limit=-1")).await;
        assert_eq!(body["count"], 0);

        let (status, body) = send(&app, get_req("/api/wishes/recent?limit=5&limit=6")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 5);

        let (status, body) = send(&app, get_req("/api/wishes/recent?limit=%FF")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 20);
    }

    #[tokio::test]
    async fn test_wish_rate_limit_returns_json() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            rate_limit: RateLimitConfig::default(),
            ..test_config(&dir)
        };
        let repository = Repository::new(&config.database_path);
        repository.initialize().await.unwrap();
        let app = create_router(Arc::new(AppState::new(repository)), &config).unwrap();

        let from = |ip: [u8; 4], text: &str| {
            let mut request = post_wish(json!({ "text": text }));
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((ip, 5))));
            request
        };

        for i in 0..config.rate_limit.burst_size {
            let (status, _) = send(&app, from([1, 2, 3, 4], &format!("wish {i}"))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, from([1, 2, 3, 4], "one too many")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Too many requests"));

        let (status, _) = send(&app, from([5, 6, 7, 8], "other visitor")).await;
        assert_eq!(status, StatusCode::OK);

        let (_, stats) = send(&app, get_req("/api/stats")).await;
        assert_eq!(stats["total_wishes"], config.rate_limit.burst_size + 1);
    }

    #[tokio::test]
    async fn test_stats_and_health() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        send(&app, post_wish(json!({"text": "one"}))).await;
        send(&app, post_wish(json!({"text": "two"}))).await;

        let (status, body) = send(&app, get_req("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "total_wishes": 2}));

        let (status, body) = send(&app, get_req("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["predictions"], 10);
        assert_eq!(body["total_wishes"], 2);
    }

    #[tokio::test]
    async fn test_metrics_absent_without_recorder() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        let response = app.oneshot(get_req("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_page_is_served() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>ёлка</h1>").unwrap();
        let app = app_with(&dir, true).await;

        let response = app.oneshot(get_req("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), "<h1>ёлка</h1>");
    }

    #[tokio::test]
    async fn test_first_wish_scenario() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, true).await;

        let (status, added) = send(&app, post_wish(json!({"text": "Happy New Year!"}))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, stats) = send(&app, get_req("/api/stats")).await;
        assert_eq!(stats["total_wishes"], 1);

        let (_, recent) = send(&app, get_req("/api/wishes/recent?limit=20")).await;
        assert_eq!(recent["count"], 1);
        assert_eq!(recent["wishes"][0], added["wish"]);
    }
}
