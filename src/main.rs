mod automation;
mod cache_validator;
mod config;
mod db;
mod errors;
mod evaluator;
mod handlers;
mod models;
mod scoring;
mod store;
mod webhook_handler;
mod webhook_models;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::store::{CachedRuleStore, PgAdLeadStore, PgAuditLogStore, PgLeadStore, PgRuleStore};

/// Serves the OpenAPI specification YAML file.
///
/// Reads `openapi.yml` from the filesystem and serves it with the
/// appropriate content type; 404 when the file is missing.
async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page, configured to load the spec served by
/// `serve_openapi_spec`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Travloger Scoring API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Main entry point: logging, configuration, database, rule cache, routes
/// and middleware (CORS, rate limiting), then the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travloger_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool and ensure the schema
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Active-rule cache: rule sets are read on every calculation and change
    // rarely, so a short TTL keeps admin edits visible without hammering
    // the rules table
    let rule_cache = Cache::builder()
        .time_to_live(Duration::from_secs(config.rule_cache_ttl_secs))
        .max_capacity(1_000)
        .build();
    tracing::info!(
        "Rule cache initialized ({}s TTL)",
        config.rule_cache_ttl_secs
    );

    // Wire the stores: Postgres implementations behind the capability
    // traits, with the rule store cache-decorated
    let pg_rules = Arc::new(PgRuleStore::new(db.pool.clone()));
    let rule_store = Arc::new(CachedRuleStore::new(pg_rules, rule_cache));
    let lead_store = Arc::new(PgLeadStore::new(db.pool.clone()));
    let audit_store = Arc::new(PgAuditLogStore::new(db.pool.clone()));
    let ad_lead_store = Arc::new(PgAdLeadStore::new(db.pool.clone()));

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        config: config.clone(),
        rule_store,
        lead_store,
        audit_store,
        ad_lead_store,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        // Scoring endpoints
        .route(
            "/api/v1/scoring/calculate",
            post(handlers::calculate_score),
        )
        .route("/api/v1/scoring/automation", post(handlers::run_automation))
        // Rule management
        .route(
            "/api/v1/scoring/rules",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        .route(
            "/api/v1/scoring/rules/:id",
            put(handlers::update_rule).delete(handlers::delete_rule),
        )
        // Lead lookup (scorer's view of the lead collaborator)
        .route("/api/v1/leads/:id", get(handlers::get_lead))
        .route(
            "/api/v1/leads/:id/automation-log",
            get(handlers::get_lead_automation_log),
        )
        // Ad-platform lead webhook (direct lead creation with inline scoring)
        .route(
            "/api/v1/webhooks/ad-leads",
            post(webhook_handler::ad_lead_webhook),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
