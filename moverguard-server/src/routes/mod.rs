use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;
use crate::handlers::{
    alerts, exclusions, health, library, logs, mover, operations, settings,
    webhooks,
};

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .route("/settings/{service}/test", post(settings::test_connection))
        .route("/tags/{service}", get(settings::tags))
        .route("/movies", get(library::movies))
        .route("/shows", get(library::shows))
        .route("/operations/build", post(operations::start_build))
        .route("/operations/build/sync", post(operations::build_sync))
        .route("/operations/tags", post(operations::run_tags))
        .route("/operations/full", post(operations::run_full))
        .route("/operations/status", get(operations::status))
        .route("/exclusions", get(exclusions::list))
        .route("/exclusions/stats", get(exclusions::stats))
        .route("/exclusions/download", get(exclusions::download))
        .route("/alerts", get(alerts::list))
        .route("/alerts/clear", post(alerts::clear))
        .route("/notifications/test", post(alerts::test_notification))
        .route("/logs/tail", get(logs::tail))
        .route("/logs/download", get(logs::download))
        .route("/mover/status", get(mover::status))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
}

/// Full application router with middleware applied.
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().server.cors_allowed_origins);

    Router::new()
        .route("/health", get(health::health))
        .route("/webhooks/radarr", post(webhooks::radarr))
        .route("/webhooks/sonarr", post(webhooks::sonarr))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
