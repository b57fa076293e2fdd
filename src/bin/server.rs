use axum::{http::HeaderValue, routing::get, Router};
use sea_orm::Database;
use std::sync::Arc;
use triage_board::api::{self, AppInfo, BoardHub, Services};
use triage_board::config::Config;
use triage_board::migrator;
use triage_board::notifications::{BoardRenderer, RedisNotifier};

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    let config = Config::from_env().expect("Invalid configuration");

    triage_board::telemetry::init_telemetry("triage-server", &config.telemetry);

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let redis_client = redis::Client::open(config.redis_url.as_str()).expect("Invalid Redis URL");

    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    triage_board::metrics::init_metrics(&db).await;

    let hub = BoardHub::new(16);
    api::live::start_board_relay(redis_client.clone(), hub.clone());

    let services = Services {
        db,
        notifier: Arc::new(RedisNotifier::new(redis_client)),
        hub,
        renderer: BoardRenderer::new().expect("Board templates must compile"),
        policy: config.board_policy,
        info: AppInfo {
            id: config.app_id.clone(),
            version: config.app_version.clone(),
        },
    };

    let cors_origin = config
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .expect("CORS_ALLOWED_ORIGIN must be a valid header value");
    let app = app(services, prometheus_layer, metric_handle, cors_origin);

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

fn app(
    services: Services,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
    cors_origin: HeaderValue,
) -> Router {
    api::router(services)
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    // Handlers fill in action, entry_id and error
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        action = tracing::field::Empty,
                        entry_id = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("status", tracing::field::display(response.status()));
                    span.record("latency", tracing::field::debug(latency));
                    tracing::info!("request completed");
                }),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
}
