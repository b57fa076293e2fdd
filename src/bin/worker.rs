use sea_orm::Database;
use triage_board::config::Config;
use triage_board::notifications::{BoardRenderer, WhatsAppClient};
use triage_board::worker::{self, WorkerContext};

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    let config = Config::from_env().expect("Invalid configuration");

    triage_board::telemetry::init_telemetry("triage-worker", &config.telemetry);

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    // Spawn metrics server
    tokio::spawn(async move {
        let app = axum::Router::new()
            .route(
                "/metrics",
                axum::routing::get(|| async move { metric_handle.render() }),
            )
            .layer(prometheus_layer);
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 9091));
        tracing::info!("Metrics server listening on {}", addr);
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!("Metrics server stopped: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to bind metrics server: {}", e),
        }
    });

    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let redis_client = redis::Client::open(config.redis_url.as_str()).expect("Invalid Redis URL");

    let context = WorkerContext {
        db,
        renderer: BoardRenderer::new().expect("Board templates must compile"),
        whatsapp: WhatsAppClient::new(&config.whatsapp),
        policy: config.board_policy,
    };

    tracing::info!("Starting background worker...");

    worker::start_workers(redis_client, context, config.worker_concurrency).await;

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down worker process"),
        Err(err) => tracing::error!("Unable to listen for shutdown signal: {}", err),
    }
}
