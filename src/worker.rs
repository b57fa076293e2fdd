use chrono::Utc;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use redis::AsyncCommands;
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::notifications::{
    BoardRenderer, Job, NotificationError, WhatsAppClient, BOARD_CHANNEL, JOB_QUEUE,
};
use crate::triage::{list_active, BoardPolicy, BoardQuery, EntryView};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("storage error: {0}")]
    Storage(#[from] DbErr),
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

/// Everything a job handler needs besides its redis connection.
#[derive(Clone)]
pub struct WorkerContext {
    pub db: DatabaseConnection,
    pub renderer: BoardRenderer,
    pub whatsapp: WhatsAppClient,
    pub policy: BoardPolicy,
}

pub async fn start_queue_monitor(redis_client: redis::Client) {
    let redis_client = Arc::new(redis_client);

    tokio::spawn(async move {
        tracing::info!("Queue Monitor started");
        loop {
            let mut conn = match redis_client.get_multiplexed_async_connection().await {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Queue Monitor: Failed to get redis conn: {}", e);
                    tokio::time::sleep(tokio::time::Duration::from_secs(15)).await;
                    continue;
                }
            };

            let depth: redis::RedisResult<u64> = conn.llen(JOB_QUEUE).await;
            match depth {
                Ok(len) => crate::metrics::set_queue_depth(JOB_QUEUE, len),
                Err(e) => tracing::error!("Failed to get {} len: {}", JOB_QUEUE, e),
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(15)).await;
        }
    });
}

pub async fn start_workers(redis_client: redis::Client, context: WorkerContext, concurrency: usize) {
    start_queue_monitor(redis_client.clone()).await;

    let redis_client = Arc::new(redis_client);
    let context = Arc::new(context);

    for i in 0..concurrency {
        let redis_client = redis_client.clone();
        let context = context.clone();

        tokio::spawn(async move {
            tracing::info!("Worker {} started", i);
            loop {
                let mut conn = match redis_client.get_multiplexed_async_connection().await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::error!("Worker {}: Failed to get redis conn: {}", i, e);
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let result: redis::RedisResult<(String, String)> =
                    conn.blpop(JOB_QUEUE, 0.0).await;

                match result {
                    Ok((_key, payload_str)) => {
                        let payload: Value = match serde_json::from_str(&payload_str) {
                            Ok(v) => v,
                            Err(e) => {
                                tracing::error!("Worker {}: Bad payload: {}", i, e);
                                continue;
                            }
                        };
                        let job: Job = match serde_json::from_value(payload.clone()) {
                            Ok(job) => job,
                            Err(e) => {
                                tracing::error!("Worker {}: Unknown job: {}", i, e);
                                continue;
                            }
                        };

                        process_job(job, &payload, &context, &mut conn).await;
                    }
                    Err(e) => {
                        tracing::error!("Worker {}: Redis error: {}", i, e);
                        tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }
}

async fn process_job(
    job: Job,
    payload: &Value,
    context: &WorkerContext,
    redis_conn: &mut redis::aio::MultiplexedConnection,
) {
    let parent_context = if let Some(carrier_map) = payload["trace_context"].as_object() {
        let carrier: HashMap<String, String> = carrier_map
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().unwrap_or("").to_string()))
            .collect();
        TraceContextPropagator::new().extract(&carrier)
    } else {
        opentelemetry::Context::new()
    };

    let name = job.name();
    let span = tracing::info_span!("process_job", "otel.name" = name, job = name);
    span.set_parent(parent_context);

    let start_time = std::time::Instant::now();
    let outcome: Result<(), JobError> = async {
        tracing::info!("Dequeued {} job from {}", name, JOB_QUEUE);
        match job {
            Job::RefreshBoard => {
                let table = render_board(context).await?;
                let receivers: u64 = redis_conn.publish(BOARD_CHANNEL, table).await?;
                crate::metrics::refresh_active_entries(&context.db).await;
                tracing::info!("Published board to {} subscriber(s)", receivers);
                Ok(())
            }
            Job::SendGroupMessage { body } => context
                .whatsapp
                .send_group_message(&body)
                .await
                .map_err(JobError::from),
        }
    }
    .instrument(span.clone())
    .await;

    crate::metrics::record_job_duration(name, start_time.elapsed().as_secs_f64());

    if let Err(e) = outcome {
        let _enter = span.enter();
        tracing::error!("Job {} failed: {}", name, e);
    }
}

/// Current board as the table HTML pushed to live views.
pub async fn render_board(context: &WorkerContext) -> Result<String, JobError> {
    let rows = list_active(&context.db, &BoardQuery::default(), &context.policy, Utc::now()).await?;
    let views: Vec<EntryView> = rows.iter().map(EntryView::from).collect();
    Ok(context.renderer.render_table(&views)?)
}
