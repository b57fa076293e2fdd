pub mod templates;
pub mod whatsapp;

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::triage::{EntryRecord, EntryView};

pub use templates::{new_entry_message, BoardRenderer};
pub use whatsapp::{GroupMessage, NotificationError, WhatsAppClient};

/// Redis list the worker consumes.
pub const JOB_QUEUE: &str = "triage_jobs";
/// Redis channel carrying rendered board snapshots.
pub const BOARD_CHANNEL: &str = "board_updates";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    RefreshBoard,
    SendGroupMessage { body: String },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::RefreshBoard => "refresh_board",
            Job::SendGroupMessage { .. } => "send_group_message",
        }
    }

    /// Serialises the job with the W3C trace context of `span`.
    pub fn encode(&self, span: &tracing::Span) -> Result<String, serde_json::Error> {
        let mut carrier: HashMap<String, String> = HashMap::new();
        TraceContextPropagator::new().inject_context(&span.context(), &mut carrier);

        let mut payload = serde_json::to_value(self)?;
        if !carrier.is_empty() {
            payload["trace_context"] = serde_json::to_value(carrier)?;
        }
        serde_json::to_string(&payload)
    }
}

/// Hands board-change side effects to the background job facility.
/// Implementations must not block the caller.
pub trait Notifier: Send + Sync {
    fn enqueue(&self, job: Job);
}

/// Signals that the board needs recomputing.
pub fn board_changed(notifier: &dyn Notifier) {
    notifier.enqueue(Job::RefreshBoard);
}

/// Board refresh plus the group announcement for a new entry.
pub fn entry_created(notifier: &dyn Notifier, record: &EntryRecord) {
    notifier.enqueue(Job::RefreshBoard);
    notifier.enqueue(Job::SendGroupMessage {
        body: new_entry_message(&EntryView::from(record)),
    });
}

/// Pushes jobs onto [`JOB_QUEUE`] from a spawned task.
#[derive(Clone)]
pub struct RedisNotifier {
    client: redis::Client,
}

impl RedisNotifier {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

impl Notifier for RedisNotifier {
    fn enqueue(&self, job: Job) {
        let name = job.name();
        let payload = match job.encode(&tracing::Span::current()) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Failed to encode {} job: {}", name, e);
                crate::metrics::increment_notifications_failed("queue");
                return;
            }
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            let pushed: redis::RedisResult<()> = async {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let _: () = conn.rpush(JOB_QUEUE, payload).await?;
                Ok(())
            }
            .await;

            match pushed {
                Ok(()) => tracing::debug!("Queued {} job", name),
                Err(e) => {
                    tracing::error!("Failed to queue {} job: {}", name, e);
                    crate::metrics::increment_notifications_failed("queue");
                }
            }
        });
    }
}
