use sea_orm::DatabaseConnection;

use crate::triage::board::count_active;

pub async fn init_metrics(db: &DatabaseConnection) {
    let active = count_active(db).await.unwrap_or(0);
    set_active_entries(active);

    tracing::info!("Initialized metrics: ActiveEntries={}", active);
}

/// Refreshes the active-entry gauge after a board change.
pub async fn refresh_active_entries(db: &DatabaseConnection) {
    match count_active(db).await {
        Ok(active) => set_active_entries(active),
        Err(e) => tracing::warn!("Failed to count active entries: {}", e),
    }
}

fn set_active_entries(count: u64) {
    metrics::gauge!("triage_active_entries").set(count as f64);
}

pub fn increment_entries_created() {
    metrics::counter!("triage_entries_created_total").increment(1);
}

pub fn increment_transitions(option: &str) {
    metrics::counter!("triage_transitions_total", "option" => option.to_string()).increment(1);
}

pub fn increment_rejections(kind: &str) {
    metrics::counter!("triage_rejections_total", "kind" => kind.to_string()).increment(1);
}

pub fn increment_notifications_sent(channel: &str) {
    metrics::counter!("triage_notifications_sent_total", "channel" => channel.to_string()).increment(1);
}

pub fn increment_notifications_failed(channel: &str) {
    metrics::counter!("triage_notifications_failed_total", "channel" => channel.to_string()).increment(1);
}

pub fn set_queue_depth(queue: &str, depth: u64) {
    metrics::gauge!("triage_queue_depth", "queue" => queue.to_string()).set(depth as f64);
}

pub fn record_job_duration(job: &str, seconds: f64) {
    metrics::histogram!("triage_job_duration_seconds", "job" => job.to_string()).record(seconds);
}
