pub mod board;
pub mod flow;
pub mod health;
pub mod live;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::notifications::{BoardRenderer, Notifier};
use crate::triage::{BoardPolicy, EntryRecord, EntryView};

pub use health::AppInfo;
pub use live::BoardHub;

/// Shared services handed to every handler through extensions.
#[derive(Clone)]
pub struct Services {
    pub db: DatabaseConnection,
    pub notifier: Arc<dyn Notifier>,
    pub hub: BoardHub,
    pub renderer: BoardRenderer,
    pub policy: BoardPolicy,
    pub info: AppInfo,
}

/// Success body: the entry plus an empty `errors` string, as flows expect.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    #[serde(flatten)]
    pub entry: EntryView,
    pub errors: String,
}

impl From<&EntryRecord> for EntryResponse {
    fn from(record: &EntryRecord) -> Self {
        Self {
            entry: EntryView::from(record),
            errors: String::new(),
        }
    }
}

pub(crate) fn entry_response(status: StatusCode, record: &EntryRecord) -> Response {
    (status, Json(EntryResponse::from(record))).into_response()
}

/// Fills the request span fields declared by the server's trace layer.
pub(crate) fn record_action(action: &str, entry_id: Option<i32>) {
    let span = tracing::Span::current();
    span.record("action", action);
    if let Some(id) = entry_id {
        span.record("entry_id", id);
    }
}

pub fn router(services: Services) -> Router {
    let flow_routes = Router::new()
        .route("/new-entry", post(flow::new_entry))
        .route("/entry-exists", post(flow::entry_exists))
        .route("/entry-changes", post(flow::entry_changes))
        .route("/entry-status", post(flow::entry_status))
        .route("/patient-list", get(flow::patient_list))
        .route("/patient-select", get(flow::patient_select))
        .route("/multi-select", get(flow::multi_select));

    let entry_routes = Router::new()
        .route("/", get(board::list_entries).post(board::create_entry))
        .route("/:id", get(board::get_entry));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/view", get(board::view))
        .route("/ws/board", get(live::board_socket))
        .nest("/api/entries", entry_routes)
        .nest("/api/flow", flow_routes)
        .layer(Extension(services.db))
        .layer(Extension(services.notifier))
        .layer(Extension(services.hub))
        .layer(Extension(services.renderer))
        .layer(Extension(services.policy))
        .layer(Extension(services.info))
}
