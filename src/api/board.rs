use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{entry_response, record_action};
use crate::error::{TriageError, TriageResult};
use crate::notifications::{self, BoardRenderer, Notifier};
use crate::triage::{
    self, fields, reconcile::ENTRY_NOT_FOUND, BoardPolicy, BoardQuery, EntryDetail, EntryView,
};

#[derive(Debug, Default, Deserialize)]
pub struct BoardParams {
    search: Option<String>,
    status: Option<String>,
}

impl BoardParams {
    fn query(&self) -> TriageResult<BoardQuery> {
        BoardQuery::parse(self.search.as_deref(), self.status.as_deref())
            .map_err(TriageError::validation)
    }
}

pub async fn list_entries(
    Extension(db): Extension<DatabaseConnection>,
    Extension(policy): Extension<BoardPolicy>,
    Query(params): Query<BoardParams>,
) -> TriageResult<Json<Vec<EntryView>>> {
    let query = params.query()?;
    let rows = triage::list_active(&db, &query, &policy, Utc::now()).await?;
    Ok(Json(rows.iter().map(EntryView::from).collect()))
}

/// Form path: a flat JSON object of entry fields.
pub async fn create_entry(
    Extension(db): Extension<DatabaseConnection>,
    Extension(notifier): Extension<Arc<dyn Notifier>>,
    Json(payload): Json<Map<String, Value>>,
) -> TriageResult<Response> {
    record_action("create_entry", None);
    let fields = fields::from_json(payload);
    let record = triage::create_entry(&db, &fields, Utc::now()).await?;

    record_action("create_entry", Some(record.entry.id));
    notifications::entry_created(notifier.as_ref(), &record);
    Ok(entry_response(StatusCode::CREATED, &record))
}

pub async fn get_entry(
    Extension(db): Extension<DatabaseConnection>,
    Path(entry_id): Path<i32>,
) -> TriageResult<Json<EntryDetail>> {
    let (record, babies) = triage::find_entry(&db, entry_id)
        .await?
        .ok_or_else(|| TriageError::NotFound(ENTRY_NOT_FOUND.to_string()))?;
    Ok(Json(EntryDetail {
        entry: EntryView::from(&record),
        babies,
    }))
}

pub async fn view(
    Extension(db): Extension<DatabaseConnection>,
    Extension(policy): Extension<BoardPolicy>,
    Extension(renderer): Extension<BoardRenderer>,
    Query(params): Query<BoardParams>,
) -> TriageResult<Response> {
    let query = params.query()?;
    let rows = triage::list_active(&db, &query, &policy, Utc::now()).await?;
    let views: Vec<EntryView> = rows.iter().map(EntryView::from).collect();
    let live = query == BoardQuery::default();

    match renderer.render_page(&views, params.search.as_deref().unwrap_or(""), live) {
        Ok(page) => Ok(Html(page).into_response()),
        Err(e) => {
            tracing::error!("Failed to render board page: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"errors": "Failed to render board"})),
            )
                .into_response())
        }
    }
}
