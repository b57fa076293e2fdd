//! Webhooks called by the chat-flow engine.

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{entry_response, record_action};
use crate::error::{TriageError, TriageResult};
use crate::notifications::{self, Notifier};
use crate::triage::{
    self, fields, menus, reconcile::PATIENT_ID_REQUIRED, BoardPolicy, BoardQuery, ExtractMode,
    FlowMessage,
};

pub async fn new_entry(
    Extension(db): Extension<DatabaseConnection>,
    Extension(notifier): Extension<Arc<dyn Notifier>>,
    Json(message): Json<FlowMessage>,
) -> TriageResult<Response> {
    record_action("flow_new_entry", None);
    let fields = triage::extract(&message, ExtractMode::Default)?;
    let record = triage::create_entry(&db, &fields, Utc::now()).await?;

    record_action("flow_new_entry", Some(record.entry.id));
    notifications::entry_created(notifier.as_ref(), &record);
    Ok(entry_response(StatusCode::CREATED, &record))
}

pub async fn entry_exists(
    Extension(db): Extension<DatabaseConnection>,
    Json(message): Json<FlowMessage>,
) -> TriageResult<Response> {
    record_action("flow_entry_exists", None);
    let fields = triage::extract(&message, ExtractMode::Default)?;
    let reference = fields::value(&fields, fields::PATIENT_ID)
        .ok_or_else(|| TriageError::validation(PATIENT_ID_REQUIRED))?;

    match triage::find_active(&db, reference).await? {
        Some(record) => {
            record_action("flow_entry_exists", Some(record.entry.id));
            Ok(entry_response(StatusCode::OK, &record))
        }
        None => Ok((StatusCode::NOT_FOUND, Json(json!({}))).into_response()),
    }
}

pub async fn entry_changes(
    Extension(db): Extension<DatabaseConnection>,
    Extension(notifier): Extension<Arc<dyn Notifier>>,
    Json(message): Json<FlowMessage>,
) -> TriageResult<Response> {
    record_action("flow_entry_changes", None);
    let fields = triage::extract(&message, ExtractMode::EntryChanges)?;
    let record = triage::amend_entry(&db, &fields, Utc::now()).await?;

    record_action("flow_entry_changes", Some(record.entry.id));
    notifications::board_changed(notifier.as_ref());
    Ok(entry_response(StatusCode::OK, &record))
}

pub async fn entry_status(
    Extension(db): Extension<DatabaseConnection>,
    Extension(notifier): Extension<Arc<dyn Notifier>>,
    Json(message): Json<FlowMessage>,
) -> TriageResult<Response> {
    record_action("flow_entry_status", None);
    let fields = triage::extract(&message, ExtractMode::Default)?;
    let transitioned = triage::transition_entry(&db, &fields, Utc::now()).await?;

    record_action(
        transitioned.option.as_str(),
        Some(transitioned.record.entry.id),
    );
    notifications::board_changed(notifier.as_ref());
    Ok(entry_response(StatusCode::OK, &transitioned.record))
}

pub async fn patient_list(
    Extension(db): Extension<DatabaseConnection>,
    Extension(policy): Extension<BoardPolicy>,
) -> TriageResult<Response> {
    let rows = triage::list_active(&db, &BoardQuery::default(), &policy, Utc::now()).await?;
    let menu = menus::PatientMenu::from_board(&rows);
    Ok(Json(menu.to_json()).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SelectParams {
    #[serde(default)]
    patient_ids: String,
    #[serde(default)]
    option: String,
}

pub async fn patient_select(Query(params): Query<SelectParams>) -> Response {
    match menus::select_patient(&params.patient_ids, &params.option) {
        Some(patient_id) => Json(json!({ "patient_id": patient_id })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct MultiSelectParams {
    #[serde(default)]
    selections: String,
    #[serde(default)]
    options: String,
}

pub async fn multi_select(Query(params): Query<MultiSelectParams>) -> Json<menus::MultiSelection> {
    Json(menus::multi_select(&params.selections, &params.options))
}
