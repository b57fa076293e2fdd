use axum::{extract::Extension, Json};
use serde::Serialize;

/// Deployment identity reported by `/health`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppInfo {
    pub id: Option<String>,
    pub version: Option<String>,
}

pub async fn health_check(Extension(info): Extension<AppInfo>) -> Json<AppInfo> {
    Json(info)
}
