#![allow(dead_code)]

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::sync::{Arc, Mutex};

use triage_board::api::{self, AppInfo, BoardHub, Services};
use triage_board::migrator::Migrator;
use triage_board::notifications::{BoardRenderer, Job, Notifier};
use triage_board::triage::{BoardPolicy, FieldMap};

/// Fresh in-memory database with the real schema.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to create in-memory database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

pub fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A time on 2026-03-`day`, UTC.
pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

/// Notifier that keeps every job for inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    jobs: Mutex<Vec<Job>>,
}

impl RecordingNotifier {
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, job: Job) {
        self.jobs.lock().unwrap().push(job);
    }
}

pub async fn create_test_app() -> (Router, DatabaseConnection, Arc<RecordingNotifier>) {
    let db = setup_db().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let services = Services {
        db: db.clone(),
        notifier: notifier.clone(),
        hub: BoardHub::new(4),
        renderer: BoardRenderer::new().unwrap(),
        policy: BoardPolicy::default(),
        info: AppInfo {
            id: Some("triage-test".into()),
            version: Some("1.2.3".into()),
        },
    };
    (api::router(services), db, notifier)
}
