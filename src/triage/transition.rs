use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::str::FromStr;
use tracing::info;

use super::fields::{self, parse_flag, parse_int, parse_timestamp, FieldMap, PATIENT_ID};
use super::reconcile::{find_active, not_found, EntryRecord, PATIENT_ID_REQUIRED};
use crate::entities::{baby, patient_entry, Baby};
use crate::error::{TriageError, TriageResult};

/// Status discriminator sent by the flow in the `option` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusOption {
    Delivery,
    Completed,
    NonDelivery,
    ChangeOrCancel,
}

impl StatusOption {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusOption::Delivery => "Delivery",
            StatusOption::Completed => "Completed",
            StatusOption::NonDelivery => "NonDelivery",
            StatusOption::ChangeOrCancel => "ChangeOrCancel",
        }
    }
}

impl FromStr for StatusOption {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Delivery" => Ok(StatusOption::Delivery),
            "Completed" => Ok(StatusOption::Completed),
            "NonDelivery" => Ok(StatusOption::NonDelivery),
            "ChangeOrCancel" => Ok(StatusOption::ChangeOrCancel),
            "" => Err(TriageError::UnsupportedOption("none given".to_string())),
            other => Err(TriageError::UnsupportedOption(other.to_string())),
        }
    }
}

/// One baby delivered during a `Delivery` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub foetus: i32,
    pub baby_number: i32,
    pub delivery_time: DateTime<Utc>,
    pub apgar_1: Option<i32>,
    pub apgar_5: Option<i32>,
    pub baby_weight_grams: Option<i32>,
    pub nicu: bool,
    pub starvation_hours: Option<i32>,
}

impl Delivery {
    pub fn parse(fields: &FieldMap, now: DateTime<Utc>) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let foetus = required(fields, "foetus", "Foetus count", &mut errors);
        let baby_number = required(fields, "baby_number", "Baby number", &mut errors);
        let delivery_time = optional(fields, "delivery_time", &mut errors, |v| {
            parse_timestamp("Delivery time", v)
        });
        let apgar_1 = optional(fields, "apgar_1", &mut errors, |v| parse_int("Apgar 1", v));
        let apgar_5 = optional(fields, "apgar_5", &mut errors, |v| parse_int("Apgar 5", v));
        let baby_weight_grams = optional(fields, "baby_weight_grams", &mut errors, |v| {
            parse_int("Baby weight", v)
        });
        let nicu = optional(fields, "nicu", &mut errors, |v| parse_flag("NICU", v));
        let starvation_hours = optional(fields, "starvation_hours", &mut errors, |v| {
            parse_int("Starvation hours", v)
        });

        if let (Some(foetus), Some(baby_number)) = (foetus, baby_number) {
            if foetus < 1 {
                errors.push("Foetus count must be at least 1".to_string());
            } else if baby_number < 1 || baby_number > foetus {
                errors.push("Baby number must be between 1 and the foetus count".to_string());
            }
        }

        match (foetus, baby_number) {
            (Some(foetus), Some(baby_number)) if errors.is_empty() => Ok(Delivery {
                foetus,
                baby_number,
                delivery_time: delivery_time.unwrap_or(now),
                apgar_1,
                apgar_5,
                baby_weight_grams,
                nicu: nicu.unwrap_or(false),
                starvation_hours,
            }),
            _ => Err(errors),
        }
    }

    /// The last expected baby concludes the episode.
    pub fn is_last(&self) -> bool {
        self.baby_number == self.foetus
    }
}

#[derive(Debug, Clone)]
pub struct Transitioned {
    pub record: EntryRecord,
    pub option: StatusOption,
    pub baby: Option<baby::Model>,
}

/// Computes the next state of `snapshot` for `option` without touching storage.
pub fn apply_option(
    option: StatusOption,
    fields: &FieldMap,
    snapshot: &patient_entry::Model,
    now: DateTime<Utc>,
) -> TriageResult<(patient_entry::Model, Option<Delivery>)> {
    let mut next = snapshot.clone();
    next.updated_at = now;
    let mut delivery = None;

    match option {
        StatusOption::Delivery => {
            let delivered = Delivery::parse(fields, now).map_err(TriageError::Validation)?;
            next.foetus = Some(delivered.foetus);
            if delivered.starvation_hours.is_some() {
                next.starvation_hours = delivered.starvation_hours;
            }
            if delivered.is_last() {
                next.completion_time = Some(now);
            }
            delivery = Some(delivered);
        }
        StatusOption::Completed => {
            let mut errors = Vec::new();
            let at = optional(fields, "completion_time", &mut errors, |v| {
                parse_timestamp("Completion time", v)
            });
            if !errors.is_empty() {
                return Err(TriageError::Validation(errors));
            }
            next.completion_time = Some(at.unwrap_or(now));
        }
        StatusOption::NonDelivery => {
            let mut errors = Vec::new();
            let anesthetic_time = optional(fields, "anesthetic_time", &mut errors, |v| {
                parse_timestamp("Anesthetic time", v)
            });
            let starvation_hours = optional(fields, "starvation_hours", &mut errors, |v| {
                parse_int("Starvation hours", v)
            });
            if !errors.is_empty() {
                return Err(TriageError::Validation(errors));
            }
            next.anesthetic_time = anesthetic_time.or(next.anesthetic_time);
            next.starvation_hours = starvation_hours.or(next.starvation_hours);
            next.completion_time = Some(now);
        }
        StatusOption::ChangeOrCancel => {
            next.operation_cancelled = true;
        }
    }

    if !next.is_active() {
        next.active_key = None;
    }
    Ok((next, delivery))
}

/// Moves the active entry named by `patient_id` along its lifecycle.
pub async fn transition_entry(
    db: &DatabaseConnection,
    fields: &FieldMap,
    now: DateTime<Utc>,
) -> TriageResult<Transitioned> {
    let reference = fields::value(fields, PATIENT_ID)
        .ok_or_else(|| TriageError::validation(PATIENT_ID_REQUIRED))?;

    let txn = db.begin().await?;
    let current = find_active(&txn, reference).await?.ok_or_else(not_found)?;
    let option: StatusOption = fields::value(fields, "option").unwrap_or_default().parse()?;
    let (next, delivery) = apply_option(option, fields, &current.entry, now)?;

    let entry = patient_entry::ActiveModel::from(next)
        .reset_all()
        .update(&txn)
        .await?;
    let baby = match delivery {
        Some(delivery) => Some(upsert_baby(&txn, entry.id, &delivery, now).await?),
        None => None,
    };
    txn.commit().await?;

    info!(
        entry_id = entry.id,
        option = option.as_str(),
        completed = entry.is_completed(),
        cancelled = entry.operation_cancelled,
        "Transitioned patient entry"
    );
    crate::metrics::increment_transitions(option.as_str());

    Ok(Transitioned {
        record: EntryRecord {
            entry,
            patient: current.patient,
        },
        option,
        baby,
    })
}

async fn upsert_baby<C: ConnectionTrait>(
    conn: &C,
    entry_id: i32,
    delivery: &Delivery,
    now: DateTime<Utc>,
) -> Result<baby::Model, DbErr> {
    let model = baby::ActiveModel {
        patient_entry_id: Set(entry_id),
        baby_number: Set(delivery.baby_number),
        delivery_time: Set(delivery.delivery_time),
        apgar_1: Set(delivery.apgar_1),
        apgar_5: Set(delivery.apgar_5),
        baby_weight_grams: Set(delivery.baby_weight_grams),
        nicu: Set(Some(delivery.nicu)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Baby::insert(model)
        .on_conflict(
            OnConflict::columns([baby::Column::PatientEntryId, baby::Column::BabyNumber])
                .update_columns([
                    baby::Column::DeliveryTime,
                    baby::Column::Apgar1,
                    baby::Column::Apgar5,
                    baby::Column::BabyWeightGrams,
                    baby::Column::Nicu,
                    baby::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Baby::find()
        .filter(baby::Column::PatientEntryId.eq(entry_id))
        .filter(baby::Column::BabyNumber.eq(delivery.baby_number))
        .one(conn)
        .await?
        .ok_or_else(|| {
            DbErr::RecordNotFound(format!("baby {} of entry {}", delivery.baby_number, entry_id))
        })
}

fn required(
    fields: &FieldMap,
    key: &str,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<i32> {
    match fields::value(fields, key) {
        None => {
            errors.push(format!("{} is required", label));
            None
        }
        Some(raw) => parse_int(label, raw).map_err(|e| errors.push(e)).ok(),
    }
}

fn optional<T>(
    fields: &FieldMap,
    key: &str,
    errors: &mut Vec<String>,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Option<T> {
    let raw = fields::value(fields, key)?;
    parse(raw).map_err(|e| errors.push(e)).ok()
}
