use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

use super::extract::is_pseudonymous;
use super::fields::{self, ChangeSet, FieldMap, PatientChanges, PATIENT_ID};
use crate::entities::{baby, patient, patient_entry, Baby, Patient, PatientEntry};
use crate::error::{is_unique_violation, TriageError, TriageResult};

pub const SURNAME_REQUIRED: &str = "Surname is required";
pub const PATIENT_ID_REQUIRED: &str = "Patient ID is required";
pub const ENTRY_NOT_FOUND: &str = "Patient entry does not exist";
pub const ACTIVE_ENTRY_EXISTS: &str = "Active entry already exists for this patient";

const DEFAULT_OPERATION: &str = "CS";
const NO_CONSENT_SURNAME: &str = "No Consent";

/// An entry together with its linked patient identity, if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub entry: patient_entry::Model,
    pub patient: Option<patient::Model>,
}

impl EntryRecord {
    /// Identifier flows use to address this entry: the external patient id when
    /// linked, otherwise the entry id.
    pub fn reference(&self) -> String {
        self.patient
            .as_ref()
            .map(|p| p.patient_id.clone())
            .unwrap_or_else(|| self.entry.id.to_string())
    }
}

impl From<(patient_entry::Model, Option<patient::Model>)> for EntryRecord {
    fn from((entry, patient): (patient_entry::Model, Option<patient::Model>)) -> Self {
        Self { entry, patient }
    }
}

pub(crate) fn active_condition() -> Condition {
    Condition::all()
        .add(patient_entry::Column::CompletionTime.is_null())
        .add(patient_entry::Column::OperationCancelled.eq(false))
}

pub(crate) fn not_found() -> TriageError {
    TriageError::NotFound(ENTRY_NOT_FOUND.to_string())
}

/// Registers a new episode.
///
/// With a `patient_id` the patient identity is upserted first and the entry is
/// claimed as that patient's single active entry; a second active claim fails
/// with [`TriageError::Conflict`] and rolls the whole operation back. The
/// surname then falls back to the patient's name. Without an identifier, a
/// standalone entry keyed by surname is created and the surname is required.
pub async fn create_entry(
    db: &DatabaseConnection,
    fields: &FieldMap,
    now: DateTime<Utc>,
) -> TriageResult<EntryRecord> {
    let identity = fields::value(fields, PATIENT_ID);
    if identity.is_none() && fields::value(fields, "surname").is_none() {
        return Err(TriageError::validation(SURNAME_REQUIRED));
    }
    let ChangeSet { entry: changes, patient: patient_changes } =
        ChangeSet::parse(fields).map_err(TriageError::Validation)?;
    let pseudonymous = identity.is_some_and(is_pseudonymous);

    // Identity-keyed flows may send only the patient's name
    let given_surname = changes.surname.clone().or_else(|| patient_changes.name.clone());
    let surname = match given_surname {
        Some(surname) if !pseudonymous && !surname.contains(NO_CONSENT_SURNAME) => surname,
        _ => format!(
            "Pt of {}",
            changes.clinician.as_deref().unwrap_or("unknown clinician")
        ),
    };

    let txn = db.begin().await?;

    let patient = match identity {
        Some(external_id) => {
            let mut patient =
                upsert_patient(&txn, external_id, &patient_changes, &surname, now).await?;
            if pseudonymous {
                let mut active: patient::ActiveModel = patient.clone().into();
                active.patient_id = Set(format!("9{:07}", patient.id));
                patient = active.update(&txn).await?;
            }
            Some(patient)
        }
        None => None,
    };
    let patient_key = patient.as_ref().map(|p| p.id);

    let model = patient_entry::ActiveModel {
        patient_id: Set(patient_key),
        active_key: Set(patient_key),
        surname: Set(surname),
        age: Set(changes.age),
        operation: Set(changes
            .operation
            .unwrap_or_else(|| DEFAULT_OPERATION.to_string())),
        gravidity: Set(changes.gravidity),
        parity: Set(changes.parity),
        comorbid: Set(changes.comorbid),
        indication: Set(changes.indication),
        clinician: Set(changes.clinician),
        location: Set(changes.location),
        outstanding_data: Set(changes.outstanding_data),
        urgency: Set(changes.urgency.unwrap_or_default().level()),
        decision_time: Set(changes.decision_time.unwrap_or(now)),
        completion_time: Set(None),
        operation_cancelled: Set(false),
        foetus: Set(changes.foetus),
        starvation_hours: Set(changes.starvation_hours),
        anesthetic_time: Set(changes.anesthetic_time),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let entry = match model.insert(&txn).await {
        Ok(entry) => entry,
        Err(e) if is_unique_violation(&e) => {
            return Err(TriageError::Conflict(ACTIVE_ENTRY_EXISTS.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    txn.commit().await?;

    info!(
        entry_id = entry.id,
        urgency = entry.urgency,
        linked = patient.is_some(),
        "Created patient entry"
    );
    crate::metrics::increment_entries_created();

    Ok(EntryRecord { entry, patient })
}

/// Applies recognised fields to the active entry named by `patient_id`.
/// Unknown keys are ignored; nothing is written unless every value parses.
pub async fn amend_entry(
    db: &DatabaseConnection,
    fields: &FieldMap,
    now: DateTime<Utc>,
) -> TriageResult<EntryRecord> {
    let reference = fields::value(fields, PATIENT_ID)
        .ok_or_else(|| TriageError::validation(PATIENT_ID_REQUIRED))?;
    let ChangeSet { entry: changes, patient: patient_changes } =
        ChangeSet::parse(fields).map_err(TriageError::Validation)?;

    let txn = db.begin().await?;
    let current = find_active(&txn, reference).await?.ok_or_else(not_found)?;

    let merged = changes.merge(&current.entry, now);
    let unchanged = patient_entry::Model {
        updated_at: current.entry.updated_at,
        ..merged.clone()
    } == current.entry;
    let entry = if unchanged {
        current.entry
    } else {
        patient_entry::ActiveModel::from(merged)
            .reset_all()
            .update(&txn)
            .await?
    };

    let patient = match current.patient {
        Some(existing) if patient_changes != PatientChanges::default() => {
            let mut active: patient::ActiveModel = existing.into();
            if let Some(name) = patient_changes.name {
                active.name = Set(name);
            }
            if let Some(age) = patient_changes.age {
                active.age = Set(Some(age));
            }
            active.updated_at = Set(now);
            Some(active.update(&txn).await?)
        }
        other => other,
    };
    txn.commit().await?;

    info!(entry_id = entry.id, "Amended patient entry");

    Ok(EntryRecord { entry, patient })
}

/// Finds the active entry for a flow reference: first by linked external
/// identifier (most recent decision wins), then by entry id.
pub async fn find_active<C: ConnectionTrait>(
    conn: &C,
    reference: &str,
) -> Result<Option<EntryRecord>, DbErr> {
    let by_identity = PatientEntry::find()
        .find_also_related(Patient)
        .filter(active_condition())
        .filter(patient::Column::PatientId.eq(reference))
        .order_by_desc(patient_entry::Column::DecisionTime)
        .one(conn)
        .await?;
    if let Some(found) = by_identity {
        return Ok(Some(found.into()));
    }

    let Ok(entry_id) = reference.trim().parse::<i32>() else {
        return Ok(None);
    };
    let by_id = PatientEntry::find_by_id(entry_id)
        .find_also_related(Patient)
        .filter(active_condition())
        .one(conn)
        .await?;
    Ok(by_id.map(EntryRecord::from))
}

/// Loads any entry by id, whatever its state, with its recorded babies.
pub async fn find_entry(
    db: &DatabaseConnection,
    entry_id: i32,
) -> Result<Option<(EntryRecord, Vec<baby::Model>)>, DbErr> {
    let Some(found) = PatientEntry::find_by_id(entry_id)
        .find_also_related(Patient)
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    let record = EntryRecord::from(found);
    let babies = record
        .entry
        .find_related(Baby)
        .order_by_asc(baby::Column::BabyNumber)
        .all(db)
        .await?;
    Ok(Some((record, babies)))
}

async fn upsert_patient<C: ConnectionTrait>(
    conn: &C,
    external_id: &str,
    changes: &PatientChanges,
    fallback_name: &str,
    now: DateTime<Utc>,
) -> Result<patient::Model, DbErr> {
    let mut update_columns = vec![patient::Column::Name, patient::Column::UpdatedAt];
    if changes.age.is_some() {
        update_columns.push(patient::Column::Age);
    }

    let model = patient::ActiveModel {
        patient_id: Set(external_id.to_string()),
        name: Set(changes
            .name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string())),
        age: Set(changes.age),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Patient::insert(model)
        .on_conflict(
            OnConflict::column(patient::Column::PatientId)
                .update_columns(update_columns)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Patient::find()
        .filter(patient::Column::PatientId.eq(external_id))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("patient {}", external_id)))
}
