use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;

use super::urgency::Urgency;
use crate::entities::patient_entry;

/// Flat key/value mapping produced by the extractor or a submitted form.
pub type FieldMap = BTreeMap<String, String>;

/// Reference to the target patient: an external identifier or an entry id.
pub const PATIENT_ID: &str = "patient_id";

/// Every attribute a flow or form may set on an entry or its patient identity.
/// Keys outside this table are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Surname,
    PatientName,
    Age,
    Operation,
    Gravidity,
    Parity,
    Comorbid,
    Indication,
    Clinician,
    Location,
    OutstandingData,
    Urgency,
    DecisionTime,
    Foetus,
    StarvationHours,
    AnestheticTime,
}

impl Field {
    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "surname" => Field::Surname,
            "name" => Field::PatientName,
            "age" => Field::Age,
            "operation" => Field::Operation,
            "gravidity" => Field::Gravidity,
            "parity" => Field::Parity,
            "comorbid" => Field::Comorbid,
            "indication" => Field::Indication,
            "clinician" => Field::Clinician,
            "location" => Field::Location,
            "outstanding_data" => Field::OutstandingData,
            "urgency" => Field::Urgency,
            "decision_time" => Field::DecisionTime,
            "foetus" => Field::Foetus,
            "starvation_hours" => Field::StarvationHours,
            "anesthetic_time" => Field::AnestheticTime,
            _ => return None,
        };
        Some(field)
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Surname => "Surname",
            Field::PatientName => "Name",
            Field::Age => "Age",
            Field::Operation => "Operation",
            Field::Gravidity => "Gravidity",
            Field::Parity => "Parity",
            Field::Comorbid => "Comorbidity",
            Field::Indication => "Indication",
            Field::Clinician => "Clinician",
            Field::Location => "Location",
            Field::OutstandingData => "Outstanding data",
            Field::Urgency => "Urgency",
            Field::DecisionTime => "Decision time",
            Field::Foetus => "Foetus count",
            Field::StarvationHours => "Starvation hours",
            Field::AnestheticTime => "Anesthetic time",
        }
    }
}

/// Typed changes to the entry itself. `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryChanges {
    pub surname: Option<String>,
    pub age: Option<i32>,
    pub operation: Option<String>,
    pub gravidity: Option<i32>,
    pub parity: Option<i32>,
    pub comorbid: Option<String>,
    pub indication: Option<String>,
    pub clinician: Option<String>,
    pub location: Option<String>,
    pub outstanding_data: Option<String>,
    pub urgency: Option<Urgency>,
    pub decision_time: Option<DateTime<Utc>>,
    pub foetus: Option<i32>,
    pub starvation_hours: Option<i32>,
    pub anesthetic_time: Option<DateTime<Utc>>,
}

/// Changes to the linked patient identity record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientChanges {
    pub name: Option<String>,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub entry: EntryChanges,
    pub patient: PatientChanges,
}

impl ChangeSet {
    /// Parses every recognised key, collecting one message per malformed value.
    /// Blank values count as absent.
    pub fn parse(fields: &FieldMap) -> Result<Self, Vec<String>> {
        let mut set = ChangeSet::default();
        let mut errors = Vec::new();

        for (key, raw) in fields {
            let Some(field) = Field::from_key(key) else {
                continue;
            };
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            if let Err(message) = set.assign(field, value) {
                errors.push(message);
            }
        }

        if errors.is_empty() {
            Ok(set)
        } else {
            Err(errors)
        }
    }

    fn assign(&mut self, field: Field, value: &str) -> Result<(), String> {
        let text = || Some(value.to_string());
        let entry = &mut self.entry;
        match field {
            Field::Surname => entry.surname = text(),
            Field::PatientName => self.patient.name = text(),
            Field::Age => {
                let age = parse_int(field.label(), value)?;
                entry.age = Some(age);
                self.patient.age = Some(age);
            }
            Field::Operation => entry.operation = text(),
            Field::Gravidity => entry.gravidity = Some(parse_int(field.label(), value)?),
            Field::Parity => entry.parity = Some(parse_int(field.label(), value)?),
            Field::Comorbid => entry.comorbid = text(),
            Field::Indication => entry.indication = text(),
            Field::Clinician => entry.clinician = text(),
            Field::Location => entry.location = text(),
            Field::OutstandingData => entry.outstanding_data = text(),
            Field::Urgency => entry.urgency = Some(Urgency::parse(value)?),
            Field::DecisionTime => {
                entry.decision_time = Some(parse_timestamp(field.label(), value)?)
            }
            Field::Foetus => entry.foetus = Some(parse_int(field.label(), value)?),
            Field::StarvationHours => {
                entry.starvation_hours = Some(parse_int(field.label(), value)?)
            }
            Field::AnestheticTime => {
                entry.anesthetic_time = Some(parse_timestamp(field.label(), value)?)
            }
        }
        Ok(())
    }
}

impl EntryChanges {
    /// Applies the changes on top of `snapshot`, returning the new record.
    pub fn merge(&self, snapshot: &patient_entry::Model, now: DateTime<Utc>) -> patient_entry::Model {
        fn pick<T: Clone>(change: &Option<T>, current: T) -> T {
            change.clone().unwrap_or(current)
        }
        fn pick_opt<T: Clone>(change: &Option<T>, current: &Option<T>) -> Option<T> {
            change.clone().or_else(|| current.clone())
        }

        let current = snapshot.clone();
        patient_entry::Model {
            surname: pick(&self.surname, current.surname),
            age: pick_opt(&self.age, &current.age),
            operation: pick(&self.operation, current.operation),
            gravidity: pick_opt(&self.gravidity, &current.gravidity),
            parity: pick_opt(&self.parity, &current.parity),
            comorbid: pick_opt(&self.comorbid, &current.comorbid),
            indication: pick_opt(&self.indication, &current.indication),
            clinician: pick_opt(&self.clinician, &current.clinician),
            location: pick_opt(&self.location, &current.location),
            outstanding_data: pick_opt(&self.outstanding_data, &current.outstanding_data),
            urgency: self.urgency.map_or(current.urgency, Urgency::level),
            decision_time: pick(&self.decision_time, current.decision_time),
            foetus: pick_opt(&self.foetus, &current.foetus),
            starvation_hours: pick_opt(&self.starvation_hours, &current.starvation_hours),
            anesthetic_time: pick_opt(&self.anesthetic_time, &current.anesthetic_time),
            updated_at: now,
            ..current
        }
    }
}

/// Returns the trimmed value for `key` when present and not blank.
pub fn value<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

pub fn parse_int(label: &str, raw: &str) -> Result<i32, String> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| format!("{} must be a whole number", label))
}

pub fn parse_flag(label: &str, raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        _ => Err(format!("{} must be yes or no", label)),
    }
}

/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM[:SS]±HH:MM` form flows send.
/// Times without an offset are taken as UTC.
pub fn parse_timestamp(label: &str, raw: &str) -> Result<DateTime<Utc>, String> {
    const WITH_OFFSET: [&str; 4] = [
        "%Y-%m-%d %H:%M%:z",
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M%z",
    ];
    const NAIVE: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in WITH_OFFSET {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed.and_utc());
        }
    }
    Err(format!("{} must be a date and time", label))
}

/// Flattens a JSON object into a field map. Nulls are dropped, scalars stringified.
pub fn from_json(object: serde_json::Map<String, serde_json::Value>) -> FieldMap {
    object
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, text))
        })
        .collect()
}
