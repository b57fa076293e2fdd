use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::str::FromStr;

use super::reconcile::{active_condition, EntryRecord};
use super::urgency::Urgency;
use crate::entities::{baby, patient_entry, Patient, PatientEntry};

pub const DEFAULT_ROLLOVER_HOUR: u32 = 5;

/// When yesterday's completed entries drop off the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPolicy {
    /// UTC hour at which the board day starts.
    pub rollover_hour: u32,
}

impl Default for BoardPolicy {
    fn default() -> Self {
        Self {
            rollover_hour: DEFAULT_ROLLOVER_HOUR,
        }
    }
}

impl BoardPolicy {
    pub fn new(rollover_hour: u32) -> Result<Self, String> {
        if rollover_hour > 23 {
            return Err(format!("rollover hour {} is not within 0..=23", rollover_hour));
        }
        Ok(Self { rollover_hour })
    }

    /// Midnight UTC of the current board day.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let day = if now.hour() >= self.rollover_hour {
            now.date_naive()
        } else {
            now.date_naive() - Duration::days(1)
        };
        day.and_time(NaiveTime::MIN).and_utc()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Complete,
    Urgency(Urgency),
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("complete") {
            return Ok(StatusFilter::Complete);
        }
        Urgency::parse(s)
            .map(StatusFilter::Urgency)
            .map_err(|_| "Status must be 'complete' or an urgency from 1 to 5".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardQuery {
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
}

impl BoardQuery {
    /// Builds a query from raw request parameters. Blank values mean no filter.
    pub fn parse(search: Option<&str>, status: Option<&str>) -> Result<Self, String> {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse()?),
            None => None,
        };
        Ok(Self { search, status })
    }

    pub fn matches(&self, record: &EntryRecord) -> bool {
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let mut haystacks = vec![record.entry.surname.as_str()];
            if let Some(patient) = &record.patient {
                haystacks.push(&patient.name);
                haystacks.push(&patient.patient_id);
            }
            if !haystacks
                .iter()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        match self.status {
            None => true,
            Some(StatusFilter::Complete) => record.entry.is_completed(),
            Some(StatusFilter::Urgency(urgency)) => {
                !record.entry.is_completed() && record.entry.urgency == urgency.level()
            }
        }
    }
}

pub fn is_visible(entry: &patient_entry::Model, cutoff: DateTime<Utc>) -> bool {
    !entry.operation_cancelled && (!entry.is_completed() || entry.decision_time >= cutoff)
}

/// Filters and orders board rows: open entries before completed ones, each by
/// urgency, and most recent decision first within a tier.
pub fn build_board(
    rows: Vec<EntryRecord>,
    query: &BoardQuery,
    policy: &BoardPolicy,
    now: DateTime<Utc>,
) -> Vec<EntryRecord> {
    let cutoff = policy.cutoff(now);
    let mut rows: Vec<EntryRecord> = rows
        .into_iter()
        .filter(|r| is_visible(&r.entry, cutoff) && query.matches(r))
        .collect();
    rows.sort_by(|a, b| b.entry.decision_time.cmp(&a.entry.decision_time));
    rows.sort_by_key(|r| (r.entry.is_completed(), r.entry.urgency));
    rows
}

pub async fn list_active<C: ConnectionTrait>(
    db: &C,
    query: &BoardQuery,
    policy: &BoardPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<EntryRecord>, DbErr> {
    let cutoff = policy.cutoff(now);
    let rows = PatientEntry::find()
        .find_also_related(Patient)
        .filter(patient_entry::Column::OperationCancelled.eq(false))
        .filter(
            Condition::any()
                .add(patient_entry::Column::CompletionTime.is_null())
                .add(patient_entry::Column::DecisionTime.gte(cutoff)),
        )
        .all(db)
        .await?;

    let rows = rows.into_iter().map(EntryRecord::from).collect();
    Ok(build_board(rows, query, policy, now))
}

pub async fn count_active<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    PatientEntry::find().filter(active_condition()).count(db).await
}

/// Row as shown on the board and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub id: i32,
    pub patient_id: String,
    pub surname: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub operation: String,
    pub gravidity: Option<i32>,
    pub parity: Option<i32>,
    pub gravpar: String,
    pub comorbid: Option<String>,
    pub indication: Option<String>,
    pub clinician: Option<String>,
    pub location: Option<String>,
    pub outstanding_data: Option<String>,
    pub urgency: i32,
    pub urgency_label: &'static str,
    pub urgency_colour: &'static str,
    pub decision_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    pub completed: bool,
    pub operation_cancelled: bool,
    pub foetus: Option<i32>,
    pub starvation_hours: Option<i32>,
    pub anesthetic_time: Option<DateTime<Utc>>,
}

impl From<&EntryRecord> for EntryView {
    fn from(record: &EntryRecord) -> Self {
        let entry = &record.entry;
        let urgency = Urgency::from_level(entry.urgency).unwrap_or_default();
        Self {
            id: entry.id,
            patient_id: record.reference(),
            surname: entry.surname.clone(),
            name: record.patient.as_ref().map(|p| p.name.clone()),
            age: entry.age,
            operation: entry.operation.clone(),
            gravidity: entry.gravidity,
            parity: entry.parity,
            gravpar: entry.gravpar(),
            comorbid: entry.comorbid.clone(),
            indication: entry.indication.clone(),
            clinician: entry.clinician.clone(),
            location: entry.location.clone(),
            outstanding_data: entry.outstanding_data.clone(),
            urgency: entry.urgency,
            urgency_label: urgency.label(),
            urgency_colour: urgency.colour(),
            decision_time: entry.decision_time,
            completion_time: entry.completion_time,
            completed: entry.is_completed(),
            operation_cancelled: entry.operation_cancelled,
            foetus: entry.foetus,
            starvation_hours: entry.starvation_hours,
            anesthetic_time: entry.anesthetic_time,
        }
    }
}

/// An entry with its delivered babies, for the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: EntryView,
    pub babies: Vec<baby::Model>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::patient;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    fn record(id: i32, urgency: i32, decided: DateTime<Utc>) -> EntryRecord {
        EntryRecord {
            entry: patient_entry::Model {
                id,
                patient_id: None,
                active_key: None,
                surname: format!("Patient {}", id),
                age: None,
                operation: "CS".into(),
                gravidity: None,
                parity: None,
                comorbid: None,
                indication: None,
                clinician: None,
                location: None,
                outstanding_data: None,
                urgency,
                decision_time: decided,
                completion_time: None,
                operation_cancelled: false,
                foetus: None,
                starvation_hours: None,
                anesthetic_time: None,
                created_at: decided,
                updated_at: decided,
            },
            patient: None,
        }
    }

    fn completed(mut r: EntryRecord, at: DateTime<Utc>) -> EntryRecord {
        r.entry.completion_time = Some(at);
        r
    }

    fn ids(rows: &[EntryRecord]) -> Vec<i32> {
        rows.iter().map(|r| r.entry.id).collect()
    }

    #[test]
    fn cutoff_follows_rollover_hour() {
        let policy = BoardPolicy::default();
        assert_eq!(policy.cutoff(at(2, 8, 0)), at(2, 0, 0));
        assert_eq!(policy.cutoff(at(2, 4, 30)), at(1, 0, 0));
        assert_eq!(policy.cutoff(at(2, 5, 0)), at(2, 0, 0));
        assert!(BoardPolicy::new(24).is_err());
    }

    #[test]
    fn yesterdays_completed_entries_roll_off_after_rollover() {
        let policy = BoardPolicy::default();
        let rows = vec![
            completed(record(1, 2, at(1, 22, 0)), at(1, 23, 0)),
            record(2, 4, at(1, 21, 0)),
        ];

        let early = build_board(rows.clone(), &BoardQuery::default(), &policy, at(2, 4, 30));
        assert_eq!(ids(&early), vec![2, 1]);

        let later = build_board(rows, &BoardQuery::default(), &policy, at(2, 8, 0));
        assert_eq!(ids(&later), vec![2]);
    }

    #[test]
    fn cancelled_entries_are_never_shown() {
        let mut cancelled = record(1, 1, at(2, 7, 0));
        cancelled.entry.operation_cancelled = true;
        let rows = build_board(
            vec![cancelled, record(2, 3, at(2, 7, 0))],
            &BoardQuery::default(),
            &BoardPolicy::default(),
            at(2, 8, 0),
        );
        assert_eq!(ids(&rows), vec![2]);
    }

    #[test]
    fn open_entries_sort_by_urgency_then_latest_decision() {
        let rows = vec![
            record(1, 3, at(2, 6, 0)),
            completed(record(2, 1, at(2, 6, 30)), at(2, 7, 0)),
            record(3, 1, at(2, 6, 10)),
            record(4, 1, at(2, 7, 10)),
            record(5, 4, at(2, 5, 0)),
        ];
        let board = build_board(rows, &BoardQuery::default(), &BoardPolicy::default(), at(2, 8, 0));
        assert_eq!(ids(&board), vec![4, 3, 1, 5, 2]);
    }

    #[test]
    fn search_matches_surname_name_and_identifier() {
        let mut linked = record(1, 4, at(2, 6, 0));
        linked.patient = Some(patient::Model {
            id: 9,
            patient_id: "MRN-4471".into(),
            name: "Tariro Moyo".into(),
            age: None,
            created_at: at(2, 6, 0),
            updated_at: at(2, 6, 0),
        });
        let rows = vec![linked, record(2, 4, at(2, 6, 0))];
        let policy = BoardPolicy::default();

        for needle in ["moyo", "mrn-44", "PATIENT 1"] {
            let query = BoardQuery::parse(Some(needle), None).unwrap();
            assert_eq!(ids(&build_board(rows.clone(), &query, &policy, at(2, 8, 0))), vec![1]);
        }
    }

    #[test]
    fn status_filter_selects_completed_or_open_tier() {
        let rows = vec![
            record(1, 2, at(2, 6, 0)),
            completed(record(2, 2, at(2, 6, 0)), at(2, 7, 0)),
            record(3, 5, at(2, 6, 0)),
        ];
        let policy = BoardPolicy::default();

        let complete = BoardQuery::parse(None, Some("complete")).unwrap();
        assert_eq!(ids(&build_board(rows.clone(), &complete, &policy, at(2, 8, 0))), vec![2]);

        let urgent = BoardQuery::parse(None, Some("2")).unwrap();
        assert_eq!(ids(&build_board(rows, &urgent, &policy, at(2, 8, 0))), vec![1]);

        assert!(BoardQuery::parse(None, Some("7")).is_err());
        assert_eq!(BoardQuery::parse(Some(" "), Some("")).unwrap(), BoardQuery::default());
    }

    #[test]
    fn view_carries_derived_columns() {
        let mut r = record(7, 1, at(2, 6, 0));
        r.entry.gravidity = Some(2);
        let view = EntryView::from(&r);
        assert_eq!(view.patient_id, "7");
        assert_eq!(view.gravpar, "G2P-");
        assert_eq!(view.urgency_label, "Immediate");
        assert_eq!(view.urgency_colour, "Red");
        assert!(!view.completed);
    }
}
