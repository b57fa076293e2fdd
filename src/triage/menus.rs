use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::reconcile::EntryRecord;
use super::urgency::Urgency;

/// Lines per flow message; longer lists are split.
pub const MENU_CHUNK: usize = 10;

/// Numbered patient list sent to the flow, with the number→reference map it
/// hands back on selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatientMenu {
    pub lists: Vec<String>,
    pub patient_ids: String,
}

impl PatientMenu {
    /// Builds the menu from board rows, skipping completed entries.
    pub fn from_board(rows: &[EntryRecord]) -> Self {
        let open: Vec<&EntryRecord> = rows.iter().filter(|r| !r.entry.is_completed()).collect();

        let lines: Vec<String> = open
            .iter()
            .enumerate()
            .map(|(i, r)| menu_line(i + 1, r))
            .collect();
        let lists = lines.chunks(MENU_CHUNK).map(|c| c.join("\n")).collect();
        let patient_ids = open
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}={}", i + 1, r.reference()))
            .collect::<Vec<_>>()
            .join("|");

        Self { lists, patient_ids }
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (i, list) in self.lists.iter().enumerate() {
            body.insert(format!("patient_list_{}", i + 1), Value::from(list.as_str()));
        }
        body.insert("patient_ids".into(), Value::from(self.patient_ids.as_str()));
        body.insert("list_count".into(), Value::from(self.lists.len()));
        Value::Object(body)
    }
}

fn menu_line(number: usize, record: &EntryRecord) -> String {
    let entry = &record.entry;
    let colour = Urgency::from_level(entry.urgency).unwrap_or_default().colour();
    let parts = [
        entry.surname.as_str(),
        entry.operation.as_str(),
        entry.indication.as_deref().unwrap_or(""),
        colour,
    ];
    let text = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}) {}", number, text)
}

/// Resolves a numbered choice against a `"1=A|2=B"` map.
pub fn select_patient(patient_ids: &str, option: &str) -> Option<String> {
    let option = option.trim();
    patient_ids.split('|').find_map(|pair| {
        let (number, reference) = pair.split_once('=')?;
        (number.trim() == option).then(|| reference.trim().to_string())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiSelection {
    pub valid: bool,
    pub value: String,
}

impl MultiSelection {
    fn invalid() -> Self {
        Self {
            valid: false,
            value: String::new(),
        }
    }
}

/// Validates a comma-separated list of 1-based choices against `"a|b|c"`
/// options. The chosen labels come back distinct and in option order.
pub fn multi_select(selections: &str, options: &str) -> MultiSelection {
    let options: Vec<&str> = options.split('|').map(str::trim).collect();

    let mut chosen = BTreeSet::new();
    for raw in selections.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match raw.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => {
                chosen.insert(n);
            }
            _ => return MultiSelection::invalid(),
        }
    }
    if chosen.is_empty() {
        return MultiSelection::invalid();
    }

    let value = chosen
        .into_iter()
        .map(|n| options[n - 1])
        .collect::<Vec<_>>()
        .join(", ");
    MultiSelection { valid: true, value }
}
