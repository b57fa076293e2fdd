use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fields::{FieldMap, PATIENT_ID};
use crate::error::TriageError;

/// Category the flow engine uses for free-text answers.
pub const ALL_RESPONSES: &str = "All Responses";
/// Consent category meaning the patient declined to be identified.
pub const NO_CONSENT: &str = "no_consent";
/// Prefix of the pseudonymous identifier issued for patients without consent.
pub const NO_CONSENT_PREFIX: &str = "NO_CONSENT_";

const CHANGE_CATEGORY: &str = "change_category";
const NEW_VALUE: &str = "new_value";

/// Structured message posted by the flow engine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlowMessage {
    #[serde(default)]
    pub results: BTreeMap<String, FlowResult>,
}

/// One labelled answer. Extra keys such as `input` or `name` are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlowResult {
    pub category: String,
    #[serde(default)]
    pub value: String,
}

impl FlowResult {
    /// Free-text answers carry their value; choice answers are named by their category.
    pub fn answer(&self) -> &str {
        if self.category == ALL_RESPONSES {
            &self.value
        } else {
            &self.category
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    #[default]
    Default,
    /// Single-field amendment: `change_category` names the field, `new_value` carries it.
    EntryChanges,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl From<ExtractError> for TriageError {
    fn from(err: ExtractError) -> Self {
        TriageError::validation(err.to_string())
    }
}

pub fn extract(message: &FlowMessage, mode: ExtractMode) -> Result<FieldMap, ExtractError> {
    let mut answers: FieldMap = message
        .results
        .iter()
        .map(|(label, result)| (label.clone(), result.answer().to_string()))
        .collect();

    match mode {
        ExtractMode::EntryChanges => {
            let target = answers
                .remove(CHANGE_CATEGORY)
                .ok_or(ExtractError::MissingField(CHANGE_CATEGORY))?;
            let new_value = answers
                .remove(NEW_VALUE)
                .ok_or(ExtractError::MissingField(NEW_VALUE))?;

            let mut changes = FieldMap::new();
            changes.insert(target, new_value);
            // The carried reference addresses the entry even when it is the changed field
            if let Some(patient_id) = answers.remove(PATIENT_ID) {
                changes.insert(PATIENT_ID.to_string(), patient_id);
            }
            Ok(changes)
        }
        ExtractMode::Default => {
            if answers.get("consent").map(String::as_str) == Some(NO_CONSENT) {
                answers.insert(PATIENT_ID.to_string(), pseudonymous_id());
            }
            Ok(answers)
        }
    }
}

pub fn is_pseudonymous(patient_id: &str) -> bool {
    patient_id.starts_with(NO_CONSENT_PREFIX)
}

fn pseudonymous_id() -> String {
    let token: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(10)
        .collect();
    format!("{}{}", NO_CONSENT_PREFIX, token.to_ascii_uppercase())
}
