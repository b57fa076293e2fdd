use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::triage::{EntryView, Urgency};

const TABLE: &str = "board_table";
const PAGE: &str = "board_page";
const TITLE: &str = "CS Triage Board";

#[derive(Serialize)]
struct RowContext<'a> {
    #[serde(flatten)]
    entry: &'a EntryView,
    decided: String,
    completed_at: Option<String>,
    row_class: String,
}

impl<'a> From<&'a EntryView> for RowContext<'a> {
    fn from(entry: &'a EntryView) -> Self {
        let row_class = if entry.completed {
            "completed".to_string()
        } else {
            format!("urgency-{}", entry.urgency_colour.to_lowercase())
        };
        Self {
            entry,
            decided: entry.decision_time.format("%d %b %H:%M").to_string(),
            completed_at: entry
                .completion_time
                .map(|t| t.format("%d %b %H:%M").to_string()),
            row_class,
        }
    }
}

#[derive(Serialize)]
struct UrgencyOption {
    level: i32,
    label: &'static str,
}

#[derive(Serialize)]
struct PageContext<'a> {
    title: &'static str,
    search: &'a str,
    table: String,
    urgencies: Vec<UrgencyOption>,
    live: bool,
}

/// Renders the board table pushed to websocket clients and the full `/view` page.
#[derive(Clone)]
pub struct BoardRenderer {
    registry: Handlebars<'static>,
}

impl BoardRenderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_template_string(TABLE, include_str!("../../templates/board_table.hbs"))?;
        registry.register_template_string(PAGE, include_str!("../../templates/board_page.hbs"))?;
        Ok(Self { registry })
    }

    pub fn render_table(&self, rows: &[EntryView]) -> Result<String, RenderError> {
        let rows: Vec<RowContext> = rows.iter().map(RowContext::from).collect();
        self.registry
            .render(TABLE, &serde_json::json!({ "rows": rows }))
    }

    /// `live` pages replace their table with each broadcast snapshot; filtered
    /// pages stay static.
    pub fn render_page(
        &self,
        rows: &[EntryView],
        search: &str,
        live: bool,
    ) -> Result<String, RenderError> {
        let context = PageContext {
            title: TITLE,
            search,
            table: self.render_table(rows)?,
            urgencies: Urgency::ALL
                .into_iter()
                .map(|u| UrgencyOption {
                    level: u.level(),
                    label: u.label(),
                })
                .collect(),
            live,
        };
        self.registry.render(PAGE, &context)
    }
}

/// Text of the group chat message announcing a new entry.
pub fn new_entry_message(entry: &EntryView) -> String {
    let mut lines = vec![
        format!("New CS patient: {} ({})", entry.surname, entry.gravpar),
        format!(
            "Urgency: {} {} ({})",
            entry.urgency, entry.urgency_label, entry.urgency_colour
        ),
    ];

    let optional = [
        ("Age", entry.age.map(|a| a.to_string())),
        ("Indication", entry.indication.clone()),
        ("Comorbidities", entry.comorbid.clone()),
        ("Location", entry.location.clone()),
        ("Clinician", entry.clinician.clone()),
    ];
    for (label, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("{}: {}", label, value));
        }
    }

    lines.push(format!(
        "Decision time: {}",
        entry.decision_time.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.join("\n")
}
