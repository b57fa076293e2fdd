use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One clinical episode on the board, from decision to completion or cancellation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "patient_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,
    pub patient_id: Option<i32>,
    /// Linked patient id while the entry is active, NULL otherwise. Unique.
    #[sea_orm(unique)]
    #[serde(skip)]
    pub active_key: Option<i32>,
    pub surname: String,
    pub age: Option<i32>,
    pub operation: String,
    pub gravidity: Option<i32>,
    pub parity: Option<i32>,
    pub comorbid: Option<String>,
    pub indication: Option<String>,
    pub clinician: Option<String>,
    pub location: Option<String>,
    pub outstanding_data: Option<String>,
    pub urgency: i32,
    pub decision_time: DateTimeUtc,
    pub completion_time: Option<DateTimeUtc>,
    pub operation_cancelled: bool,
    pub foetus: Option<i32>,
    pub starvation_hours: Option<i32>,
    pub anesthetic_time: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn gravpar(&self) -> String {
        fn part(value: Option<i32>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        format!("G{}P{}", part(self.gravidity), part(self.parity))
    }

    pub fn is_active(&self) -> bool {
        self.completion_time.is_none() && !self.operation_cancelled
    }

    pub fn is_completed(&self) -> bool {
        self.completion_time.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Patient,
    #[sea_orm(has_many = "super::baby::Entity")]
    Baby,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::baby::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Baby.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
