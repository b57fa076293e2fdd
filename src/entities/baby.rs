use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "babies")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,
    pub patient_entry_id: i32,
    pub baby_number: i32,
    pub delivery_time: DateTimeUtc,
    pub apgar_1: Option<i32>,
    pub apgar_5: Option<i32>,
    pub baby_weight_grams: Option<i32>,
    pub nicu: Option<bool>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patient_entry::Entity",
        from = "Column::PatientEntryId",
        to = "super::patient_entry::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    PatientEntry,
}

impl Related<super::patient_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PatientEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
