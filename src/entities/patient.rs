use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Identity record for entries registered against an external patient identifier.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,
    #[sea_orm(unique)]
    pub patient_id: String,
    pub name: String,
    pub age: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::patient_entry::Entity")]
    PatientEntry,
}

impl Related<super::patient_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PatientEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
