use sea_orm_migration::prelude::*;

mod m20260301_000001_create_patients;
mod m20260301_000002_create_patient_entries;
mod m20260301_000003_create_babies;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_patients::Migration),
            Box::new(m20260301_000002_create_patient_entries::Migration),
            Box::new(m20260301_000003_create_babies::Migration),
        ]
    }
}
