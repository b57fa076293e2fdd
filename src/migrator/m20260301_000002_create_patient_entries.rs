use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_patients::Patients;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PatientEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PatientEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PatientEntries::PatientId).integer())
                    .col(ColumnDef::new(PatientEntries::ActiveKey).integer())
                    .col(ColumnDef::new(PatientEntries::Surname).string().not_null())
                    .col(ColumnDef::new(PatientEntries::Age).integer())
                    .col(
                        ColumnDef::new(PatientEntries::Operation)
                            .string()
                            .not_null()
                            .default("CS"),
                    )
                    .col(ColumnDef::new(PatientEntries::Gravidity).integer())
                    .col(ColumnDef::new(PatientEntries::Parity).integer())
                    .col(ColumnDef::new(PatientEntries::Comorbid).string())
                    .col(ColumnDef::new(PatientEntries::Indication).string())
                    .col(ColumnDef::new(PatientEntries::Clinician).string())
                    .col(ColumnDef::new(PatientEntries::Location).string())
                    .col(ColumnDef::new(PatientEntries::OutstandingData).string())
                    .col(
                        ColumnDef::new(PatientEntries::Urgency)
                            .integer()
                            .not_null()
                            .default(4),
                    )
                    .col(
                        ColumnDef::new(PatientEntries::DecisionTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PatientEntries::CompletionTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PatientEntries::OperationCancelled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PatientEntries::Foetus).integer())
                    .col(ColumnDef::new(PatientEntries::StarvationHours).integer())
                    .col(ColumnDef::new(PatientEntries::AnestheticTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PatientEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PatientEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_patient_entries_patient")
                            .from(PatientEntries::Table, PatientEntries::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // NULLs never collide, so only active identity-keyed entries compete here.
        manager
            .create_index(
                Index::create()
                    .name("idx_patient_entries_active_key")
                    .table(PatientEntries::Table)
                    .col(PatientEntries::ActiveKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_patient_entries_patient_id")
                    .table(PatientEntries::Table)
                    .col(PatientEntries::PatientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PatientEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PatientEntries {
    Table,
    Id,
    PatientId,
    ActiveKey,
    Surname,
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
    CompletionTime,
    OperationCancelled,
    Foetus,
    StarvationHours,
    AnestheticTime,
    CreatedAt,
    UpdatedAt,
}
