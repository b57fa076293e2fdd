use sea_orm_migration::prelude::*;

use super::m20260301_000002_create_patient_entries::PatientEntries;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Babies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Babies::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Babies::PatientEntryId).integer().not_null())
                    .col(ColumnDef::new(Babies::BabyNumber).integer().not_null())
                    .col(
                        ColumnDef::new(Babies::DeliveryTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Babies::Apgar1).integer())
                    .col(ColumnDef::new(Babies::Apgar5).integer())
                    .col(ColumnDef::new(Babies::BabyWeightGrams).integer())
                    .col(ColumnDef::new(Babies::Nicu).boolean())
                    .col(
                        ColumnDef::new(Babies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Babies::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_babies_patient_entry")
                            .from(Babies::Table, Babies::PatientEntryId)
                            .to(PatientEntries::Table, PatientEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_babies_entry_number")
                    .table(Babies::Table)
                    .col(Babies::PatientEntryId)
                    .col(Babies::BabyNumber)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Babies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Babies {
    Table,
    Id,
    PatientEntryId,
    BabyNumber,
    DeliveryTime,
    #[sea_orm(iden = "apgar_1")]
    Apgar1,
    #[sea_orm(iden = "apgar_5")]
    Apgar5,
    BabyWeightGrams,
    Nicu,
    CreatedAt,
    UpdatedAt,
}
