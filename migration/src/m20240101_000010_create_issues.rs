use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issues::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Issues::TenantId).integer().not_null())
                    .col(ColumnDef::new(Issues::Code).string_len(40).not_null())
                    .col(ColumnDef::new(Issues::Severity).string_len(6).not_null())
                    .col(ColumnDef::new(Issues::Title).string().not_null())
                    .col(ColumnDef::new(Issues::Description).text().not_null())
                    .col(ColumnDef::new(Issues::Why).text())
                    .col(ColumnDef::new(Issues::SuggestedAction).text())
                    .col(ColumnDef::new(Issues::DocumentId).integer())
                    .col(ColumnDef::new(Issues::JournalEntryId).integer())
                    .col(ColumnDef::new(Issues::AccountId).integer())
                    .col(ColumnDef::new(Issues::FixedAssetId).integer())
                    .col(ColumnDef::new(Issues::PartyId).integer())
                    .col(ColumnDef::new(Issues::OpenItemId).integer())
                    .col(ColumnDef::new(Issues::AmountDiscrepancy).decimal_len(15, 2))
                    .col(
                        ColumnDef::new(Issues::IsResolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Issues::ResolvedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Issues::ResolvedBy).integer())
                    .col(
                        ColumnDef::new(Issues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_tenant_id")
                            .from(Issues::Table, Issues::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_tenant_resolved")
                    .table(Issues::Table)
                    .col(Issues::TenantId)
                    .col(Issues::IsResolved)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ValidationRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ValidationRuns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ValidationRuns::TenantId).integer().not_null())
                    .col(
                        ColumnDef::new(ValidationRuns::Status)
                            .string_len(10)
                            .not_null()
                            .default("RUNNING"),
                    )
                    .col(ColumnDef::new(ValidationRuns::TriggeredBy).integer())
                    .col(
                        ColumnDef::new(ValidationRuns::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ValidationRuns::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ValidationRuns::IssuesFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ValidationRuns::ErrorMessage).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_validation_runs_tenant_id")
                            .from(ValidationRuns::Table, ValidationRuns::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_validation_runs_tenant_started")
                    .table(ValidationRuns::Table)
                    .col(ValidationRuns::TenantId)
                    .col(ValidationRuns::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ValidationRuns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
    TenantId,
    Code,
    Severity,
    Title,
    Description,
    Why,
    SuggestedAction,
    DocumentId,
    JournalEntryId,
    AccountId,
    FixedAssetId,
    PartyId,
    OpenItemId,
    AmountDiscrepancy,
    IsResolved,
    ResolvedAt,
    ResolvedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ValidationRuns {
    Table,
    Id,
    TenantId,
    Status,
    TriggeredBy,
    StartedAt,
    CompletedAt,
    IssuesFound,
    ErrorMessage,
}

#[derive(DeriveIden)]
enum Administrations {
    Table,
    Id,
}
