use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JournalEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JournalEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::TenantId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JournalEntries::PeriodId).integer())
                    .col(ColumnDef::new(JournalEntries::DocumentId).integer())
                    .col(
                        ColumnDef::new(JournalEntries::EntryNumber)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(JournalEntries::EntryDate).date().not_null())
                    .col(
                        ColumnDef::new(JournalEntries::Description)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JournalEntries::Reference).string_len(120))
                    .col(
                        ColumnDef::new(JournalEntries::Status)
                            .string_len(10)
                            .not_null()
                            .default("DRAFT"),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::SourceType)
                            .string_len(30)
                            .not_null()
                            .default("MANUAL"),
                    )
                    .col(ColumnDef::new(JournalEntries::SourceId).integer())
                    .col(ColumnDef::new(JournalEntries::ReversesId).integer())
                    .col(ColumnDef::new(JournalEntries::ReversedById).integer())
                    .col(ColumnDef::new(JournalEntries::PostedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JournalEntries::PostedBy).integer())
                    .col(
                        ColumnDef::new(JournalEntries::TotalDebit)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::TotalCredit)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::IsBalanced)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_entries_tenant_id")
                            .from(JournalEntries::Table, JournalEntries::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_entries_period_id")
                            .from(JournalEntries::Table, JournalEntries::PeriodId)
                            .to(Periods::Table, Periods::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_entries_reverses_id")
                            .from(JournalEntries::Table, JournalEntries::ReversesId)
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_entries_reversed_by_id")
                            .from(JournalEntries::Table, JournalEntries::ReversedById)
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_entries_tenant_number_unique")
                    .table(JournalEntries::Table)
                    .col(JournalEntries::TenantId)
                    .col(JournalEntries::EntryNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_entries_entry_date")
                    .table(JournalEntries::Table)
                    .col(JournalEntries::EntryDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_entries_tenant_status")
                    .table(JournalEntries::Table)
                    .col(JournalEntries::TenantId)
                    .col(JournalEntries::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JournalEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JournalEntries {
    Table,
    Id,
    TenantId,
    PeriodId,
    DocumentId,
    EntryNumber,
    EntryDate,
    Description,
    Reference,
    Status,
    SourceType,
    SourceId,
    ReversesId,
    ReversedById,
    PostedAt,
    PostedBy,
    TotalDebit,
    TotalCredit,
    IsBalanced,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Administrations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Periods {
    Table,
    Id,
}
