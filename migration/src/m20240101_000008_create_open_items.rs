use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OpenItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OpenItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OpenItems::TenantId).integer().not_null())
                    .col(ColumnDef::new(OpenItems::PartyId).integer().not_null())
                    .col(
                        ColumnDef::new(OpenItems::JournalEntryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpenItems::JournalLineId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OpenItems::ItemType).string_len(10).not_null())
                    .col(ColumnDef::new(OpenItems::DocumentNumber).string_len(120))
                    .col(ColumnDef::new(OpenItems::DocumentDate).date().not_null())
                    .col(ColumnDef::new(OpenItems::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(OpenItems::OriginalAmount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpenItems::PaidAmount)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(OpenItems::OpenAmount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpenItems::Currency)
                            .string_len(3)
                            .not_null()
                            .default("EUR"),
                    )
                    .col(
                        ColumnDef::new(OpenItems::Status)
                            .string_len(12)
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(
                        ColumnDef::new(OpenItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(OpenItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_open_items_tenant_id")
                            .from(OpenItems::Table, OpenItems::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_open_items_party_id")
                            .from(OpenItems::Table, OpenItems::PartyId)
                            .to(Parties::Table, Parties::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_open_items_journal_entry_id")
                            .from(OpenItems::Table, OpenItems::JournalEntryId)
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_open_items_journal_line_id")
                            .from(OpenItems::Table, OpenItems::JournalLineId)
                            .to(JournalLines::Table, JournalLines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_open_items_tenant_type_status")
                    .table(OpenItems::Table)
                    .col(OpenItems::TenantId)
                    .col(OpenItems::ItemType)
                    .col(OpenItems::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_open_items_party_id")
                    .table(OpenItems::Table)
                    .col(OpenItems::PartyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OpenItemAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OpenItemAllocations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OpenItemAllocations::OpenItemId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpenItemAllocations::PaymentEntryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpenItemAllocations::AllocatedAmount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpenItemAllocations::AllocationDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpenItemAllocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_open_item_allocations_open_item_id")
                            .from(
                                OpenItemAllocations::Table,
                                OpenItemAllocations::OpenItemId,
                            )
                            .to(OpenItems::Table, OpenItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_open_item_allocations_payment_entry_id")
                            .from(
                                OpenItemAllocations::Table,
                                OpenItemAllocations::PaymentEntryId,
                            )
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_open_item_allocations_open_item_id")
                    .table(OpenItemAllocations::Table)
                    .col(OpenItemAllocations::OpenItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OpenItemAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OpenItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OpenItems {
    Table,
    Id,
    TenantId,
    PartyId,
    JournalEntryId,
    JournalLineId,
    ItemType,
    DocumentNumber,
    DocumentDate,
    DueDate,
    OriginalAmount,
    PaidAmount,
    OpenAmount,
    Currency,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OpenItemAllocations {
    Table,
    Id,
    OpenItemId,
    PaymentEntryId,
    AllocatedAmount,
    AllocationDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Administrations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Parties {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum JournalEntries {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum JournalLines {
    Table,
    Id,
}
