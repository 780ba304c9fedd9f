use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EntryCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EntryCounters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EntryCounters::TenantId).integer().not_null())
                    .col(
                        ColumnDef::new(EntryCounters::CounterKey)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EntryCounters::LastValue)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_entry_counters_tenant_id")
                            .from(EntryCounters::Table, EntryCounters::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The counter row is read under FOR UPDATE; one row per (tenant, key)
        manager
            .create_index(
                Index::create()
                    .name("idx_entry_counters_tenant_key_unique")
                    .table(EntryCounters::Table)
                    .col(EntryCounters::TenantId)
                    .col(EntryCounters::CounterKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EntryCounters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EntryCounters {
    Table,
    Id,
    TenantId,
    CounterKey,
    LastValue,
}

#[derive(DeriveIden)]
enum Administrations {
    Table,
    Id,
}
