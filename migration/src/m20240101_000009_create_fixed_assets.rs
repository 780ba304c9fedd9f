use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FixedAssets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FixedAssets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FixedAssets::TenantId).integer().not_null())
                    .col(ColumnDef::new(FixedAssets::Code).string_len(20).not_null())
                    .col(ColumnDef::new(FixedAssets::Name).string().not_null())
                    .col(
                        ColumnDef::new(FixedAssets::AcquisitionDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::AcquisitionCost)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::ResidualValue)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::UsefulLifeMonths)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::Method)
                            .string_len(20)
                            .not_null()
                            .default("STRAIGHT_LINE"),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::AssetAccountId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::DepreciationAccountId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::ExpenseAccountId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::AccumulatedDepreciation)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::BookValue)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::Status)
                            .string_len(20)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(FixedAssets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fixed_assets_tenant_id")
                            .from(FixedAssets::Table, FixedAssets::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fixed_assets_asset_account")
                            .from(FixedAssets::Table, FixedAssets::AssetAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fixed_assets_depreciation_account")
                            .from(FixedAssets::Table, FixedAssets::DepreciationAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fixed_assets_expense_account")
                            .from(FixedAssets::Table, FixedAssets::ExpenseAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_fixed_assets_tenant_code_unique")
                    .table(FixedAssets::Table)
                    .col(FixedAssets::TenantId)
                    .col(FixedAssets::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DepreciationSchedules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DepreciationSchedules::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DepreciationSchedules::FixedAssetId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DepreciationSchedules::PeriodDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DepreciationSchedules::DepreciationAmount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DepreciationSchedules::AccumulatedDepreciation)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DepreciationSchedules::BookValueEnd)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DepreciationSchedules::JournalEntryId).integer())
                    .col(
                        ColumnDef::new(DepreciationSchedules::IsPosted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DepreciationSchedules::PostedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(DepreciationSchedules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_depreciation_schedules_asset_id")
                            .from(
                                DepreciationSchedules::Table,
                                DepreciationSchedules::FixedAssetId,
                            )
                            .to(FixedAssets::Table, FixedAssets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_depreciation_schedules_entry_id")
                            .from(
                                DepreciationSchedules::Table,
                                DepreciationSchedules::JournalEntryId,
                            )
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_depreciation_schedules_asset_period_unique")
                    .table(DepreciationSchedules::Table)
                    .col(DepreciationSchedules::FixedAssetId)
                    .col(DepreciationSchedules::PeriodDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DepreciationSchedules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FixedAssets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FixedAssets {
    Table,
    Id,
    TenantId,
    Code,
    Name,
    AcquisitionDate,
    AcquisitionCost,
    ResidualValue,
    UsefulLifeMonths,
    Method,
    AssetAccountId,
    DepreciationAccountId,
    ExpenseAccountId,
    AccumulatedDepreciation,
    BookValue,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DepreciationSchedules {
    Table,
    Id,
    FixedAssetId,
    PeriodDate,
    DepreciationAmount,
    AccumulatedDepreciation,
    BookValueEnd,
    JournalEntryId,
    IsPosted,
    PostedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Administrations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum JournalEntries {
    Table,
    Id,
}
