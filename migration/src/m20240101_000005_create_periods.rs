use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Periods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Periods::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Periods::TenantId).integer().not_null())
                    .col(ColumnDef::new(Periods::Name).string().not_null())
                    .col(
                        ColumnDef::new(Periods::PeriodType)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Periods::StartDate).date().not_null())
                    .col(ColumnDef::new(Periods::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Periods::Status)
                            .string_len(10)
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(ColumnDef::new(Periods::ReviewStartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Periods::ReviewStartedBy).integer())
                    .col(ColumnDef::new(Periods::FinalizedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Periods::FinalizedBy).integer())
                    .col(ColumnDef::new(Periods::LockedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Periods::LockedBy).integer())
                    .col(
                        ColumnDef::new(Periods::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Periods::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_periods_tenant_id")
                            .from(Periods::Table, Periods::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_periods_tenant_dates")
                    .table(Periods::Table)
                    .col(Periods::TenantId)
                    .col(Periods::StartDate)
                    .col(Periods::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PeriodSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PeriodSnapshots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::PeriodId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::TenantId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::SnapshotType)
                            .string_len(20)
                            .not_null()
                            .default("FINALIZATION"),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::BalanceSheet)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::ProfitAndLoss)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::VatSummary)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::TrialBalance)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::ArAging)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::ApAging)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::TotalAssets)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::TotalLiabilities)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::TotalEquity)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::NetIncome)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::TotalAr)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(PeriodSnapshots::TotalAp)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(ColumnDef::new(PeriodSnapshots::AcknowledgedYellowIssues).json_binary())
                    .col(ColumnDef::new(PeriodSnapshots::IssueSummary).json_binary())
                    .col(ColumnDef::new(PeriodSnapshots::CreatedBy).integer())
                    .col(
                        ColumnDef::new(PeriodSnapshots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_period_snapshots_period_id")
                            .from(PeriodSnapshots::Table, PeriodSnapshots::PeriodId)
                            .to(Periods::Table, Periods::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PeriodAuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PeriodAuditLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PeriodAuditLogs::PeriodId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodAuditLogs::TenantId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodAuditLogs::Action)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodAuditLogs::FromStatus)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodAuditLogs::ToStatus)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PeriodAuditLogs::PerformedBy).integer())
                    .col(
                        ColumnDef::new(PeriodAuditLogs::PerformedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(PeriodAuditLogs::IpAddress).string_len(45))
                    .col(ColumnDef::new(PeriodAuditLogs::UserAgent).string())
                    .col(ColumnDef::new(PeriodAuditLogs::Notes).text())
                    .col(ColumnDef::new(PeriodAuditLogs::SnapshotId).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_period_audit_logs_period_id")
                            .from(PeriodAuditLogs::Table, PeriodAuditLogs::PeriodId)
                            .to(Periods::Table, Periods::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_period_audit_logs_snapshot_id")
                            .from(PeriodAuditLogs::Table, PeriodAuditLogs::SnapshotId)
                            .to(PeriodSnapshots::Table, PeriodSnapshots::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PeriodAuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PeriodSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Periods::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Periods {
    Table,
    Id,
    TenantId,
    Name,
    PeriodType,
    StartDate,
    EndDate,
    Status,
    ReviewStartedAt,
    ReviewStartedBy,
    FinalizedAt,
    FinalizedBy,
    LockedAt,
    LockedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PeriodSnapshots {
    Table,
    Id,
    PeriodId,
    TenantId,
    SnapshotType,
    BalanceSheet,
    ProfitAndLoss,
    VatSummary,
    TrialBalance,
    ArAging,
    ApAging,
    TotalAssets,
    TotalLiabilities,
    TotalEquity,
    NetIncome,
    TotalAr,
    TotalAp,
    AcknowledgedYellowIssues,
    IssueSummary,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PeriodAuditLogs {
    Table,
    Id,
    PeriodId,
    TenantId,
    Action,
    FromStatus,
    ToStatus,
    PerformedBy,
    PerformedAt,
    IpAddress,
    UserAgent,
    Notes,
    SnapshotId,
}

#[derive(DeriveIden)]
enum Administrations {
    Table,
    Id,
}
