use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VatCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VatCodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VatCodes::TenantId).integer().not_null())
                    .col(ColumnDef::new(VatCodes::Code).string_len(20).not_null())
                    .col(ColumnDef::new(VatCodes::Name).string().not_null())
                    .col(
                        ColumnDef::new(VatCodes::Rate)
                            .decimal_len(5, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(VatCodes::Category)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VatCodes::IsReverseCharge)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(VatCodes::IsIcp)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(VatCodes::SalesAccountId).integer())
                    .col(ColumnDef::new(VatCodes::PurchaseAccountId).integer())
                    .col(
                        ColumnDef::new(VatCodes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(VatCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VatCodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vat_codes_tenant_id")
                            .from(VatCodes::Table, VatCodes::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vat_codes_sales_account")
                            .from(VatCodes::Table, VatCodes::SalesAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vat_codes_purchase_account")
                            .from(VatCodes::Table, VatCodes::PurchaseAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vat_codes_tenant_code_unique")
                    .table(VatCodes::Table)
                    .col(VatCodes::TenantId)
                    .col(VatCodes::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VatCodes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VatCodes {
    Table,
    Id,
    TenantId,
    Code,
    Name,
    Rate,
    Category,
    IsReverseCharge,
    IsIcp,
    SalesAccountId,
    PurchaseAccountId,
    IsActive,
    CreatedAt,
    UpdatedAt,
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
