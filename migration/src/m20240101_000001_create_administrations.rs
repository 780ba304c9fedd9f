use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Administrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Administrations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Administrations::Name).string().not_null())
                    .col(ColumnDef::new(Administrations::VatNumber).string_len(20))
                    .col(ColumnDef::new(Administrations::KvkNumber).string_len(12))
                    .col(
                        ColumnDef::new(Administrations::Country)
                            .string_len(2)
                            .not_null()
                            .default("NL"),
                    )
                    .col(
                        ColumnDef::new(Administrations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Administrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Administrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Administrations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Administrations {
    Table,
    Id,
    Name,
    VatNumber,
    KvkNumber,
    Country,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
