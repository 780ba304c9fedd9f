use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JournalLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JournalLines::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(JournalLines::JournalEntryId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JournalLines::AccountId).integer().not_null())
                    .col(ColumnDef::new(JournalLines::LineNo).integer().not_null())
                    .col(ColumnDef::new(JournalLines::Description).string())
                    .col(
                        ColumnDef::new(JournalLines::DebitAmount)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(
                        ColumnDef::new(JournalLines::CreditAmount)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0.00),
                    )
                    .col(ColumnDef::new(JournalLines::VatCodeId).integer())
                    .col(ColumnDef::new(JournalLines::VatAmount).decimal_len(15, 2))
                    .col(ColumnDef::new(JournalLines::VatBaseAmount).decimal_len(15, 2))
                    .col(ColumnDef::new(JournalLines::VatCountry).string_len(2))
                    .col(
                        ColumnDef::new(JournalLines::VatIsReverseCharge)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(JournalLines::PartyType).string_len(10))
                    .col(ColumnDef::new(JournalLines::PartyId).integer())
                    .col(ColumnDef::new(JournalLines::PartyVatNumber).string_len(20))
                    .col(
                        ColumnDef::new(JournalLines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_lines_entry_id")
                            .from(JournalLines::Table, JournalLines::JournalEntryId)
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_lines_account_id")
                            .from(JournalLines::Table, JournalLines::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_lines_vat_code_id")
                            .from(JournalLines::Table, JournalLines::VatCodeId)
                            .to(VatCodes::Table, VatCodes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_lines_party_id")
                            .from(JournalLines::Table, JournalLines::PartyId)
                            .to(Parties::Table, Parties::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_lines_entry_id")
                    .table(JournalLines::Table)
                    .col(JournalLines::JournalEntryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_lines_account_id")
                    .table(JournalLines::Table)
                    .col(JournalLines::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_lines_party_id")
                    .table(JournalLines::Table)
                    .col(JournalLines::PartyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JournalLines::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JournalLines {
    Table,
    Id,
    JournalEntryId,
    AccountId,
    LineNo,
    Description,
    DebitAmount,
    CreditAmount,
    VatCodeId,
    VatAmount,
    VatBaseAmount,
    VatCountry,
    VatIsReverseCharge,
    PartyType,
    PartyId,
    PartyVatNumber,
    CreatedAt,
}

#[derive(DeriveIden)]
enum JournalEntries {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum VatCodes {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Parties {
    Table,
    Id,
}
