use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BankAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BankAccounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BankAccounts::TenantId).integer().not_null())
                    .col(
                        ColumnDef::new(BankAccounts::LedgerAccountId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankAccounts::Iban).string_len(34).not_null())
                    .col(ColumnDef::new(BankAccounts::BankName).string_len(120))
                    .col(
                        ColumnDef::new(BankAccounts::Currency)
                            .string_len(3)
                            .not_null()
                            .default("EUR"),
                    )
                    .col(
                        ColumnDef::new(BankAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_accounts_tenant_id")
                            .from(BankAccounts::Table, BankAccounts::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_accounts_ledger_account_id")
                            .from(BankAccounts::Table, BankAccounts::LedgerAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BankTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::TenantId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::BankAccountId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::BookingDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::Amount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::Currency)
                            .string_len(3)
                            .not_null()
                            .default("EUR"),
                    )
                    .col(ColumnDef::new(BankTransactions::CounterpartyName).string_len(200))
                    .col(ColumnDef::new(BankTransactions::CounterpartyIban).string_len(34))
                    .col(
                        ColumnDef::new(BankTransactions::Description)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankTransactions::Reference).string_len(120))
                    .col(
                        ColumnDef::new(BankTransactions::ImportHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::Status)
                            .string_len(15)
                            .not_null()
                            .default("NEW"),
                    )
                    .col(ColumnDef::new(BankTransactions::MatchedEntityType).string_len(30))
                    .col(ColumnDef::new(BankTransactions::MatchedEntityId).integer())
                    .col(
                        ColumnDef::new(BankTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_transactions_tenant_id")
                            .from(BankTransactions::Table, BankTransactions::TenantId)
                            .to(Administrations::Table, Administrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_transactions_bank_account_id")
                            .from(BankTransactions::Table, BankTransactions::BankAccountId)
                            .to(BankAccounts::Table, BankAccounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Duplicate imports are rejected by this index; the importer skips on conflict
        manager
            .create_index(
                Index::create()
                    .name("idx_bank_transactions_tenant_hash_unique")
                    .table(BankTransactions::Table)
                    .col(BankTransactions::TenantId)
                    .col(BankTransactions::ImportHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bank_transactions_tenant_status")
                    .table(BankTransactions::Table)
                    .col(BankTransactions::TenantId)
                    .col(BankTransactions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankMatchProposals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BankMatchProposals::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::TenantId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::BankTransactionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::EntityType)
                            .string_len(30)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::EntityId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::Confidence)
                            .integer()
                            .not_null()
                            .check(
                                Expr::col(BankMatchProposals::Confidence)
                                    .gte(0)
                                    .and(Expr::col(BankMatchProposals::Confidence).lte(100)),
                            ),
                    )
                    .col(ColumnDef::new(BankMatchProposals::Reason).text().not_null())
                    .col(ColumnDef::new(BankMatchProposals::MatchedAmount).decimal_len(15, 2))
                    .col(ColumnDef::new(BankMatchProposals::MatchedDate).date())
                    .col(
                        ColumnDef::new(BankMatchProposals::RuleType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::Status)
                            .string_len(12)
                            .not_null()
                            .default("SUGGESTED"),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BankMatchProposals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_match_proposals_tx_id")
                            .from(
                                BankMatchProposals::Table,
                                BankMatchProposals::BankTransactionId,
                            )
                            .to(BankTransactions::Table, BankTransactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bank_match_proposals_tx_status")
                    .table(BankMatchProposals::Table)
                    .col(BankMatchProposals::BankTransactionId)
                    .col(BankMatchProposals::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReconciliationActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReconciliationActions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationActions::TenantId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationActions::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationActions::BankTransactionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationActions::Action)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReconciliationActions::Payload).json_binary())
                    .col(
                        ColumnDef::new(ReconciliationActions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reconciliation_actions_tx_id")
                            .from(
                                ReconciliationActions::Table,
                                ReconciliationActions::BankTransactionId,
                            )
                            .to(BankTransactions::Table, BankTransactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReconciliationActions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankMatchProposals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BankAccounts {
    Table,
    Id,
    TenantId,
    LedgerAccountId,
    Iban,
    BankName,
    Currency,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BankTransactions {
    Table,
    Id,
    TenantId,
    BankAccountId,
    BookingDate,
    Amount,
    Currency,
    CounterpartyName,
    CounterpartyIban,
    Description,
    Reference,
    ImportHash,
    Status,
    MatchedEntityType,
    MatchedEntityId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BankMatchProposals {
    Table,
    Id,
    TenantId,
    BankTransactionId,
    EntityType,
    EntityId,
    Confidence,
    Reason,
    MatchedAmount,
    MatchedDate,
    RuleType,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReconciliationActions {
    Table,
    Id,
    TenantId,
    UserId,
    BankTransactionId,
    Action,
    Payload,
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
