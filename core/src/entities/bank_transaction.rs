use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(15))")]
pub enum BankTransactionStatus {
    #[sea_orm(string_value = "NEW")]
    New,
    #[sea_orm(string_value = "MATCHED")]
    Matched,
    #[sea_orm(string_value = "IGNORED")]
    Ignored,
    #[sea_orm(string_value = "NEEDS_REVIEW")]
    NeedsReview,
}

/// Tagged target of a match; persisted next to the id it scopes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
pub enum MatchedEntityType {
    #[sea_orm(string_value = "OPEN_ITEM")]
    OpenItem,
    #[sea_orm(string_value = "JOURNAL_ENTRY")]
    JournalEntry,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub bank_account_id: i32,
    pub booking_date: Date,
    /// Positive = inbound credit, negative = outbound debit.
    pub amount: Decimal,
    pub currency: String,
    pub counterparty_name: Option<String>,
    pub counterparty_iban: Option<String>,
    pub description: String,
    pub reference: Option<String>,
    pub import_hash: String,
    pub status: BankTransactionStatus,
    pub matched_entity_type: Option<MatchedEntityType>,
    pub matched_entity_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_inbound(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::administration::Entity",
        from = "Column::TenantId",
        to = "super::administration::Column::Id"
    )]
    Administration,
    #[sea_orm(
        belongs_to = "super::bank_account::Entity",
        from = "Column::BankAccountId",
        to = "super::bank_account::Column::Id"
    )]
    BankAccount,
    #[sea_orm(has_many = "super::bank_match_proposal::Entity")]
    Proposals,
    #[sea_orm(has_many = "super::reconciliation_action::Entity")]
    Actions,
}

impl Related<super::bank_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccount.def()
    }
}

impl Related<super::bank_match_proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposals.def()
    }
}

impl Related<super::reconciliation_action::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
