use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

pub use super::bank_transaction::MatchedEntityType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum MatchRuleType {
    #[sea_orm(string_value = "INVOICE_NUMBER")]
    InvoiceNumber,
    #[sea_orm(string_value = "AMOUNT_EXACT")]
    AmountExact,
    #[sea_orm(string_value = "IBAN_RECURRING")]
    IbanRecurring,
    #[sea_orm(string_value = "AMOUNT_TOLERANCE")]
    AmountTolerance,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(12))")]
pub enum ProposalStatus {
    #[sea_orm(string_value = "SUGGESTED")]
    Suggested,
    #[sea_orm(string_value = "ACCEPTED")]
    Accepted,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_match_proposals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub bank_transaction_id: i32,
    pub entity_type: MatchedEntityType,
    pub entity_id: i32,
    /// 0-100; rule-derived, see the matcher.
    pub confidence: i32,
    pub reason: String,
    pub matched_amount: Option<Decimal>,
    pub matched_date: Option<Date>,
    pub rule_type: MatchRuleType,
    pub status: ProposalStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bank_transaction::Entity",
        from = "Column::BankTransactionId",
        to = "super::bank_transaction::Column::Id"
    )]
    BankTransaction,
}

impl Related<super::bank_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
