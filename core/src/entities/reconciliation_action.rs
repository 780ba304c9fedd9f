use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ReconciliationActionType {
    #[sea_orm(string_value = "APPLY_MATCH")]
    ApplyMatch,
    #[sea_orm(string_value = "CREATE_EXPENSE")]
    CreateExpense,
    #[sea_orm(string_value = "IGNORE")]
    Ignore,
    #[sea_orm(string_value = "UNMATCH")]
    Unmatch,
}

/// Audit trail: one row per reconciliation decision.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliation_actions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub user_id: i32,
    pub bank_transaction_id: i32,
    pub action: ReconciliationActionType,
    pub payload: Option<Value>,
    pub created_at: DateTimeUtc,
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
