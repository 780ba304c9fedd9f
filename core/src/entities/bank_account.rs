use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    /// The general-ledger account this bank account posts against.
    pub ledger_account_id: i32,
    pub iban: String,
    pub bank_name: Option<String>,
    pub currency: String,
    pub created_at: DateTimeUtc,
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
        belongs_to = "super::account::Entity",
        from = "Column::LedgerAccountId",
        to = "super::account::Column::Id"
    )]
    LedgerAccount,
    #[sea_orm(has_many = "super::bank_transaction::Entity")]
    Transactions,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerAccount.def()
    }
}

impl Related<super::bank_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
