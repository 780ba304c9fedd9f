use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Immutable copy of the period's financial reports, captured once at
/// finalization and never updated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "period_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub period_id: i32,
    pub tenant_id: i32,
    pub snapshot_type: String,
    pub balance_sheet: Value,
    pub profit_and_loss: Value,
    pub vat_summary: Value,
    pub trial_balance: Value,
    pub ar_aging: Value,
    pub ap_aging: Value,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub total_equity: Decimal,
    pub net_income: Decimal,
    pub total_ar: Decimal,
    pub total_ap: Decimal,
    pub acknowledged_yellow_issues: Option<Value>,
    pub issue_summary: Option<Value>,
    pub created_by: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::period::Entity",
        from = "Column::PeriodId",
        to = "super::period::Column::Id"
    )]
    Period,
}

impl Related<super::period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Period.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
