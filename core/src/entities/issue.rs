use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(6))")]
pub enum IssueSeverity {
    /// Blocks finalization.
    #[sea_orm(string_value = "RED")]
    Red,
    /// Requires explicit acknowledgment before finalization.
    #[sea_orm(string_value = "YELLOW")]
    Yellow,
}

/// Issue codes emitted by the consistency engine.
pub mod codes {
    pub const JOURNAL_UNBALANCED: &str = "JOURNAL_UNBALANCED";
    pub const ORPHAN_LINE: &str = "ORPHAN_LINE";
    pub const MISSING_ACCOUNT: &str = "MISSING_ACCOUNT";
    pub const AR_RECON_MISMATCH: &str = "AR_RECON_MISMATCH";
    pub const AP_RECON_MISMATCH: &str = "AP_RECON_MISMATCH";
    pub const OVERDUE_RECEIVABLE: &str = "OVERDUE_RECEIVABLE";
    pub const OVERDUE_PAYABLE: &str = "OVERDUE_PAYABLE";
    pub const DEPRECIATION_NOT_POSTED: &str = "DEPRECIATION_NOT_POSTED";
    pub const DEPRECIATION_MISMATCH: &str = "DEPRECIATION_MISMATCH";
    pub const VAT_RATE_MISMATCH: &str = "VAT_RATE_MISMATCH";
    pub const VAT_NEGATIVE: &str = "VAT_NEGATIVE";
}

/// Issues are transient: every consistency run deletes the unresolved ones
/// and regenerates whatever still holds. Resolved issues stay as history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub code: String,
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub why: Option<String>,
    pub suggested_action: Option<String>,
    pub document_id: Option<i32>,
    pub journal_entry_id: Option<i32>,
    pub account_id: Option<i32>,
    pub fixed_asset_id: Option<i32>,
    pub party_id: Option<i32>,
    pub open_item_id: Option<i32>,
    pub amount_discrepancy: Option<Decimal>,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTimeUtc>,
    pub resolved_by: Option<i32>,
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
}

impl Related<super::administration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Administration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
