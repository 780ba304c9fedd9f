use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum VatCategory {
    #[sea_orm(string_value = "STANDARD")]
    Standard,
    #[sea_orm(string_value = "REDUCED")]
    Reduced,
    #[sea_orm(string_value = "ZERO")]
    Zero,
    #[sea_orm(string_value = "EXEMPT")]
    Exempt,
    #[sea_orm(string_value = "REVERSE_CHARGE")]
    ReverseCharge,
    #[sea_orm(string_value = "ICP")]
    Icp,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vat_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub code: String,
    pub name: String,
    /// Percent, exact: 21.00 means 21%.
    pub rate: Decimal,
    pub category: VatCategory,
    pub is_reverse_charge: bool,
    pub is_icp: bool,
    pub sales_account_id: Option<i32>,
    pub purchase_account_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Reverse-charge and ICP codes never combine with standard posting.
    pub fn is_standard_posting(&self) -> bool {
        !self.is_reverse_charge && !self.is_icp
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
    #[sea_orm(has_many = "super::journal_line::Entity")]
    JournalLines,
}

impl Related<super::administration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Administration.def()
    }
}

impl Related<super::journal_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
