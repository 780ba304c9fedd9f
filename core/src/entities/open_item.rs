use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum OpenItemType {
    #[sea_orm(string_value = "RECEIVABLE")]
    Receivable,
    #[sea_orm(string_value = "PAYABLE")]
    Payable,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(12))")]
pub enum OpenItemStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "PARTIAL")]
    Partial,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "WRITTEN_OFF")]
    WrittenOff,
}

impl OpenItemStatus {
    /// Status is a function of paid vs original; WRITTEN_OFF is only ever
    /// set explicitly and never derived.
    pub fn derive(paid_amount: Decimal, original_amount: Decimal) -> Self {
        if paid_amount >= original_amount && !original_amount.is_zero() {
            OpenItemStatus::Paid
        } else if paid_amount > Decimal::ZERO {
            OpenItemStatus::Partial
        } else {
            OpenItemStatus::Open
        }
    }

    pub fn counts_as_open(&self) -> bool {
        matches!(self, OpenItemStatus::Open | OpenItemStatus::Partial)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "open_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub party_id: i32,
    pub journal_entry_id: i32,
    pub journal_line_id: i32,
    pub item_type: OpenItemType,
    pub document_number: Option<String>,
    pub document_date: Date,
    pub due_date: Date,
    pub original_amount: Decimal,
    pub paid_amount: Decimal,
    pub open_amount: Decimal,
    pub currency: String,
    pub status: OpenItemStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
        belongs_to = "super::party::Entity",
        from = "Column::PartyId",
        to = "super::party::Column::Id"
    )]
    Party,
    #[sea_orm(
        belongs_to = "super::journal_entry::Entity",
        from = "Column::JournalEntryId",
        to = "super::journal_entry::Column::Id"
    )]
    JournalEntry,
    #[sea_orm(has_many = "super::open_item_allocation::Entity")]
    Allocations,
}

impl Related<super::party::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Party.def()
    }
}

impl Related<super::journal_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntry.def()
    }
}

impl Related<super::open_item_allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_follows_paid_amount() {
        assert_eq!(
            OpenItemStatus::derive(dec!(0.00), dec!(100.00)),
            OpenItemStatus::Open
        );
        assert_eq!(
            OpenItemStatus::derive(dec!(40.00), dec!(100.00)),
            OpenItemStatus::Partial
        );
        assert_eq!(
            OpenItemStatus::derive(dec!(100.00), dec!(100.00)),
            OpenItemStatus::Paid
        );
    }

    #[test]
    fn zero_original_never_reports_paid() {
        assert_eq!(
            OpenItemStatus::derive(dec!(0.00), dec!(0.00)),
            OpenItemStatus::Open
        );
    }
}
