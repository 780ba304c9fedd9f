use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "open_item_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub open_item_id: i32,
    pub payment_entry_id: i32,
    pub allocated_amount: Decimal,
    pub allocation_date: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::open_item::Entity",
        from = "Column::OpenItemId",
        to = "super::open_item::Column::Id"
    )]
    OpenItem,
    #[sea_orm(
        belongs_to = "super::journal_entry::Entity",
        from = "Column::PaymentEntryId",
        to = "super::journal_entry::Column::Id"
    )]
    PaymentEntry,
}

impl Related<super::open_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OpenItem.def()
    }
}

impl Related<super::journal_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
