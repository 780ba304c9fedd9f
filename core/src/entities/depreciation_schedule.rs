use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "depreciation_schedules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub fixed_asset_id: i32,
    /// First day of the month this row depreciates.
    pub period_date: Date,
    pub depreciation_amount: Decimal,
    pub accumulated_depreciation: Decimal,
    pub book_value_end: Decimal,
    pub journal_entry_id: Option<i32>,
    pub is_posted: bool,
    pub posted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fixed_asset::Entity",
        from = "Column::FixedAssetId",
        to = "super::fixed_asset::Column::Id"
    )]
    FixedAsset,
    #[sea_orm(
        belongs_to = "super::journal_entry::Entity",
        from = "Column::JournalEntryId",
        to = "super::journal_entry::Column::Id"
    )]
    JournalEntry,
}

impl Related<super::fixed_asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FixedAsset.def()
    }
}

impl Related<super::journal_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
