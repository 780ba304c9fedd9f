use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-tenant, per-prefix sequence row. Read under FOR UPDATE inside the
/// transaction that inserts the numbered entry, so numbers are strictly
/// monotonic; a rollback may leave a gap.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entry_counters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub counter_key: String,
    pub last_value: i32,
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
