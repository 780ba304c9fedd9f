use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum PeriodType {
    #[sea_orm(string_value = "MONTH")]
    Month,
    #[sea_orm(string_value = "QUARTER")]
    Quarter,
    #[sea_orm(string_value = "YEAR")]
    Year,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum PeriodStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "REVIEW")]
    Review,
    #[sea_orm(string_value = "FINALIZED")]
    Finalized,
    #[sea_orm(string_value = "LOCKED")]
    Locked,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Open => "OPEN",
            PeriodStatus::Review => "REVIEW",
            PeriodStatus::Finalized => "FINALIZED",
            PeriodStatus::Locked => "LOCKED",
        }
    }

    /// The only legal transitions of the period state machine. LOCKED is
    /// absorbing.
    pub fn may_transition_to(&self, target: PeriodStatus) -> bool {
        matches!(
            (self, target),
            (PeriodStatus::Open, PeriodStatus::Review)
                | (PeriodStatus::Open, PeriodStatus::Finalized)
                | (PeriodStatus::Review, PeriodStatus::Open)
                | (PeriodStatus::Review, PeriodStatus::Finalized)
                | (PeriodStatus::Finalized, PeriodStatus::Locked)
        )
    }

    pub fn accepts_postings(&self) -> bool {
        matches!(self, PeriodStatus::Open | PeriodStatus::Review)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "periods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub name: String,
    pub period_type: PeriodType,
    pub start_date: Date,
    pub end_date: Date,
    pub status: PeriodStatus,
    pub review_started_at: Option<DateTimeUtc>,
    pub review_started_by: Option<i32>,
    pub finalized_at: Option<DateTimeUtc>,
    pub finalized_by: Option<i32>,
    pub locked_at: Option<DateTimeUtc>,
    pub locked_by: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn contains(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
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
    #[sea_orm(has_many = "super::journal_entry::Entity")]
    JournalEntries,
    #[sea_orm(has_many = "super::period_snapshot::Entity")]
    Snapshots,
    #[sea_orm(has_many = "super::period_audit_log::Entity")]
    AuditLogs,
}

impl Related<super::administration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Administration.def()
    }
}

impl Related<super::journal_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntries.def()
    }
}

impl Related<super::period_snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl Related<super::period_audit_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuditLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_allows_documented_transitions_only() {
        use PeriodStatus::*;

        assert!(Open.may_transition_to(Review));
        assert!(Open.may_transition_to(Finalized));
        assert!(Review.may_transition_to(Open));
        assert!(Review.may_transition_to(Finalized));
        assert!(Finalized.may_transition_to(Locked));

        assert!(!Finalized.may_transition_to(Open));
        assert!(!Finalized.may_transition_to(Review));
        assert!(!Locked.may_transition_to(Open));
        assert!(!Locked.may_transition_to(Review));
        assert!(!Locked.may_transition_to(Finalized));
        assert!(!Open.may_transition_to(Locked));
    }

    #[test]
    fn only_open_and_review_accept_postings() {
        assert!(PeriodStatus::Open.accepts_postings());
        assert!(PeriodStatus::Review.accepts_postings());
        assert!(!PeriodStatus::Finalized.accepts_postings());
        assert!(!PeriodStatus::Locked.accepts_postings());
    }
}
