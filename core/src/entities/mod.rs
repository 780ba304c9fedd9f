pub mod account;
pub mod administration;
pub mod bank_account;
pub mod bank_match_proposal;
pub mod bank_transaction;
pub mod depreciation_schedule;
pub mod entry_counter;
pub mod fixed_asset;
pub mod issue;
pub mod journal_entry;
pub mod journal_line;
pub mod open_item;
pub mod open_item_allocation;
pub mod party;
pub mod period;
pub mod period_audit_log;
pub mod period_snapshot;
pub mod reconciliation_action;
pub mod validation_run;
pub mod vat_code;

// Re-export for easier access
pub use account::{
    AccountType, ActiveModel as AccountActiveModel, ControlType, Entity as Account,
    Model as AccountModel,
};
pub use administration::{
    ActiveModel as AdministrationActiveModel, Entity as Administration,
    Model as AdministrationModel,
};
pub use bank_account::{
    ActiveModel as BankAccountActiveModel, Entity as BankAccount, Model as BankAccountModel,
};
pub use bank_match_proposal::{
    ActiveModel as BankMatchProposalActiveModel, Entity as BankMatchProposal, MatchRuleType,
    Model as BankMatchProposalModel, ProposalStatus,
};
pub use bank_transaction::{
    ActiveModel as BankTransactionActiveModel, BankTransactionStatus, Entity as BankTransaction,
    MatchedEntityType, Model as BankTransactionModel,
};
pub use depreciation_schedule::{
    ActiveModel as DepreciationScheduleActiveModel, Entity as DepreciationSchedule,
    Model as DepreciationScheduleModel,
};
pub use entry_counter::{
    ActiveModel as EntryCounterActiveModel, Entity as EntryCounter, Model as EntryCounterModel,
};
pub use fixed_asset::{
    ActiveModel as FixedAssetActiveModel, AssetStatus, DepreciationMethod, Entity as FixedAsset,
    Model as FixedAssetModel,
};
pub use issue::{
    ActiveModel as IssueActiveModel, Entity as Issue, IssueSeverity, Model as IssueModel,
};
pub use journal_entry::{
    ActiveModel as JournalEntryActiveModel, Entity as JournalEntry, EntrySource, EntryStatus,
    Model as JournalEntryModel,
};
pub use journal_line::{
    ActiveModel as JournalLineActiveModel, Entity as JournalLine, Model as JournalLineModel,
};
pub use open_item::{
    ActiveModel as OpenItemActiveModel, Entity as OpenItem, Model as OpenItemModel, OpenItemStatus,
    OpenItemType,
};
pub use open_item_allocation::{
    ActiveModel as OpenItemAllocationActiveModel, Entity as OpenItemAllocation,
    Model as OpenItemAllocationModel,
};
pub use party::{ActiveModel as PartyActiveModel, Entity as Party, Model as PartyModel, PartyType};
pub use period::{
    ActiveModel as PeriodActiveModel, Entity as Period, Model as PeriodModel, PeriodStatus,
    PeriodType,
};
pub use period_audit_log::{
    ActiveModel as PeriodAuditLogActiveModel, AuditAction, Entity as PeriodAuditLog,
    Model as PeriodAuditLogModel,
};
pub use period_snapshot::{
    ActiveModel as PeriodSnapshotActiveModel, Entity as PeriodSnapshot,
    Model as PeriodSnapshotModel,
};
pub use reconciliation_action::{
    ActiveModel as ReconciliationActionActiveModel, Entity as ReconciliationAction,
    Model as ReconciliationActionModel, ReconciliationActionType,
};
pub use validation_run::{
    ActiveModel as ValidationRunActiveModel, Entity as ValidationRun, Model as ValidationRunModel,
    RunStatus,
};
pub use vat_code::{
    ActiveModel as VatCodeActiveModel, Entity as VatCode, Model as VatCodeModel, VatCategory,
};
