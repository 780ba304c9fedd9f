pub mod bank_reconciliation;
pub mod bank_statement;
pub mod consistency;
pub mod documents;
pub mod fixed_assets;
pub mod ledger;
pub mod period_control;
pub mod reports;
pub mod subledger;
pub mod vat_posting;
pub mod vat_submission;

pub use bank_reconciliation::BankReconciliationService;
pub use consistency::ConsistencyEngine;
pub use documents::DocumentPostingService;
pub use fixed_assets::FixedAssetService;
pub use ledger::LedgerService;
pub use period_control::PeriodControlService;
pub use reports::ReportService;
pub use subledger::SubledgerService;
pub use vat_posting::VatPostingService;
pub use vat_submission::VatSubmissionService;
