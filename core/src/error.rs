use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// Reference to an issue blocking finalization, as handed back to callers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssueRef {
    pub id: i32,
    pub code: String,
    pub severity: String,
    pub title: String,
}

/// The closed error set of the core. Collaborators map these to transport
/// codes; the engine never surfaces anything outside this enum.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("journal entry is unbalanced: debit={debit}, credit={credit}")]
    Unbalanced { debit: Decimal, credit: Decimal },

    #[error("journal entry must have at least one line")]
    EmptyEntry,

    #[error("account {code} is inactive")]
    InactiveAccount { code: String },

    #[error("control account {account_code} line requires a party")]
    MissingParty { account_code: String },

    #[error("period {period_name} is finalized; post into a following open period")]
    PeriodFinalized { period_name: String },

    #[error("period {period_name} is locked")]
    PeriodLocked { period_name: String },

    #[error("invalid period transition: {detail}")]
    PeriodState { detail: String },

    #[error("invalid entry state: {detail}")]
    EntryState { detail: String },

    #[error("finalization prerequisites not met: {red} red, {unacknowledged} unacknowledged yellow")]
    FinalizationPrerequisite {
        red: usize,
        unacknowledged: usize,
        red_issues: Vec<IssueRef>,
        yellow_issues: Vec<IssueRef>,
    },

    /// Second execution of a completed operation. Not an error for callers
    /// that treat the operation as idempotent; surfaced so the transport
    /// layer can report a no-op.
    #[error("operation was already completed")]
    IdempotentNoop,

    #[error("concurrent modification detected: {detail}")]
    RaceCondition { detail: String },

    #[error("VAT code {code} not found")]
    VatCodeUnknown { code: String },

    #[error("certificate invalid: {reason}")]
    CertificateInvalid { reason: String },

    #[error("rate limit exceeded: {operation}")]
    RateLimit { operation: String },

    #[error("submission payload failed validation")]
    ValidationFailed { errors: Vec<String> },

    #[error("tenant {tenant_id} is not in the caller's assignments")]
    UnauthorizedTenant { tenant_id: i32 },

    #[error("entity not found: {entity} {id}")]
    NotFound { entity: &'static str, id: i32 },

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl CoreError {
    /// Stable kind tag for transport mapping and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Unbalanced { .. } => "UNBALANCED",
            CoreError::EmptyEntry => "EMPTY_ENTRY",
            CoreError::InactiveAccount { .. } => "INACTIVE_ACCOUNT",
            CoreError::MissingParty { .. } => "MISSING_PARTY",
            CoreError::PeriodFinalized { .. } => "PERIOD_FINALIZED",
            CoreError::PeriodLocked { .. } => "PERIOD_LOCKED",
            CoreError::PeriodState { .. } => "PERIOD_STATE",
            CoreError::EntryState { .. } => "ENTRY_STATE",
            CoreError::FinalizationPrerequisite { .. } => "FINALIZATION_PREREQUISITE",
            CoreError::IdempotentNoop => "IDEMPOTENT_NOOP",
            CoreError::RaceCondition { .. } => "RACE_CONDITION",
            CoreError::VatCodeUnknown { .. } => "VAT_CODE_UNKNOWN",
            CoreError::CertificateInvalid { .. } => "CERTIFICATE_INVALID",
            CoreError::RateLimit { .. } => "RATE_LIMIT",
            CoreError::ValidationFailed { .. } => "VALIDATION_FAILED",
            CoreError::UnauthorizedTenant { .. } => "UNAUTHORIZED_TENANT",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Db(_) => "DATABASE",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kind_tags_are_stable() {
        let err = CoreError::Unbalanced {
            debit: dec!(100.00),
            credit: dec!(99.00),
        };
        assert_eq!(err.kind(), "UNBALANCED");
        assert_eq!(CoreError::EmptyEntry.kind(), "EMPTY_ENTRY");
        assert_eq!(
            CoreError::UnauthorizedTenant { tenant_id: 7 }.kind(),
            "UNAUTHORIZED_TENANT"
        );
    }

    #[test]
    fn unbalanced_message_carries_both_totals() {
        let err = CoreError::Unbalanced {
            debit: dec!(121.00),
            credit: dec!(100.00),
        };
        let msg = err.to_string();
        assert!(msg.contains("121.00"));
        assert!(msg.contains("100.00"));
    }
}
