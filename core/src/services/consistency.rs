//! Consistency Engine
//!
//! Continuous validation of the books: ledger integrity, AR/AP
//! reconciliation, asset correctness and VAT sanity. Each run deletes the
//! unresolved issues and regenerates whatever still holds, so running twice
//! without intervening mutations yields the same issue set.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};

use crate::context::RequestContext;
use crate::entities::issue::codes;
use crate::entities::{
    account, depreciation_schedule, fixed_asset, issue, journal_entry, journal_line, open_item,
    party, validation_run, vat_code,
};
use crate::entities::{
    AssetStatus, ControlType, EntrySource, EntryStatus, IssueSeverity, OpenItemStatus,
    OpenItemType, RunStatus,
};
use crate::error::CoreResult;

pub struct ConsistencyEngine;

const RECON_TOLERANCE: Decimal = dec!(0.01);
const VAT_TOLERANCE: Decimal = dec!(0.05);

/// An issue found by a check, before persistence.
#[derive(Debug, Clone)]
pub struct IssueDraft {
    pub code: &'static str,
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub why: Option<String>,
    pub suggested_action: Option<String>,
    pub journal_entry_id: Option<i32>,
    pub account_id: Option<i32>,
    pub fixed_asset_id: Option<i32>,
    pub party_id: Option<i32>,
    pub open_item_id: Option<i32>,
    pub amount_discrepancy: Option<Decimal>,
}

impl IssueDraft {
    fn new(
        code: &'static str,
        severity: IssueSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            title: title.into(),
            description: description.into(),
            why: None,
            suggested_action: None,
            journal_entry_id: None,
            account_id: None,
            fixed_asset_id: None,
            party_id: None,
            open_item_id: None,
            amount_discrepancy: None,
        }
    }
}

/// YELLOW up to 30 days overdue, RED beyond.
pub fn overdue_severity(days_overdue: i64) -> IssueSeverity {
    if days_overdue > 30 {
        IssueSeverity::Red
    } else {
        IssueSeverity::Yellow
    }
}

impl ConsistencyEngine {
    /// Run the full validation for the tenant.
    ///
    /// The run record is committed up front so a failure can be recorded
    /// even when the working transaction rolls back; the issue rewrite and
    /// the COMPLETED transition commit atomically.
    pub async fn run_full_validation(
        db: &DatabaseConnection,
        ctx: &RequestContext,
    ) -> CoreResult<validation_run::Model> {
        let run = validation_run::ActiveModel {
            tenant_id: Set(ctx.tenant_id),
            status: Set(RunStatus::Running),
            triggered_by: Set(Some(ctx.user_id())),
            started_at: Set(Utc::now()),
            issues_found: Set(0),
            ..Default::default()
        }
        .insert(db)
        .await?;

        match Self::run_checks_and_store(db, ctx, run.id).await {
            Ok(completed) => Ok(completed),
            Err(err) => {
                let mut failed: validation_run::ActiveModel = run.into();
                failed.status = Set(RunStatus::Failed);
                failed.completed_at = Set(Some(Utc::now()));
                failed.error_message = Set(Some(err.to_string()));
                let failed = failed.update(db).await?;

                tracing::error!(
                    tenant = ctx.tenant_id,
                    entity_type = "validation_run",
                    entity_id = failed.id,
                    severity = "ERROR",
                    event = "validation_failed",
                    "consistency run failed: {}",
                    err
                );

                Err(err)
            }
        }
    }

    /// The last completed run, if any. Collaborators enforcing the 1/min
    /// rate limit return this instead of starting a new run.
    pub async fn last_completed_run<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
    ) -> CoreResult<Option<validation_run::Model>> {
        use sea_orm::QueryOrder;
        Ok(validation_run::Entity::find()
            .filter(validation_run::Column::TenantId.eq(ctx.tenant_id))
            .filter(validation_run::Column::Status.eq(RunStatus::Completed))
            .order_by_desc(validation_run::Column::StartedAt)
            .one(conn)
            .await?)
    }

    async fn run_checks_and_store(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        run_id: i32,
    ) -> CoreResult<validation_run::Model> {
        let txn = db.begin().await?;

        // Unresolved issues are transient; resolved ones are history.
        issue::Entity::delete_many()
            .filter(issue::Column::TenantId.eq(ctx.tenant_id))
            .filter(issue::Column::IsResolved.eq(false))
            .exec(&txn)
            .await?;

        let mut drafts = Vec::new();
        Self::check_ledger_integrity(&txn, ctx, &mut drafts).await?;
        Self::check_subledger_reconciliation(&txn, ctx, ControlType::Ar, &mut drafts).await?;
        Self::check_subledger_reconciliation(&txn, ctx, ControlType::Ap, &mut drafts).await?;
        Self::check_overdue_items(&txn, ctx, OpenItemType::Receivable, &mut drafts).await?;
        Self::check_overdue_items(&txn, ctx, OpenItemType::Payable, &mut drafts).await?;
        Self::check_asset_correctness(&txn, ctx, &mut drafts).await?;
        Self::check_vat_sanity(&txn, ctx, &mut drafts).await?;

        let found = drafts.len() as i32;
        let now = Utc::now();
        for draft in drafts {
            issue::ActiveModel {
                tenant_id: Set(ctx.tenant_id),
                code: Set(draft.code.to_string()),
                severity: Set(draft.severity),
                title: Set(draft.title),
                description: Set(draft.description),
                why: Set(draft.why),
                suggested_action: Set(draft.suggested_action),
                journal_entry_id: Set(draft.journal_entry_id),
                account_id: Set(draft.account_id),
                fixed_asset_id: Set(draft.fixed_asset_id),
                party_id: Set(draft.party_id),
                open_item_id: Set(draft.open_item_id),
                amount_discrepancy: Set(draft.amount_discrepancy),
                is_resolved: Set(false),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        let run = validation_run::Entity::find_by_id(run_id)
            .one(&txn)
            .await?
            .ok_or(crate::error::CoreError::NotFound {
                entity: "validation_run",
                id: run_id,
            })?;
        let mut active: validation_run::ActiveModel = run.into();
        active.status = Set(RunStatus::Completed);
        active.completed_at = Set(Some(now));
        active.issues_found = Set(found);
        let run = active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entity_type = "validation_run",
            entity_id = run.id,
            event = "validation_completed",
            issues = found,
            "consistency run completed"
        );

        Ok(run)
    }

    async fn check_ledger_integrity(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        drafts: &mut Vec<IssueDraft>,
    ) -> CoreResult<()> {
        // Posted entries whose stored totals disagree.
        let unbalanced = journal_entry::Entity::find()
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(journal_entry::Column::IsBalanced.eq(false))
            .all(txn)
            .await?;

        for entry in unbalanced {
            let diff = (entry.total_debit - entry.total_credit).abs();
            let mut draft = IssueDraft::new(
                codes::JOURNAL_UNBALANCED,
                IssueSeverity::Red,
                format!("Unbalanced journal entry: {}", entry.entry_number),
                format!(
                    "Debit ({}) does not equal credit ({}). Difference: {}",
                    entry.total_debit, entry.total_credit, diff
                ),
            );
            draft.why = Some(
                "Journal entries must balance for double-entry accounting.".to_string(),
            );
            draft.suggested_action = Some(
                "Review the entry lines and correct the amounts so debits equal credits."
                    .to_string(),
            );
            draft.journal_entry_id = Some(entry.id);
            draft.amount_discrepancy = Some(diff);
            drafts.push(draft);
        }

        // Lines whose parent is gone. Foreign keys make this unreachable
        // in practice; the check is defensive.
        let entry_ids: std::collections::HashSet<i32> = journal_entry::Entity::find()
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .all(txn)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();

        let lines = journal_line::Entity::find().all(txn).await?;
        let account_ids: std::collections::HashSet<i32> = account::Entity::find()
            .filter(account::Column::TenantId.eq(ctx.tenant_id))
            .all(txn)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        for line in lines.iter().filter(|l| entry_ids.contains(&l.journal_entry_id)) {
            if !account_ids.contains(&line.account_id) {
                let mut draft = IssueDraft::new(
                    codes::MISSING_ACCOUNT,
                    IssueSeverity::Red,
                    "Line references a missing account".to_string(),
                    format!(
                        "Journal line {} references account {} which does not exist.",
                        line.id, line.account_id
                    ),
                );
                draft.journal_entry_id = Some(line.journal_entry_id);
                draft.suggested_action =
                    Some("Repoint the line to a valid account or restore the account.".to_string());
                drafts.push(draft);
            }
        }

        let orphans: Vec<&journal_line::Model> = lines
            .iter()
            .filter(|l| !entry_ids.contains(&l.journal_entry_id))
            .collect();
        for line in orphans {
            // Lines of other tenants land here too; only flag truly
            // parentless rows.
            let parent = journal_entry::Entity::find_by_id(line.journal_entry_id)
                .one(txn)
                .await?;
            if parent.is_none() {
                let mut draft = IssueDraft::new(
                    codes::ORPHAN_LINE,
                    IssueSeverity::Red,
                    "Orphan journal line".to_string(),
                    format!("Journal line {} has no parent journal entry.", line.id),
                );
                draft.suggested_action =
                    Some("Delete the orphan line or investigate database integrity.".to_string());
                drafts.push(draft);
            }
        }

        Ok(())
    }

    async fn check_subledger_reconciliation(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        control_type: ControlType,
        drafts: &mut Vec<IssueDraft>,
    ) -> CoreResult<()> {
        let control_accounts = account::Entity::find()
            .filter(account::Column::TenantId.eq(ctx.tenant_id))
            .filter(account::Column::IsControl.eq(true))
            .filter(account::Column::ControlType.eq(control_type))
            .all(txn)
            .await?;

        if control_accounts.is_empty() {
            return Ok(());
        }

        let mut gl_debit = Decimal::ZERO;
        let mut gl_credit = Decimal::ZERO;
        for control in &control_accounts {
            let lines = journal_line::Entity::find()
                .left_join(journal_entry::Entity)
                .filter(journal_line::Column::AccountId.eq(control.id))
                .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
                .filter(journal_entry::Column::Status.eq(EntryStatus::Posted))
                .all(txn)
                .await?;
            for line in lines {
                gl_debit += line.debit_amount;
                gl_credit += line.credit_amount;
            }
        }

        // AR is debit-normal, AP credit-normal.
        let (gl_balance, item_type, code, name) = match control_type {
            ControlType::Ar => (
                gl_debit - gl_credit,
                OpenItemType::Receivable,
                codes::AR_RECON_MISMATCH,
                "Accounts receivable",
            ),
            ControlType::Ap => (
                gl_credit - gl_debit,
                OpenItemType::Payable,
                codes::AP_RECON_MISMATCH,
                "Accounts payable",
            ),
            _ => return Ok(()),
        };

        let open_items = open_item::Entity::find()
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .filter(open_item::Column::ItemType.eq(item_type))
            .filter(
                open_item::Column::Status.is_in([OpenItemStatus::Open, OpenItemStatus::Partial]),
            )
            .all(txn)
            .await?;
        let subledger_total: Decimal = open_items.iter().map(|i| i.open_amount).sum();

        let difference = (gl_balance - subledger_total).abs();
        if difference > RECON_TOLERANCE {
            let mut draft = IssueDraft::new(
                code,
                IssueSeverity::Red,
                format!("{} reconciliation mismatch", name),
                format!(
                    "Control account balance ({}) does not match open items total ({}). Difference: {}",
                    gl_balance, subledger_total, difference
                ),
            );
            draft.why = Some(
                "Manual postings to control accounts, or open items modified without matching \
                 GL postings, break the subledger reconciliation."
                    .to_string(),
            );
            draft.suggested_action = Some(format!(
                "Review recent {} transactions and check for manual control-account entries.",
                name.to_lowercase()
            ));
            draft.amount_discrepancy = Some(difference);
            drafts.push(draft);
        }

        Ok(())
    }

    async fn check_overdue_items(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        item_type: OpenItemType,
        drafts: &mut Vec<IssueDraft>,
    ) -> CoreResult<()> {
        let today = Utc::now().date_naive();

        let overdue = open_item::Entity::find()
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .filter(open_item::Column::ItemType.eq(item_type))
            .filter(
                open_item::Column::Status.is_in([OpenItemStatus::Open, OpenItemStatus::Partial]),
            )
            .filter(open_item::Column::DueDate.lt(today))
            .all(txn)
            .await?;

        for item in overdue {
            let days = (today - item.due_date).num_days();
            let (code, noun, action) = match item_type {
                OpenItemType::Receivable => (
                    codes::OVERDUE_RECEIVABLE,
                    "receivable",
                    "Contact the customer for payment.",
                ),
                OpenItemType::Payable => (
                    codes::OVERDUE_PAYABLE,
                    "payable",
                    "Schedule the payment to the supplier.",
                ),
            };

            let party_name = party::Entity::find_by_id(item.party_id)
                .one(txn)
                .await?
                .map(|p| p.name)
                .unwrap_or_else(|| format!("party {}", item.party_id));

            let mut draft = IssueDraft::new(
                code,
                overdue_severity(days),
                format!("Overdue {}: {}", noun, party_name),
                format!(
                    "Invoice {} is {} days overdue. Open amount: {}",
                    item.document_number.as_deref().unwrap_or("N/A"),
                    days,
                    item.open_amount
                ),
            );
            draft.why = Some(format!(
                "The due date ({}) has passed without full payment.",
                item.due_date
            ));
            draft.suggested_action = Some(action.to_string());
            draft.party_id = Some(item.party_id);
            draft.open_item_id = Some(item.id);
            draft.amount_discrepancy = Some(item.open_amount);
            drafts.push(draft);
        }

        Ok(())
    }

    async fn check_asset_correctness(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        drafts: &mut Vec<IssueDraft>,
    ) -> CoreResult<()> {
        let today = Utc::now().date_naive();

        let assets = fixed_asset::Entity::find()
            .filter(fixed_asset::Column::TenantId.eq(ctx.tenant_id))
            .filter(fixed_asset::Column::Status.eq(AssetStatus::Active))
            .all(txn)
            .await?;

        for asset in &assets {
            let schedules = depreciation_schedule::Entity::find()
                .filter(depreciation_schedule::Column::FixedAssetId.eq(asset.id))
                .all(txn)
                .await?;

            for schedule in schedules.iter().filter(|s| !s.is_posted && s.period_date <= today) {
                let mut draft = IssueDraft::new(
                    codes::DEPRECIATION_NOT_POSTED,
                    IssueSeverity::Yellow,
                    format!("Unposted depreciation: {}", asset.name),
                    format!(
                        "Depreciation for {} ({}) has not been posted.",
                        schedule.period_date.format("%B %Y"),
                        schedule.depreciation_amount
                    ),
                );
                draft.why = Some(
                    "Depreciation is posted monthly to keep asset values current.".to_string(),
                );
                draft.suggested_action =
                    Some("Run the depreciation posting for the pending period.".to_string());
                draft.fixed_asset_id = Some(asset.id);
                draft.amount_discrepancy = Some(schedule.depreciation_amount);
                drafts.push(draft);
            }

            let posted_total: Decimal = schedules
                .iter()
                .filter(|s| s.is_posted)
                .map(|s| s.depreciation_amount)
                .sum();

            let diff = (posted_total - asset.accumulated_depreciation).abs();
            if diff > RECON_TOLERANCE {
                let mut draft = IssueDraft::new(
                    codes::DEPRECIATION_MISMATCH,
                    IssueSeverity::Red,
                    format!("Depreciation mismatch: {}", asset.name),
                    format!(
                        "Posted depreciation total ({}) does not match accumulated depreciation ({}).",
                        posted_total, asset.accumulated_depreciation
                    ),
                );
                draft.why =
                    Some("The asset record and posted schedules are out of sync.".to_string());
                draft.suggested_action =
                    Some("Reconcile the asset record with the posted schedule rows.".to_string());
                draft.fixed_asset_id = Some(asset.id);
                draft.amount_discrepancy = Some(diff);
                drafts.push(draft);
            }
        }

        Ok(())
    }

    async fn check_vat_sanity(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        drafts: &mut Vec<IssueDraft>,
    ) -> CoreResult<()> {
        let lines = journal_line::Entity::find()
            .left_join(journal_entry::Entity)
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(journal_entry::Column::Status.eq(EntryStatus::Posted))
            .filter(journal_line::Column::VatAmount.is_not_null())
            .filter(journal_line::Column::VatBaseAmount.is_not_null())
            .all(txn)
            .await?;

        for line in lines {
            let (Some(vat), Some(base), Some(code_id)) =
                (line.vat_amount, line.vat_base_amount, line.vat_code_id)
            else {
                continue;
            };

            let entry = journal_entry::Entity::find_by_id(line.journal_entry_id)
                .one(txn)
                .await?
                .ok_or(crate::error::CoreError::NotFound {
                    entity: "journal_entry",
                    id: line.journal_entry_id,
                })?;

            let code = vat_code::Entity::find_by_id(code_id).one(txn).await?;
            if let Some(code) = code {
                if !crate::money::reconciles(base, vat, code.rate, VAT_TOLERANCE) {
                    let expected = crate::money::vat_from_base(base, code.rate);
                    let mut draft = IssueDraft::new(
                        codes::VAT_RATE_MISMATCH,
                        IssueSeverity::Yellow,
                        format!("VAT calculation mismatch in {}", entry.entry_number),
                        format!(
                            "Expected VAT {} ({}% of {}), but recorded {}.",
                            expected, code.rate, base, vat
                        ),
                    );
                    draft.suggested_action =
                        Some("Verify the VAT calculation and correct if needed.".to_string());
                    draft.journal_entry_id = Some(entry.id);
                    draft.amount_discrepancy = Some((expected - vat).abs());
                    drafts.push(draft);
                }
            }

            if vat < Decimal::ZERO
                && !matches!(
                    entry.source_type,
                    EntrySource::CreditNote | EntrySource::Reversal
                )
            {
                let mut draft = IssueDraft::new(
                    codes::VAT_NEGATIVE,
                    IssueSeverity::Yellow,
                    format!("Negative VAT in {}", entry.entry_number),
                    format!(
                        "VAT amount is negative ({}) which is unusual for this transaction type.",
                        vat
                    ),
                );
                draft.why = Some(
                    "Negative VAT is only expected on credit notes and reversals.".to_string(),
                );
                draft.journal_entry_id = Some(entry.id);
                drafts.push(draft);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdue_severity_thresholds() {
        assert_eq!(overdue_severity(1), IssueSeverity::Yellow);
        assert_eq!(overdue_severity(30), IssueSeverity::Yellow);
        assert_eq!(overdue_severity(31), IssueSeverity::Red);
        assert_eq!(overdue_severity(365), IssueSeverity::Red);
    }

    #[test]
    fn issue_draft_defaults_to_no_anchors() {
        let draft = IssueDraft::new(
            codes::JOURNAL_UNBALANCED,
            IssueSeverity::Red,
            "t",
            "d",
        );
        assert!(draft.journal_entry_id.is_none());
        assert!(draft.amount_discrepancy.is_none());
    }
}
