//! Period Control
//!
//! The period state machine (OPEN → REVIEW → FINALIZED → LOCKED), the
//! posting gate the ledger consults on every create/post, and the
//! finalization workflow that captures an immutable report snapshot.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::context::RequestContext;
use crate::entities::{
    issue, journal_entry, period, period_audit_log, period_snapshot, validation_run,
};
use crate::entities::{AuditAction, IssueSeverity, PeriodStatus};
use crate::error::{CoreError, CoreResult, IssueRef};
use crate::services::consistency::ConsistencyEngine;
use crate::services::reports::ReportService;
use crate::services::vat_posting::VatPostingService;

pub struct PeriodControlService;

fn issue_ref(issue: &issue::Model) -> IssueRef {
    IssueRef {
        id: issue.id,
        code: issue.code.clone(),
        severity: match issue.severity {
            IssueSeverity::Red => "RED".to_string(),
            IssueSeverity::Yellow => "YELLOW".to_string(),
        },
        title: issue.title.clone(),
    }
}

impl PeriodControlService {
    pub async fn get_period<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        period_id: i32,
    ) -> CoreResult<period::Model> {
        period::Entity::find_by_id(period_id)
            .filter(period::Column::TenantId.eq(ctx.tenant_id))
            .one(conn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "period",
                id: period_id,
            })
    }

    pub async fn find_period_for_date<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        date: chrono::NaiveDate,
    ) -> CoreResult<Option<period::Model>> {
        Ok(period::Entity::find()
            .filter(period::Column::TenantId.eq(ctx.tenant_id))
            .filter(period::Column::StartDate.lte(date))
            .filter(period::Column::EndDate.gte(date))
            .one(conn)
            .await?)
    }

    /// The next OPEN or REVIEW period starting after a date; reversals of
    /// finalized entries are routed here.
    pub async fn next_open_period<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        after: chrono::NaiveDate,
    ) -> CoreResult<Option<period::Model>> {
        Ok(period::Entity::find()
            .filter(period::Column::TenantId.eq(ctx.tenant_id))
            .filter(
                period::Column::Status.is_in([PeriodStatus::Open, PeriodStatus::Review]),
            )
            .filter(period::Column::StartDate.gt(after))
            .order_by_asc(period::Column::StartDate)
            .one(conn)
            .await?)
    }

    /// Posting gate, consulted by the ledger for every create and post.
    /// No period for the date means posting is allowed.
    pub async fn check_allows_posting<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        entry_date: chrono::NaiveDate,
    ) -> CoreResult<Option<period::Model>> {
        let period = Self::find_period_for_date(conn, ctx, entry_date).await?;

        let Some(period) = period else {
            return Ok(None);
        };

        match period.status {
            PeriodStatus::Open | PeriodStatus::Review => Ok(Some(period)),
            PeriodStatus::Finalized => {
                tracing::warn!(
                    tenant = ctx.tenant_id,
                    entity_type = "period",
                    entity_id = period.id,
                    severity = "WARNING",
                    event = "posting_rejected_finalized_period",
                    "posting attempt into finalized period {}",
                    period.name
                );
                Err(CoreError::PeriodFinalized {
                    period_name: period.name,
                })
            }
            PeriodStatus::Locked => {
                tracing::warn!(
                    tenant = ctx.tenant_id,
                    entity_type = "period",
                    entity_id = period.id,
                    severity = "WARNING",
                    event = "posting_rejected_locked_period",
                    "posting attempt into locked period {}",
                    period.name
                );
                Err(CoreError::PeriodLocked {
                    period_name: period.name,
                })
            }
        }
    }

    /// OPEN → REVIEW. Runs a full validation so the reviewer starts from a
    /// fresh issue list.
    pub async fn start_review(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        period_id: i32,
        notes: Option<String>,
    ) -> CoreResult<(period::Model, validation_run::Model)> {
        let period = Self::get_period(db, ctx, period_id).await?;

        if period.status != PeriodStatus::Open {
            return Err(CoreError::PeriodState {
                detail: format!(
                    "cannot start review: period {} is {}",
                    period.name,
                    period.status.as_str()
                ),
            });
        }

        let run = ConsistencyEngine::run_full_validation(db, ctx).await?;

        let txn = db.begin().await?;
        let from = period.status;
        let mut active: period::ActiveModel = period.into();
        active.status = Set(PeriodStatus::Review);
        active.review_started_at = Set(Some(Utc::now()));
        active.review_started_by = Set(Some(ctx.user_id()));
        active.updated_at = Set(Utc::now());
        let period = active.update(&txn).await?;

        Self::write_audit_log(
            &txn,
            ctx,
            &period,
            AuditAction::ReviewStart,
            from,
            PeriodStatus::Review,
            notes,
            None,
        )
        .await?;
        txn.commit().await?;

        Ok((period, run))
    }

    /// REVIEW → OPEN.
    pub async fn reopen(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        period_id: i32,
        notes: Option<String>,
    ) -> CoreResult<period::Model> {
        let txn = db.begin().await?;
        let period = Self::get_period(&txn, ctx, period_id).await?;

        if period.status != PeriodStatus::Review {
            return Err(CoreError::PeriodState {
                detail: format!(
                    "cannot reopen: period {} is {}",
                    period.name,
                    period.status.as_str()
                ),
            });
        }

        let from = period.status;
        let mut active: period::ActiveModel = period.into();
        active.status = Set(PeriodStatus::Open);
        active.updated_at = Set(Utc::now());
        let period = active.update(&txn).await?;

        Self::write_audit_log(
            &txn,
            ctx,
            &period,
            AuditAction::Reopen,
            from,
            PeriodStatus::Open,
            notes,
            None,
        )
        .await?;
        txn.commit().await?;

        Ok(period)
    }

    /// OPEN/REVIEW → FINALIZED.
    ///
    /// Prerequisites: no RED issues attached to the period, and every
    /// YELLOW issue explicitly acknowledged. On success the current
    /// reports are captured as an immutable snapshot.
    pub async fn finalize(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        period_id: i32,
        acknowledged_yellow_ids: &[i32],
        notes: Option<String>,
    ) -> CoreResult<(period::Model, period_snapshot::Model)> {
        let txn = db.begin().await?;
        let period = Self::get_period(&txn, ctx, period_id).await?;

        if !period.status.may_transition_to(PeriodStatus::Finalized) {
            return Err(CoreError::PeriodState {
                detail: format!(
                    "cannot finalize: period {} is {}",
                    period.name,
                    period.status.as_str()
                ),
            });
        }

        let (red_issues, yellow_issues) =
            Self::issues_for_period(&txn, ctx, &period).await?;

        let unacknowledged: Vec<&issue::Model> = yellow_issues
            .iter()
            .filter(|i| !acknowledged_yellow_ids.contains(&i.id))
            .collect();

        if !red_issues.is_empty() || !unacknowledged.is_empty() {
            return Err(CoreError::FinalizationPrerequisite {
                red: red_issues.len(),
                unacknowledged: unacknowledged.len(),
                red_issues: red_issues.iter().map(issue_ref).collect(),
                yellow_issues: unacknowledged.iter().map(|i| issue_ref(i)).collect(),
            });
        }

        let snapshot = Self::create_finalization_snapshot(
            &txn,
            ctx,
            &period,
            acknowledged_yellow_ids,
            yellow_issues.len(),
        )
        .await?;

        let from = period.status;
        let mut active: period::ActiveModel = period.into();
        active.status = Set(PeriodStatus::Finalized);
        active.finalized_at = Set(Some(Utc::now()));
        active.finalized_by = Set(Some(ctx.user_id()));
        active.updated_at = Set(Utc::now());
        let period = active.update(&txn).await?;

        Self::write_audit_log(
            &txn,
            ctx,
            &period,
            AuditAction::Finalize,
            from,
            PeriodStatus::Finalized,
            notes,
            Some(snapshot.id),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entity_type = "period",
            entity_id = period.id,
            event = "period_finalized",
            "period {} finalized",
            period.name
        );

        Ok((period, snapshot))
    }

    /// FINALIZED → LOCKED. Irreversible; the confirmation flag guards
    /// against accidental invocation from a UI.
    pub async fn lock(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        period_id: i32,
        confirm_irreversible: bool,
        notes: Option<String>,
    ) -> CoreResult<period::Model> {
        if !confirm_irreversible {
            return Err(CoreError::PeriodState {
                detail: "locking requires confirm_irreversible=true".to_string(),
            });
        }

        let txn = db.begin().await?;
        let period = Self::get_period(&txn, ctx, period_id).await?;

        if period.status != PeriodStatus::Finalized {
            return Err(CoreError::PeriodState {
                detail: format!(
                    "cannot lock: period {} is {}",
                    period.name,
                    period.status.as_str()
                ),
            });
        }

        let from = period.status;
        let mut active: period::ActiveModel = period.into();
        active.status = Set(PeriodStatus::Locked);
        active.locked_at = Set(Some(Utc::now()));
        active.locked_by = Set(Some(ctx.user_id()));
        active.updated_at = Set(Utc::now());
        let period = active.update(&txn).await?;

        Self::write_audit_log(
            &txn,
            ctx,
            &period,
            AuditAction::Lock,
            from,
            PeriodStatus::Locked,
            notes,
            None,
        )
        .await?;
        txn.commit().await?;

        Ok(period)
    }

    pub async fn get_snapshot<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        period_id: i32,
    ) -> CoreResult<Option<period_snapshot::Model>> {
        Ok(period_snapshot::Entity::find()
            .filter(period_snapshot::Column::TenantId.eq(ctx.tenant_id))
            .filter(period_snapshot::Column::PeriodId.eq(period_id))
            .order_by_desc(period_snapshot::Column::CreatedAt)
            .one(conn)
            .await?)
    }

    pub async fn audit_logs<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        period_id: i32,
    ) -> CoreResult<Vec<period_audit_log::Model>> {
        Ok(period_audit_log::Entity::find()
            .filter(period_audit_log::Column::TenantId.eq(ctx.tenant_id))
            .filter(period_audit_log::Column::PeriodId.eq(period_id))
            .order_by_desc(period_audit_log::Column::PerformedAt)
            .all(conn)
            .await?)
    }

    /// Unresolved issues split by severity, restricted to this period:
    /// issues anchored to a journal entry count when that entry belongs to
    /// the period; issues without an entry anchor are tenant-wide and
    /// always count.
    pub async fn issues_for_period<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        period: &period::Model,
    ) -> CoreResult<(Vec<issue::Model>, Vec<issue::Model>)> {
        let issues = issue::Entity::find()
            .filter(issue::Column::TenantId.eq(ctx.tenant_id))
            .filter(issue::Column::IsResolved.eq(false))
            .all(conn)
            .await?;

        let mut red = Vec::new();
        let mut yellow = Vec::new();

        for item in issues {
            let in_period = match item.journal_entry_id {
                Some(entry_id) => {
                    let entry = journal_entry::Entity::find_by_id(entry_id)
                        .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
                        .one(conn)
                        .await?;
                    entry.map(|e| e.period_id == Some(period.id)).unwrap_or(false)
                }
                None => true,
            };

            if in_period {
                match item.severity {
                    IssueSeverity::Red => red.push(item),
                    IssueSeverity::Yellow => yellow.push(item),
                }
            }
        }

        Ok((red, yellow))
    }

    async fn create_finalization_snapshot(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        period: &period::Model,
        acknowledged_yellow_ids: &[i32],
        yellow_count: usize,
    ) -> CoreResult<period_snapshot::Model> {
        let balance_sheet = ReportService::balance_sheet(txn, ctx, period.end_date).await?;
        let profit_and_loss =
            ReportService::profit_and_loss(txn, ctx, period.start_date, period.end_date).await?;
        let trial_balance = ReportService::trial_balance(txn, ctx, period.end_date).await?;
        let ar_aging = ReportService::ar_aging(txn, ctx, period.end_date).await?;
        let ap_aging = ReportService::ap_aging(txn, ctx, period.end_date).await?;
        let vat_summary =
            VatPostingService::vat_summary(txn, ctx, period.start_date, period.end_date).await?;

        let issue_summary = serde_json::json!({
            "red_count": 0,
            "yellow_count": yellow_count,
            "acknowledged_count": acknowledged_yellow_ids.len(),
        });

        let snapshot = period_snapshot::ActiveModel {
            period_id: Set(period.id),
            tenant_id: Set(ctx.tenant_id),
            snapshot_type: Set("FINALIZATION".to_string()),
            balance_sheet: Set(serde_json::to_value(&balance_sheet)
                .map_err(|e| CoreError::PeriodState { detail: e.to_string() })?),
            profit_and_loss: Set(serde_json::to_value(&profit_and_loss)
                .map_err(|e| CoreError::PeriodState { detail: e.to_string() })?),
            vat_summary: Set(serde_json::to_value(&vat_summary)
                .map_err(|e| CoreError::PeriodState { detail: e.to_string() })?),
            trial_balance: Set(serde_json::to_value(&trial_balance)
                .map_err(|e| CoreError::PeriodState { detail: e.to_string() })?),
            ar_aging: Set(serde_json::to_value(&ar_aging)
                .map_err(|e| CoreError::PeriodState { detail: e.to_string() })?),
            ap_aging: Set(serde_json::to_value(&ap_aging)
                .map_err(|e| CoreError::PeriodState { detail: e.to_string() })?),
            total_assets: Set(balance_sheet.total_assets),
            total_liabilities: Set(balance_sheet.current_liabilities.total
                + balance_sheet.long_term_liabilities.total),
            total_equity: Set(balance_sheet.equity.total),
            net_income: Set(profit_and_loss.net_income),
            total_ar: Set(ar_aging.total_open),
            total_ap: Set(ap_aging.total_open),
            acknowledged_yellow_issues: Set(Some(serde_json::json!(acknowledged_yellow_ids))),
            issue_summary: Set(Some(issue_summary)),
            created_by: Set(Some(ctx.user_id())),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        Ok(snapshot)
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_audit_log(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        period: &period::Model,
        action: AuditAction,
        from: PeriodStatus,
        to: PeriodStatus,
        notes: Option<String>,
        snapshot_id: Option<i32>,
    ) -> CoreResult<()> {
        period_audit_log::ActiveModel {
            period_id: Set(period.id),
            tenant_id: Set(ctx.tenant_id),
            action: Set(action),
            from_status: Set(from.as_str().to_string()),
            to_status: Set(to.as_str().to_string()),
            performed_by: Set(Some(ctx.user_id())),
            performed_at: Set(Utc::now()),
            ip_address: Set(ctx.ip_address.clone()),
            user_agent: Set(ctx.user_agent.clone()),
            notes: Set(notes),
            snapshot_id: Set(snapshot_id),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(())
    }
}
