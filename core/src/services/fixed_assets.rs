//! Fixed Assets
//!
//! Asset lifecycle and straight-line depreciation. The full schedule is
//! generated when the asset is created; posting a schedule row routes
//! through the ledger and therefore inherits the period gate.

use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::context::RequestContext;
use crate::entities::{depreciation_schedule, fixed_asset, journal_entry};
use crate::entities::{AssetStatus, DepreciationMethod, EntrySource};
use crate::error::{CoreError, CoreResult};
use crate::money;
use crate::services::ledger::{CreateEntryInput, LedgerService, LineInput};

pub struct FixedAssetService;

#[derive(Debug, Clone)]
pub struct CreateAssetInput {
    pub code: String,
    pub name: String,
    pub acquisition_date: NaiveDate,
    pub acquisition_cost: Decimal,
    pub residual_value: Decimal,
    pub useful_life_months: i32,
    pub asset_account_id: i32,
    pub depreciation_account_id: i32,
    pub expense_account_id: i32,
}

/// One generated schedule row, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub period_date: NaiveDate,
    pub depreciation_amount: Decimal,
    pub accumulated_depreciation: Decimal,
    pub book_value_end: Decimal,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("valid first of month")
}

/// Straight-line schedule over `useful_life_months` rows starting at the
/// first of the acquisition month. The last row absorbs the rounding
/// residue so the accumulated total equals cost − residual exactly.
pub fn generate_schedule(
    acquisition_date: NaiveDate,
    acquisition_cost: Decimal,
    residual_value: Decimal,
    useful_life_months: i32,
) -> Vec<ScheduleRow> {
    if useful_life_months <= 0 {
        return Vec::new();
    }

    let depreciable = acquisition_cost - residual_value;
    let monthly = money::round_half_up(depreciable / Decimal::from(useful_life_months));

    let mut rows = Vec::with_capacity(useful_life_months as usize);
    let mut accumulated = Decimal::ZERO;
    let mut period = first_of_month(acquisition_date);

    for month in 0..useful_life_months {
        let amount = if month == useful_life_months - 1 {
            depreciable - accumulated
        } else {
            monthly
        };
        accumulated += amount;

        rows.push(ScheduleRow {
            period_date: period,
            depreciation_amount: amount,
            accumulated_depreciation: accumulated,
            book_value_end: acquisition_cost - accumulated,
        });

        period = period + Months::new(1);
    }

    rows
}

impl FixedAssetService {
    pub async fn create_asset(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        input: CreateAssetInput,
    ) -> CoreResult<fixed_asset::Model> {
        let txn = db.begin().await?;

        let now = Utc::now();
        let asset = fixed_asset::ActiveModel {
            tenant_id: Set(ctx.tenant_id),
            code: Set(input.code.clone()),
            name: Set(input.name.clone()),
            acquisition_date: Set(input.acquisition_date),
            acquisition_cost: Set(input.acquisition_cost),
            residual_value: Set(input.residual_value),
            useful_life_months: Set(input.useful_life_months),
            method: Set(DepreciationMethod::StraightLine),
            asset_account_id: Set(input.asset_account_id),
            depreciation_account_id: Set(input.depreciation_account_id),
            expense_account_id: Set(input.expense_account_id),
            accumulated_depreciation: Set(Decimal::ZERO),
            book_value: Set(input.acquisition_cost),
            status: Set(AssetStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let rows = generate_schedule(
            input.acquisition_date,
            input.acquisition_cost,
            input.residual_value,
            input.useful_life_months,
        );

        for row in rows {
            depreciation_schedule::ActiveModel {
                fixed_asset_id: Set(asset.id),
                period_date: Set(row.period_date),
                depreciation_amount: Set(row.depreciation_amount),
                accumulated_depreciation: Set(row.accumulated_depreciation),
                book_value_end: Set(row.book_value_end),
                is_posted: Set(false),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entity_type = "fixed_asset",
            entity_id = asset.id,
            event = "asset_created",
            "fixed asset {} created with {} schedule rows",
            asset.code,
            input.useful_life_months
        );

        Ok(asset)
    }

    pub async fn post_schedule(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        schedule_id: i32,
    ) -> CoreResult<journal_entry::Model> {
        let txn = db.begin().await?;
        let entry = Self::post_schedule_in_txn(&txn, ctx, schedule_id).await?;
        txn.commit().await?;
        Ok(entry)
    }

    /// Idempotent: a posted schedule returns its linked entry. Losers of
    /// the row lock observe `is_posted` and short-circuit the same way.
    pub async fn post_schedule_in_txn(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        schedule_id: i32,
    ) -> CoreResult<journal_entry::Model> {
        let schedule = depreciation_schedule::Entity::find_by_id(schedule_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "depreciation_schedule",
                id: schedule_id,
            })?;

        let asset = fixed_asset::Entity::find_by_id(schedule.fixed_asset_id)
            .filter(fixed_asset::Column::TenantId.eq(ctx.tenant_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "fixed_asset",
                id: schedule.fixed_asset_id,
            })?;

        if schedule.is_posted {
            let entry_id = schedule.journal_entry_id.ok_or(CoreError::EntryState {
                detail: format!("schedule {} posted without a journal entry", schedule.id),
            })?;
            return journal_entry::Entity::find_by_id(entry_id)
                .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
                .one(txn)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "journal_entry",
                    id: entry_id,
                });
        }

        if asset.status != AssetStatus::Active {
            return Err(CoreError::EntryState {
                detail: format!("asset {} is not active", asset.code),
            });
        }

        let entry = LedgerService::create_entry_in_txn(
            txn,
            ctx,
            CreateEntryInput {
                entry_date: schedule.period_date,
                description: format!(
                    "Depreciation: {} ({})",
                    asset.name,
                    schedule.period_date.format("%Y-%m")
                ),
                reference: None,
                lines: vec![
                    LineInput {
                        account_id: asset.expense_account_id,
                        description: Some(format!("Depreciation expense {}", asset.code)),
                        debit_amount: schedule.depreciation_amount,
                        ..Default::default()
                    },
                    LineInput {
                        account_id: asset.depreciation_account_id,
                        description: Some(format!("Accumulated depreciation {}", asset.code)),
                        credit_amount: schedule.depreciation_amount,
                        ..Default::default()
                    },
                ],
                source_type: EntrySource::AssetDepreciation,
                source_id: Some(asset.id),
                document_id: None,
                auto_post: true,
            },
        )
        .await?;

        let mut schedule_active: depreciation_schedule::ActiveModel = schedule.clone().into();
        schedule_active.journal_entry_id = Set(Some(entry.id));
        schedule_active.is_posted = Set(true);
        schedule_active.posted_at = Set(Some(Utc::now()));
        schedule_active.update(txn).await?;

        let accumulated = asset.accumulated_depreciation + schedule.depreciation_amount;
        let book_value = asset.acquisition_cost - accumulated;
        let status = if book_value <= asset.residual_value {
            AssetStatus::FullyDepreciated
        } else {
            asset.status
        };

        let asset_id = asset.id;
        let mut asset_active: fixed_asset::ActiveModel = asset.into();
        asset_active.accumulated_depreciation = Set(accumulated);
        asset_active.book_value = Set(book_value);
        asset_active.status = Set(status);
        asset_active.updated_at = Set(Utc::now());
        asset_active.update(txn).await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entity_type = "fixed_asset",
            entity_id = asset_id,
            entry = entry.id,
            event = "depreciation_posted",
            "depreciation schedule {} posted",
            schedule_id
        );

        Ok(entry)
    }

    /// Post every due, unposted schedule row for the tenant up to a date.
    pub async fn post_due_schedules(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        up_to: NaiveDate,
    ) -> CoreResult<Vec<journal_entry::Model>> {
        let due = depreciation_schedule::Entity::find()
            .left_join(fixed_asset::Entity)
            .filter(fixed_asset::Column::TenantId.eq(ctx.tenant_id))
            .filter(fixed_asset::Column::Status.eq(AssetStatus::Active))
            .filter(depreciation_schedule::Column::IsPosted.eq(false))
            .filter(depreciation_schedule::Column::PeriodDate.lte(up_to))
            .order_by_asc(depreciation_schedule::Column::PeriodDate)
            .all(db)
            .await?;

        let mut entries = Vec::with_capacity(due.len());
        for schedule in due {
            entries.push(Self::post_schedule(db, ctx, schedule.id).await?);
        }
        Ok(entries)
    }

    /// Mark an asset disposed and drop its remaining unposted schedule.
    pub async fn dispose(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        asset_id: i32,
    ) -> CoreResult<fixed_asset::Model> {
        let txn = db.begin().await?;

        let asset = fixed_asset::Entity::find_by_id(asset_id)
            .filter(fixed_asset::Column::TenantId.eq(ctx.tenant_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "fixed_asset",
                id: asset_id,
            })?;

        if asset.status == AssetStatus::Disposed {
            return Err(CoreError::EntryState {
                detail: format!("asset {} is already disposed", asset.code),
            });
        }

        depreciation_schedule::Entity::delete_many()
            .filter(depreciation_schedule::Column::FixedAssetId.eq(asset.id))
            .filter(depreciation_schedule::Column::IsPosted.eq(false))
            .exec(&txn)
            .await?;

        let mut active: fixed_asset::ActiveModel = asset.into();
        active.status = Set(AssetStatus::Disposed);
        active.updated_at = Set(Utc::now());
        let asset = active.update(&txn).await?;

        txn.commit().await?;
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn schedule_sums_to_cost_minus_residual() {
        let rows = generate_schedule(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            dec!(10000.00),
            dec!(1000.00),
            36,
        );

        assert_eq!(rows.len(), 36);
        assert_eq!(rows[0].depreciation_amount, dec!(250.00));
        let total: Decimal = rows.iter().map(|r| r.depreciation_amount).sum();
        assert_eq!(total, dec!(9000.00));
        assert_eq!(rows.last().unwrap().book_value_end, dec!(1000.00));
    }

    #[test]
    fn last_row_absorbs_rounding_residue() {
        // 1000 / 7 months = 142.857... -> 142.86 per month
        let rows = generate_schedule(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            dec!(1000.00),
            dec!(0.00),
            7,
        );

        assert_eq!(rows[0].depreciation_amount, dec!(142.86));
        let total: Decimal = rows.iter().map(|r| r.depreciation_amount).sum();
        assert_eq!(total, dec!(1000.00));
        assert_eq!(rows.last().unwrap().depreciation_amount, dec!(142.84));
        assert_eq!(rows.last().unwrap().accumulated_depreciation, dec!(1000.00));
    }

    #[test]
    fn schedule_starts_first_of_acquisition_month() {
        let rows = generate_schedule(
            NaiveDate::from_ymd_opt(2024, 7, 23).unwrap(),
            dec!(1200.00),
            dec!(0.00),
            12,
        );

        assert_eq!(rows[0].period_date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(rows[1].period_date, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
        assert_eq!(
            rows.last().unwrap().period_date,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
    }

    #[test]
    fn monotonic_accumulated_and_book_value() {
        let rows = generate_schedule(
            NaiveDate::from_ymd_opt(2023, 11, 30).unwrap(),
            dec!(5000.00),
            dec!(500.00),
            24,
        );

        for pair in rows.windows(2) {
            assert!(pair[1].period_date > pair[0].period_date);
            assert!(pair[1].accumulated_depreciation > pair[0].accumulated_depreciation);
            assert!(pair[1].book_value_end < pair[0].book_value_end);
        }
    }

    #[test]
    fn zero_life_produces_no_rows() {
        let rows = generate_schedule(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            dec!(1000.00),
            dec!(0.00),
            0,
        );
        assert!(rows.is_empty());
    }
}
