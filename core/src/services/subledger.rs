//! Subledger & open items
//!
//! Open items are emitted when entries post to AR/AP control accounts and
//! are cleared through allocations. The GL balance of each control account
//! must equal the open subledger total at all times; the consistency engine
//! verifies that invariant.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};

use crate::context::RequestContext;
use crate::entities::{
    account, journal_entry, journal_line, open_item, open_item_allocation, party,
};
use crate::entities::{ControlType, EntrySource, OpenItemStatus, OpenItemType};
use crate::error::{CoreError, CoreResult};

pub struct SubledgerService;

const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 30;

impl SubledgerService {
    /// Emit open items for a freshly posted entry.
    ///
    /// Only the issuing side of a control account creates an item: a debit
    /// on AR (invoice to a customer) or a credit on AP (invoice from a
    /// supplier). Settlement-side postings clear items through allocations
    /// instead. Reversal entries never emit items; their effect on the
    /// subledger is handled by settlement.
    pub async fn create_open_items_for_entry(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        entry: &journal_entry::Model,
        lines: &[journal_line::Model],
    ) -> CoreResult<()> {
        if matches!(
            entry.source_type,
            EntrySource::Reversal | EntrySource::BankPayment
        ) {
            return Ok(());
        }

        for line in lines {
            let account = account::Entity::find_by_id(line.account_id)
                .filter(account::Column::TenantId.eq(ctx.tenant_id))
                .one(txn)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "account",
                    id: line.account_id,
                })?;

            let (item_type, signed) = match account.control_type {
                Some(ControlType::Ar) if account.is_control => {
                    (OpenItemType::Receivable, line.debit_amount - line.credit_amount)
                }
                Some(ControlType::Ap) if account.is_control => {
                    (OpenItemType::Payable, line.credit_amount - line.debit_amount)
                }
                _ => continue,
            };

            let party_id = match line.party_id {
                Some(party_id) => party_id,
                None => continue,
            };

            if signed <= Decimal::ZERO {
                continue;
            }

            let payment_terms = party::Entity::find_by_id(party_id)
                .filter(party::Column::TenantId.eq(ctx.tenant_id))
                .one(txn)
                .await?
                .map(|p| p.payment_terms_days as i64)
                .unwrap_or(DEFAULT_PAYMENT_TERMS_DAYS);

            let now = Utc::now();
            let item = open_item::ActiveModel {
                tenant_id: Set(ctx.tenant_id),
                party_id: Set(party_id),
                journal_entry_id: Set(entry.id),
                journal_line_id: Set(line.id),
                item_type: Set(item_type),
                document_number: Set(entry.reference.clone()),
                document_date: Set(entry.entry_date),
                due_date: Set(entry.entry_date + Duration::days(payment_terms)),
                original_amount: Set(signed),
                paid_amount: Set(Decimal::ZERO),
                open_amount: Set(signed),
                currency: Set("EUR".to_string()),
                status: Set(OpenItemStatus::Open),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            tracing::debug!(
                tenant = ctx.tenant_id,
                open_item = item.id,
                entry = entry.id,
                event = "open_item_created",
                "open item emitted for control account posting"
            );
        }

        Ok(())
    }

    pub async fn allocate(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        payment_entry_id: i32,
        open_item_id: i32,
        amount: Decimal,
        date: chrono::NaiveDate,
    ) -> CoreResult<open_item::Model> {
        let txn = db.begin().await?;
        let item =
            Self::allocate_in_txn(&txn, ctx, payment_entry_id, open_item_id, amount, date).await?;
        txn.commit().await?;
        Ok(item)
    }

    /// Apply a payment to an open item. The allocated amount is clamped to
    /// the remaining open amount; status re-derives from the new totals.
    pub async fn allocate_in_txn(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        payment_entry_id: i32,
        open_item_id: i32,
        amount: Decimal,
        date: chrono::NaiveDate,
    ) -> CoreResult<open_item::Model> {
        let item = open_item::Entity::find_by_id(open_item_id)
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "open_item",
                id: open_item_id,
            })?;

        if item.status == OpenItemStatus::WrittenOff {
            return Err(CoreError::EntryState {
                detail: format!("open item {} is written off", item.id),
            });
        }

        let allocated = amount.min(item.open_amount);
        if allocated <= Decimal::ZERO {
            return Ok(item);
        }

        open_item_allocation::ActiveModel {
            open_item_id: Set(item.id),
            payment_entry_id: Set(payment_entry_id),
            allocated_amount: Set(allocated),
            allocation_date: Set(date),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let paid = item.paid_amount + allocated;
        let open = item.original_amount - paid;
        let status = OpenItemStatus::derive(paid, item.original_amount);

        let item_id = item.id;
        let mut active: open_item::ActiveModel = item.into();
        active.paid_amount = Set(paid);
        active.open_amount = Set(open);
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let item = active.update(txn).await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            open_item = item_id,
            payment_entry = payment_entry_id,
            amount = %allocated,
            event = "allocation_applied",
            "payment allocated to open item"
        );

        Ok(item)
    }

    /// Remove every allocation made by a payment entry, re-deriving the
    /// status of the affected items. A fully paid item re-opens.
    pub async fn deallocate_payment_in_txn(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        payment_entry_id: i32,
    ) -> CoreResult<()> {
        let allocations = open_item_allocation::Entity::find()
            .filter(open_item_allocation::Column::PaymentEntryId.eq(payment_entry_id))
            .all(txn)
            .await?;

        for allocation in allocations {
            let item = open_item::Entity::find_by_id(allocation.open_item_id)
                .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "open_item",
                    id: allocation.open_item_id,
                })?;

            open_item_allocation::Entity::delete_by_id(allocation.id)
                .exec(txn)
                .await?;

            let paid = item.paid_amount - allocation.allocated_amount;
            let open = item.original_amount - paid;
            let status = if item.status == OpenItemStatus::WrittenOff {
                OpenItemStatus::WrittenOff
            } else {
                OpenItemStatus::derive(paid, item.original_amount)
            };

            let mut active: open_item::ActiveModel = item.into();
            active.paid_amount = Set(paid);
            active.open_amount = Set(open);
            active.status = Set(status);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
        }

        Ok(())
    }

    /// Write an item off. The open amount is left untouched so the ledger
    /// can later emit a compensating entry.
    pub async fn write_off(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        open_item_id: i32,
        reason: &str,
    ) -> CoreResult<open_item::Model> {
        let txn = db.begin().await?;
        let item = open_item::Entity::find_by_id(open_item_id)
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "open_item",
                id: open_item_id,
            })?;

        let item_id = item.id;
        let mut active: open_item::ActiveModel = item.into();
        active.status = Set(OpenItemStatus::WrittenOff);
        active.updated_at = Set(Utc::now());
        let item = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            open_item = item_id,
            reason = reason,
            event = "open_item_written_off",
            "open item written off"
        );

        Ok(item)
    }

    /// After an entry is reversed, close out the open items it emitted by
    /// allocating their remaining amount against the reversal, and undo any
    /// allocations the entry itself had made as a payment.
    pub async fn settle_items_for_reversed_entry(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        reversed_entry_id: i32,
        reversal: &journal_entry::Model,
        date: chrono::NaiveDate,
    ) -> CoreResult<()> {
        let items = open_item::Entity::find()
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .filter(open_item::Column::JournalEntryId.eq(reversed_entry_id))
            .all(txn)
            .await?;

        for item in items {
            if item.status.counts_as_open() && item.open_amount > Decimal::ZERO {
                Self::allocate_in_txn(txn, ctx, reversal.id, item.id, item.open_amount, date)
                    .await?;
            }
        }

        Self::deallocate_payment_in_txn(txn, ctx, reversed_entry_id).await?;

        Ok(())
    }

    /// Open subledger total per control type, used by reconciliation checks
    /// and the aging reports.
    pub async fn open_total<C: sea_orm::ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        item_type: OpenItemType,
    ) -> CoreResult<Decimal> {
        let items = open_item::Entity::find()
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .filter(open_item::Column::ItemType.eq(item_type))
            .filter(
                open_item::Column::Status
                    .is_in([OpenItemStatus::Open, OpenItemStatus::Partial]),
            )
            .all(conn)
            .await?;

        Ok(items.iter().map(|i| i.open_amount).sum())
    }
}
