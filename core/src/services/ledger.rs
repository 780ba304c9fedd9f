//! Ledger Core
//!
//! Journal entry creation, posting, reversal and balance queries with
//! double-entry enforcement. Public operations open one transaction each;
//! the `_in_txn` variants participate in a caller's transaction and never
//! commit.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

use crate::context::RequestContext;
use crate::entities::{account, entry_counter, journal_entry, journal_line, vat_code};
use crate::entities::{EntrySource, EntryStatus, PartyType};
use crate::error::{CoreError, CoreResult};
use crate::services::period_control::PeriodControlService;
use crate::services::subledger::SubledgerService;

pub struct LedgerService;

/// One journal line as handed to `create_entry`. Exactly one of
/// `debit_amount` / `credit_amount` may be non-zero.
#[derive(Debug, Clone, Default)]
pub struct LineInput {
    pub account_id: i32,
    pub description: Option<String>,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    pub vat_code_id: Option<i32>,
    pub vat_amount: Option<Decimal>,
    pub vat_base_amount: Option<Decimal>,
    pub vat_country: Option<String>,
    pub vat_is_reverse_charge: bool,
    pub party_type: Option<PartyType>,
    pub party_id: Option<i32>,
    pub party_vat_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateEntryInput {
    pub entry_date: chrono::NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub lines: Vec<LineInput>,
    pub source_type: EntrySource,
    pub source_id: Option<i32>,
    pub document_id: Option<i32>,
    pub auto_post: bool,
}

impl CreateEntryInput {
    pub fn manual(
        entry_date: chrono::NaiveDate,
        description: impl Into<String>,
        lines: Vec<LineInput>,
    ) -> Self {
        Self {
            entry_date,
            description: description.into(),
            reference: None,
            lines,
            source_type: EntrySource::Manual,
            source_id: None,
            document_id: None,
            auto_post: false,
        }
    }
}

/// Account balance as (total debit, total credit, net), where net respects
/// the account's normal side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountBalance {
    pub debit: Decimal,
    pub credit: Decimal,
    pub net: Decimal,
}

/// Entry numbers per tenant: `JE-NNNNNN` for regular entries, and
/// year-scoped prefixes for bank and depreciation batches.
pub fn format_entry_number(counter_key: &str, seq: i32) -> String {
    if counter_key == "JE" {
        format!("JE-{:06}", seq)
    } else {
        format!("{}-{:05}", counter_key, seq)
    }
}

fn counter_key_for(source: EntrySource, entry_date: chrono::NaiveDate) -> String {
    use chrono::Datelike;
    match source {
        EntrySource::BankPayment | EntrySource::BankExpense => {
            format!("BNK-{}", entry_date.year())
        }
        EntrySource::AssetDepreciation => format!("DEP-{}", entry_date.year()),
        _ => "JE".to_string(),
    }
}

impl LedgerService {
    /// Allocate the next sequence value for `(tenant, key)` under a row
    /// lock, so concurrent writers serialize and numbers stay monotonic.
    pub async fn next_entry_number(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        counter_key: &str,
    ) -> CoreResult<String> {
        let counter = entry_counter::Entity::find()
            .filter(entry_counter::Column::TenantId.eq(ctx.tenant_id))
            .filter(entry_counter::Column::CounterKey.eq(counter_key))
            .lock_exclusive()
            .one(txn)
            .await?;

        let seq = match counter {
            Some(counter) => {
                let next = counter.last_value + 1;
                let mut active: entry_counter::ActiveModel = counter.into();
                active.last_value = Set(next);
                active.update(txn).await?;
                next
            }
            None => {
                entry_counter::ActiveModel {
                    tenant_id: Set(ctx.tenant_id),
                    counter_key: Set(counter_key.to_string()),
                    last_value: Set(1),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                1
            }
        };

        Ok(format_entry_number(counter_key, seq))
    }

    pub async fn create_entry(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        input: CreateEntryInput,
    ) -> CoreResult<journal_entry::Model> {
        let txn = db.begin().await?;
        let entry = Self::create_entry_in_txn(&txn, ctx, input).await?;
        txn.commit().await?;
        Ok(entry)
    }

    pub async fn create_entry_in_txn(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        input: CreateEntryInput,
    ) -> CoreResult<journal_entry::Model> {
        if input.lines.is_empty() {
            return Err(CoreError::EmptyEntry);
        }

        // Exactly one side of a line may be non-zero.
        for line in &input.lines {
            let one_sided = (line.debit_amount.is_zero()) != (line.credit_amount.is_zero());
            if !one_sided {
                return Err(CoreError::Unbalanced {
                    debit: line.debit_amount,
                    credit: line.credit_amount,
                });
            }
        }

        let total_debit: Decimal = input.lines.iter().map(|l| l.debit_amount).sum();
        let total_credit: Decimal = input.lines.iter().map(|l| l.credit_amount).sum();
        if total_debit != total_credit {
            return Err(CoreError::Unbalanced {
                debit: total_debit,
                credit: total_credit,
            });
        }

        let period =
            PeriodControlService::check_allows_posting(txn, ctx, input.entry_date).await?;

        let accounts = Self::load_line_accounts(txn, ctx, &input.lines).await?;
        for line in &input.lines {
            let account = accounts
                .get(&line.account_id)
                .ok_or(CoreError::NotFound {
                    entity: "account",
                    id: line.account_id,
                })?;

            // Inactive accounts still accept reversals.
            if !account.is_active && input.source_type != EntrySource::Reversal {
                return Err(CoreError::InactiveAccount {
                    code: account.code.clone(),
                });
            }

            // Chart contract: a control account must declare its type.
            if account.is_control && account.control_type.is_none() {
                return Err(CoreError::EntryState {
                    detail: format!(
                        "control account {} has no control type configured",
                        account.code
                    ),
                });
            }

            if account.is_subledger_control() && line.party_id.is_none() {
                return Err(CoreError::MissingParty {
                    account_code: account.code.clone(),
                });
            }

            if let Some(vat_code_id) = line.vat_code_id {
                let exists = vat_code::Entity::find_by_id(vat_code_id)
                    .filter(vat_code::Column::TenantId.eq(ctx.tenant_id))
                    .one(txn)
                    .await?;
                if exists.is_none() {
                    return Err(CoreError::VatCodeUnknown {
                        code: vat_code_id.to_string(),
                    });
                }
            }
        }

        let counter_key = counter_key_for(input.source_type, input.entry_date);
        let entry_number = Self::next_entry_number(txn, ctx, &counter_key).await?;

        let now = Utc::now();
        let entry = journal_entry::ActiveModel {
            tenant_id: Set(ctx.tenant_id),
            period_id: Set(period.as_ref().map(|p| p.id)),
            document_id: Set(input.document_id),
            entry_number: Set(entry_number),
            entry_date: Set(input.entry_date),
            description: Set(input.description.clone()),
            reference: Set(input.reference.clone()),
            status: Set(EntryStatus::Draft),
            source_type: Set(input.source_type),
            source_id: Set(input.source_id),
            total_debit: Set(total_debit),
            total_credit: Set(total_credit),
            is_balanced: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        for (idx, line) in input.lines.iter().enumerate() {
            journal_line::ActiveModel {
                journal_entry_id: Set(entry.id),
                account_id: Set(line.account_id),
                line_no: Set(idx as i32 + 1),
                description: Set(line.description.clone()),
                debit_amount: Set(line.debit_amount),
                credit_amount: Set(line.credit_amount),
                vat_code_id: Set(line.vat_code_id),
                vat_amount: Set(line.vat_amount),
                vat_base_amount: Set(line.vat_base_amount),
                vat_country: Set(line.vat_country.clone()),
                vat_is_reverse_charge: Set(line.vat_is_reverse_charge),
                party_type: Set(line.party_type),
                party_id: Set(line.party_id),
                party_vat_number: Set(line.party_vat_number.clone()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }

        tracing::info!(
            tenant = ctx.tenant_id,
            entry = entry.id,
            number = %entry.entry_number,
            event = "entry_created",
            "journal entry created"
        );

        if input.auto_post {
            return Self::post_entry_in_txn(txn, ctx, entry.id).await;
        }

        Ok(entry)
    }

    pub async fn post_entry(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        entry_id: i32,
    ) -> CoreResult<journal_entry::Model> {
        let txn = db.begin().await?;
        let entry = Self::post_entry_in_txn(&txn, ctx, entry_id).await?;
        txn.commit().await?;
        Ok(entry)
    }

    pub async fn post_entry_in_txn(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        entry_id: i32,
    ) -> CoreResult<journal_entry::Model> {
        let entry = journal_entry::Entity::find_by_id(entry_id)
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "journal_entry",
                id: entry_id,
            })?;

        // Posting a posted entry is a no-op.
        if entry.status == EntryStatus::Posted {
            return Ok(entry);
        }

        if entry.status == EntryStatus::Reversed {
            return Err(CoreError::EntryState {
                detail: format!("entry {} is reversed and cannot be posted", entry.entry_number),
            });
        }

        let lines = journal_line::Entity::find()
            .filter(journal_line::Column::JournalEntryId.eq(entry.id))
            .all(txn)
            .await?;

        // The stored flag is a cache; the invariant is re-checked on POST.
        let total_debit: Decimal = lines.iter().map(|l| l.debit_amount).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit_amount).sum();
        if total_debit != total_credit {
            return Err(CoreError::Unbalanced {
                debit: total_debit,
                credit: total_credit,
            });
        }

        PeriodControlService::check_allows_posting(txn, ctx, entry.entry_date).await?;

        let mut active: journal_entry::ActiveModel = entry.into();
        active.status = Set(EntryStatus::Posted);
        active.posted_at = Set(Some(Utc::now()));
        active.posted_by = Set(Some(ctx.user_id()));
        active.updated_at = Set(Utc::now());
        let entry = active.update(txn).await?;

        SubledgerService::create_open_items_for_entry(txn, ctx, &entry, &lines).await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entry = entry.id,
            number = %entry.entry_number,
            event = "entry_posted",
            "journal entry posted"
        );

        Ok(entry)
    }

    pub async fn reverse_entry(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        entry_id: i32,
        reversal_date: chrono::NaiveDate,
        description: Option<String>,
    ) -> CoreResult<journal_entry::Model> {
        let txn = db.begin().await?;
        let reversal =
            Self::reverse_entry_in_txn(&txn, ctx, entry_id, reversal_date, description).await?;
        txn.commit().await?;
        Ok(reversal)
    }

    pub async fn reverse_entry_in_txn(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        entry_id: i32,
        reversal_date: chrono::NaiveDate,
        description: Option<String>,
    ) -> CoreResult<journal_entry::Model> {
        let entry = journal_entry::Entity::find_by_id(entry_id)
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "journal_entry",
                id: entry_id,
            })?;

        if entry.status != EntryStatus::Posted {
            return Err(CoreError::EntryState {
                detail: format!(
                    "only posted entries can be reversed; {} is {:?}",
                    entry.entry_number, entry.status
                ),
            });
        }
        if entry.reversed_by_id.is_some() {
            return Err(CoreError::EntryState {
                detail: format!("entry {} has already been reversed", entry.entry_number),
            });
        }

        let target_date =
            Self::resolve_reversal_date(txn, ctx, &entry, reversal_date).await?;

        let lines = journal_line::Entity::find()
            .filter(journal_line::Column::JournalEntryId.eq(entry.id))
            .all(txn)
            .await?;

        let reversal_lines = lines
            .iter()
            .map(|line| LineInput {
                account_id: line.account_id,
                description: Some(format!(
                    "Reversal: {}",
                    line.description.as_deref().unwrap_or("")
                )),
                debit_amount: line.credit_amount,
                credit_amount: line.debit_amount,
                vat_code_id: line.vat_code_id,
                vat_amount: line.vat_amount.map(|v| -v),
                vat_base_amount: line.vat_base_amount.map(|v| -v),
                vat_country: line.vat_country.clone(),
                vat_is_reverse_charge: line.vat_is_reverse_charge,
                party_type: line.party_type,
                party_id: line.party_id,
                party_vat_number: line.party_vat_number.clone(),
            })
            .collect();

        let reversal = Self::create_entry_in_txn(
            txn,
            ctx,
            CreateEntryInput {
                entry_date: target_date,
                description: description
                    .unwrap_or_else(|| format!("Reversal of {}", entry.entry_number)),
                reference: entry.reference.clone(),
                lines: reversal_lines,
                source_type: EntrySource::Reversal,
                source_id: Some(entry.id),
                document_id: None,
                auto_post: true,
            },
        )
        .await?;

        let mut reversal_active: journal_entry::ActiveModel = reversal.into();
        reversal_active.reverses_id = Set(Some(entry.id));
        let reversal = reversal_active.update(txn).await?;

        let entry_number = entry.entry_number.clone();
        let mut original: journal_entry::ActiveModel = entry.into();
        original.reversed_by_id = Set(Some(reversal.id));
        original.status = Set(EntryStatus::Reversed);
        original.updated_at = Set(Utc::now());
        original.update(txn).await?;

        // Settle any open items the original posting emitted, so the
        // subledger stays reconciled with the now net-zero GL effect.
        SubledgerService::settle_items_for_reversed_entry(txn, ctx, entry_id, &reversal, target_date)
            .await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entry = entry_id,
            reversal = reversal.id,
            number = %entry_number,
            event = "entry_reversed",
            "journal entry reversed"
        );

        Ok(reversal)
    }

    /// Pick the date a reversal lands on, honoring the period lifecycle of
    /// the original entry.
    async fn resolve_reversal_date(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        entry: &journal_entry::Model,
        requested: chrono::NaiveDate,
    ) -> CoreResult<chrono::NaiveDate> {
        use crate::entities::PeriodStatus;

        let original_period =
            PeriodControlService::find_period_for_date(txn, ctx, entry.entry_date).await?;

        match original_period {
            None => Ok(requested),
            Some(period) => match period.status {
                PeriodStatus::Open | PeriodStatus::Review => Ok(requested),
                PeriodStatus::Finalized => {
                    let next = PeriodControlService::next_open_period(txn, ctx, period.end_date)
                        .await?
                        .ok_or_else(|| CoreError::PeriodState {
                            detail: format!(
                                "no open period after {} to receive the reversal",
                                period.name
                            ),
                        })?;
                    if next.contains(requested) {
                        Ok(requested)
                    } else {
                        Ok(next.start_date)
                    }
                }
                PeriodStatus::Locked => Err(CoreError::PeriodLocked {
                    period_name: period.name,
                }),
            },
        }
    }

    /// Balance of one account over POSTED entries, optionally as of a date.
    pub async fn account_balance<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        account_id: i32,
        as_of: Option<chrono::NaiveDate>,
    ) -> CoreResult<AccountBalance> {
        let account = account::Entity::find_by_id(account_id)
            .filter(account::Column::TenantId.eq(ctx.tenant_id))
            .one(conn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "account",
                id: account_id,
            })?;

        let mut query = journal_line::Entity::find()
            .left_join(journal_entry::Entity)
            .filter(journal_line::Column::AccountId.eq(account_id))
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(journal_entry::Column::Status.eq(EntryStatus::Posted));

        if let Some(as_of) = as_of {
            query = query.filter(journal_entry::Column::EntryDate.lte(as_of));
        }

        let mut debit = Decimal::ZERO;
        let mut credit = Decimal::ZERO;
        for line in query.all(conn).await? {
            debit += line.debit_amount;
            credit += line.credit_amount;
        }

        let net = if account.account_type.is_debit_normal() {
            debit - credit
        } else {
            credit - debit
        };

        Ok(AccountBalance { debit, credit, net })
    }

    async fn load_line_accounts(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        lines: &[LineInput],
    ) -> CoreResult<HashMap<i32, account::Model>> {
        let ids: Vec<i32> = lines.iter().map(|l| l.account_id).collect();
        let accounts = account::Entity::find()
            .filter(account::Column::TenantId.eq(ctx.tenant_id))
            .filter(account::Column::Id.is_in(ids))
            .all(txn)
            .await?;
        Ok(accounts.into_iter().map(|a| (a.id, a)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn journal_numbers_are_zero_padded() {
        assert_eq!(format_entry_number("JE", 1), "JE-000001");
        assert_eq!(format_entry_number("JE", 123456), "JE-123456");
    }

    #[test]
    fn bank_and_depreciation_numbers_carry_the_year() {
        assert_eq!(format_entry_number("BNK-2024", 7), "BNK-2024-00007");
        assert_eq!(format_entry_number("DEP-2024", 12), "DEP-2024-00012");
    }

    #[test]
    fn counter_key_follows_entry_source() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(counter_key_for(EntrySource::Manual, date), "JE");
        assert_eq!(counter_key_for(EntrySource::Document, date), "JE");
        assert_eq!(counter_key_for(EntrySource::BankPayment, date), "BNK-2024");
        assert_eq!(counter_key_for(EntrySource::BankExpense, date), "BNK-2024");
        assert_eq!(
            counter_key_for(EntrySource::AssetDepreciation, date),
            "DEP-2024"
        );
    }
}
