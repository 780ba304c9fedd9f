//! Bank Reconciliation
//!
//! Idempotent statement import keyed on a content hash, a rule-based match
//! proposal engine with explainable confidence scores, and the accept /
//! ignore / create-expense / unmatch operations. Every decision writes an
//! audit row.

use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::context::RequestContext;
use crate::entities::{
    bank_account, bank_match_proposal, bank_transaction, journal_entry, journal_line, open_item,
    reconciliation_action,
};
use crate::entities::{
    BankTransactionStatus, EntrySource, MatchRuleType, MatchedEntityType, OpenItemStatus,
    OpenItemType, PartyType, ProposalStatus, ReconciliationActionType,
};
use crate::error::{CoreError, CoreResult};
use crate::interfaces::NormalizedBankTransaction;
use crate::services::ledger::{CreateEntryInput, LedgerService, LineInput};
use crate::services::subledger::SubledgerService;
use crate::services::vat_posting::VatPostingService;

pub struct BankReconciliationService;

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub transaction_ids: Vec<i32>,
}

const AMOUNT_TOLERANCE_PCT: Decimal = dec!(0.01);

/// Idempotency hash over the normalized transaction fields. Two imports of
/// the same row always produce the same 64-hex digest.
pub fn compute_import_hash(
    tenant_id: i32,
    booking_date: chrono::NaiveDate,
    amount: Decimal,
    description: &str,
    reference: Option<&str>,
    counterparty_iban: Option<&str>,
) -> String {
    let input = [
        tenant_id.to_string(),
        booking_date.format("%Y-%m-%d").to_string(),
        format!("{:.2}", amount),
        description.trim().to_string(),
        reference.unwrap_or("").trim().to_string(),
        counterparty_iban.unwrap_or("").trim().to_string(),
    ]
    .join("|");

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn invoice_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(factuur|invoice|inv)[:\s#-]*([A-Za-z0-9-]+)").expect("valid regex")
    })
}

/// Candidate invoice numbers mentioned in free text.
pub fn extract_invoice_tokens(text: &str) -> Vec<String> {
    invoice_regex()
        .captures_iter(text)
        .filter_map(|c| c.get(2))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether two amounts agree within a relative tolerance of the open
/// amount.
pub fn amount_within_tolerance(open_amount: Decimal, tx_amount: Decimal, pct: Decimal) -> bool {
    if open_amount.is_zero() {
        return false;
    }
    (open_amount - tx_amount).abs() <= open_amount.abs() * pct
}

#[derive(Debug, Clone)]
struct ProposalDraft {
    entity_type: MatchedEntityType,
    entity_id: i32,
    confidence: i32,
    reason: String,
    rule_type: MatchRuleType,
    matched_amount: Option<Decimal>,
    matched_date: Option<chrono::NaiveDate>,
}

impl BankReconciliationService {
    /// Import normalized transactions. Rows whose hash already exists for
    /// the tenant are skipped, so re-importing a file is a no-op for the
    /// overlap.
    pub async fn import_transactions(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        bank_account_id: i32,
        transactions: impl IntoIterator<Item = NormalizedBankTransaction>,
    ) -> CoreResult<ImportSummary> {
        let txn = db.begin().await?;

        let bank = bank_account::Entity::find_by_id(bank_account_id)
            .filter(bank_account::Column::TenantId.eq(ctx.tenant_id))
            .one(&txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "bank_account",
                id: bank_account_id,
            })?;

        let mut summary = ImportSummary::default();
        for tx in transactions {
            let hash = compute_import_hash(
                ctx.tenant_id,
                tx.booking_date,
                tx.amount,
                &tx.description,
                tx.reference.as_deref(),
                tx.counterparty_iban.as_deref(),
            );

            let exists = bank_transaction::Entity::find()
                .filter(bank_transaction::Column::TenantId.eq(ctx.tenant_id))
                .filter(bank_transaction::Column::ImportHash.eq(&hash))
                .one(&txn)
                .await?;
            if exists.is_some() {
                summary.skipped += 1;
                continue;
            }

            let row = bank_transaction::ActiveModel {
                tenant_id: Set(ctx.tenant_id),
                bank_account_id: Set(bank.id),
                booking_date: Set(tx.booking_date),
                amount: Set(tx.amount),
                currency: Set(tx.currency.clone()),
                counterparty_name: Set(tx.counterparty_name.clone()),
                counterparty_iban: Set(tx.counterparty_iban.clone()),
                description: Set(tx.description.trim().to_string()),
                reference: Set(tx.reference.clone()),
                import_hash: Set(hash),
                status: Set(BankTransactionStatus::New),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            summary.imported += 1;
            summary.transaction_ids.push(row.id);
        }

        txn.commit().await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entity_type = "bank_account",
            entity_id = bank_account_id,
            event = "bank_import_completed",
            imported = summary.imported,
            skipped = summary.skipped,
            "bank statement imported"
        );

        Ok(summary)
    }

    /// Generate (or refresh) match proposals for a transaction. Existing
    /// SUGGESTED proposals for the same (entity, rule) are updated in
    /// place, never duplicated.
    pub async fn generate_proposals(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        tx_id: i32,
    ) -> CoreResult<Vec<bank_match_proposal::Model>> {
        let txn = db.begin().await?;

        let tx = Self::get_transaction(&txn, ctx, tx_id).await?;
        if tx.status != BankTransactionStatus::New {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        let item_type = if tx.is_inbound() {
            OpenItemType::Receivable
        } else {
            OpenItemType::Payable
        };
        let magnitude = tx.amount.abs();

        let open_items = open_item::Entity::find()
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .filter(open_item::Column::ItemType.eq(item_type))
            .filter(
                open_item::Column::Status.is_in([OpenItemStatus::Open, OpenItemStatus::Partial]),
            )
            .all(&txn)
            .await?;

        let mut drafts: Vec<ProposalDraft> = Vec::new();

        // Rule 1: invoice number mentioned in description or reference.
        let mut haystack = tx.description.clone();
        if let Some(reference) = &tx.reference {
            haystack.push(' ');
            haystack.push_str(reference);
        }
        for token in extract_invoice_tokens(&haystack) {
            for item in &open_items {
                let matches = item
                    .document_number
                    .as_deref()
                    .map(|d| d.trim().eq_ignore_ascii_case(token.trim()))
                    .unwrap_or(false);
                if matches {
                    drafts.push(ProposalDraft {
                        entity_type: MatchedEntityType::OpenItem,
                        entity_id: item.id,
                        confidence: 90,
                        reason: format!("Invoice number {} found in transaction text", token),
                        rule_type: MatchRuleType::InvoiceNumber,
                        matched_amount: Some(item.open_amount),
                        matched_date: Some(tx.booking_date),
                    });
                }
            }
        }

        // Rule 2: exact open amount.
        for item in &open_items {
            if item.open_amount == magnitude {
                drafts.push(ProposalDraft {
                    entity_type: MatchedEntityType::OpenItem,
                    entity_id: item.id,
                    confidence: 80,
                    reason: format!("Open amount {} equals the transaction amount", item.open_amount),
                    rule_type: MatchRuleType::AmountExact,
                    matched_amount: Some(item.open_amount),
                    matched_date: Some(tx.booking_date),
                });
            }
        }

        // Rule 3: the same counterparty IBAN was matched before.
        if let Some(iban) = tx.counterparty_iban.as_deref().filter(|i| !i.is_empty()) {
            let prior = bank_transaction::Entity::find()
                .filter(bank_transaction::Column::TenantId.eq(ctx.tenant_id))
                .filter(bank_transaction::Column::CounterpartyIban.eq(iban))
                .filter(bank_transaction::Column::Status.eq(BankTransactionStatus::Matched))
                .filter(bank_transaction::Column::Id.ne(tx.id))
                .order_by_desc(bank_transaction::Column::BookingDate)
                .one(&txn)
                .await?;

            if let Some(prior) = prior {
                if let (Some(entity_type), Some(entity_id)) =
                    (prior.matched_entity_type, prior.matched_entity_id)
                {
                    drafts.push(ProposalDraft {
                        entity_type,
                        entity_id,
                        confidence: 70,
                        reason: format!("Counterparty {} was matched the same way before", iban),
                        rule_type: MatchRuleType::IbanRecurring,
                        matched_amount: Some(magnitude),
                        matched_date: Some(tx.booking_date),
                    });
                }
            }
        }

        // Rule 4: amount within 1% of an open item.
        for item in &open_items {
            if item.open_amount != magnitude
                && amount_within_tolerance(item.open_amount, magnitude, AMOUNT_TOLERANCE_PCT)
            {
                drafts.push(ProposalDraft {
                    entity_type: MatchedEntityType::OpenItem,
                    entity_id: item.id,
                    confidence: 60,
                    reason: format!(
                        "Transaction amount {} is within 1% of open amount {}",
                        magnitude, item.open_amount
                    ),
                    rule_type: MatchRuleType::AmountTolerance,
                    matched_amount: Some(item.open_amount),
                    matched_date: Some(tx.booking_date),
                });
            }
        }

        let mut persisted = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let existing = bank_match_proposal::Entity::find()
                .filter(bank_match_proposal::Column::BankTransactionId.eq(tx.id))
                .filter(bank_match_proposal::Column::EntityType.eq(draft.entity_type))
                .filter(bank_match_proposal::Column::EntityId.eq(draft.entity_id))
                .filter(bank_match_proposal::Column::RuleType.eq(draft.rule_type))
                .filter(bank_match_proposal::Column::Status.eq(ProposalStatus::Suggested))
                .one(&txn)
                .await?;

            let model = match existing {
                Some(existing) => {
                    let mut active: bank_match_proposal::ActiveModel = existing.into();
                    active.confidence = Set(draft.confidence);
                    active.reason = Set(draft.reason);
                    active.matched_amount = Set(draft.matched_amount);
                    active.matched_date = Set(draft.matched_date);
                    active.updated_at = Set(Utc::now());
                    active.update(&txn).await?
                }
                None => bank_match_proposal::ActiveModel {
                    tenant_id: Set(ctx.tenant_id),
                    bank_transaction_id: Set(tx.id),
                    entity_type: Set(draft.entity_type),
                    entity_id: Set(draft.entity_id),
                    confidence: Set(draft.confidence),
                    reason: Set(draft.reason),
                    matched_amount: Set(draft.matched_amount),
                    matched_date: Set(draft.matched_date),
                    rule_type: Set(draft.rule_type),
                    status: Set(ProposalStatus::Suggested),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?,
            };
            persisted.push(model);
        }

        txn.commit().await?;
        Ok(persisted)
    }

    /// Accept a match: create the payment entry on demand, allocate it to
    /// the open item, expire sibling proposals and mark the transaction
    /// MATCHED.
    pub async fn apply_match(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        tx_id: i32,
        entity_type: MatchedEntityType,
        entity_id: i32,
    ) -> CoreResult<bank_transaction::Model> {
        let txn = db.begin().await?;

        let tx = Self::get_transaction_locked(&txn, ctx, tx_id).await?;

        match tx.status {
            BankTransactionStatus::New | BankTransactionStatus::NeedsReview => {}
            BankTransactionStatus::Matched => {
                // A concurrent accept won; observe its result.
                if tx.matched_entity_type == Some(entity_type)
                    && tx.matched_entity_id == Some(entity_id)
                {
                    txn.commit().await?;
                    return Ok(tx);
                }
                return Err(CoreError::RaceCondition {
                    detail: format!(
                        "transaction {} was concurrently matched to another entity",
                        tx.id
                    ),
                });
            }
            BankTransactionStatus::Ignored => {
                return Err(CoreError::EntryState {
                    detail: format!("transaction {} is ignored", tx.id),
                });
            }
        }

        if entity_type == MatchedEntityType::OpenItem {
            let item = open_item::Entity::find_by_id(entity_id)
                .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
                .one(&txn)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "open_item",
                    id: entity_id,
                })?;

            let payment = Self::create_payment_entry(&txn, ctx, &tx, &item).await?;
            SubledgerService::allocate_in_txn(
                &txn,
                ctx,
                payment.id,
                item.id,
                tx.amount.abs(),
                tx.booking_date,
            )
            .await?;
        } else {
            // Matching against an existing journal entry records the link
            // without generating postings.
            journal_entry::Entity::find_by_id(entity_id)
                .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
                .one(&txn)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "journal_entry",
                    id: entity_id,
                })?;
        }

        Self::resolve_proposals(&txn, ctx, tx.id, Some((entity_type, entity_id))).await?;

        let mut active: bank_transaction::ActiveModel = tx.into();
        active.status = Set(BankTransactionStatus::Matched);
        active.matched_entity_type = Set(Some(entity_type));
        active.matched_entity_id = Set(Some(entity_id));
        let tx = active.update(&txn).await?;

        Self::record_action(
            &txn,
            ctx,
            tx.id,
            ReconciliationActionType::ApplyMatch,
            serde_json::json!({
                "entity_type": entity_type,
                "entity_id": entity_id,
                "amount": tx.amount,
            }),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(
            tenant = ctx.tenant_id,
            entity_type = "bank_transaction",
            entity_id = tx.id,
            event = "match_applied",
            "bank transaction matched"
        );

        Ok(tx)
    }

    /// Book an unmatched outbound debit straight to an expense account,
    /// extracting VAT from the gross amount. Idempotent per transaction: a
    /// second call returns the entry created by the first.
    pub async fn create_expense(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        tx_id: i32,
        expense_account_id: i32,
        vat_code_id: Option<i32>,
    ) -> CoreResult<journal_entry::Model> {
        let txn = db.begin().await?;

        let tx = Self::get_transaction_locked(&txn, ctx, tx_id).await?;

        if tx.status == BankTransactionStatus::Matched {
            if let (Some(MatchedEntityType::JournalEntry), Some(entry_id)) =
                (tx.matched_entity_type, tx.matched_entity_id)
            {
                let entry = journal_entry::Entity::find_by_id(entry_id)
                    .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
                    .one(&txn)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "journal_entry",
                        id: entry_id,
                    })?;
                txn.commit().await?;
                return Ok(entry);
            }
            return Err(CoreError::EntryState {
                detail: format!("transaction {} is already matched to an open item", tx.id),
            });
        }

        if tx.status == BankTransactionStatus::Ignored {
            return Err(CoreError::EntryState {
                detail: format!("transaction {} is ignored", tx.id),
            });
        }

        if tx.is_inbound() {
            return Err(CoreError::EntryState {
                detail: "CREATE_EXPENSE requires an outbound debit".to_string(),
            });
        }

        let bank = bank_account::Entity::find_by_id(tx.bank_account_id)
            .one(&txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "bank_account",
                id: tx.bank_account_id,
            })?;

        let gross = tx.amount.abs();
        let mut lines: Vec<LineInput> = Vec::new();

        match vat_code_id {
            Some(vat_code_id) => {
                let code = VatPostingService::get_vat_code(&txn, ctx, vat_code_id).await?;
                let (base, vat) = crate::money::split_gross(gross, code.rate);

                lines.push(LineInput {
                    account_id: expense_account_id,
                    description: Some(tx.description.clone()),
                    debit_amount: base,
                    vat_code_id: Some(code.id),
                    vat_base_amount: Some(base),
                    ..Default::default()
                });
                if vat > Decimal::ZERO {
                    let vat_account = code.purchase_account_id.ok_or(CoreError::EntryState {
                        detail: format!("VAT code {} has no purchase account", code.code),
                    })?;
                    lines.push(LineInput {
                        account_id: vat_account,
                        description: Some(format!("VAT on {}", tx.description)),
                        debit_amount: vat,
                        vat_code_id: Some(code.id),
                        vat_amount: Some(vat),
                        vat_base_amount: Some(base),
                        ..Default::default()
                    });
                }
            }
            None => {
                lines.push(LineInput {
                    account_id: expense_account_id,
                    description: Some(tx.description.clone()),
                    debit_amount: gross,
                    ..Default::default()
                });
            }
        }

        lines.push(LineInput {
            account_id: bank.ledger_account_id,
            description: Some(tx.description.clone()),
            credit_amount: gross,
            ..Default::default()
        });

        let entry = LedgerService::create_entry_in_txn(
            &txn,
            ctx,
            CreateEntryInput {
                entry_date: tx.booking_date,
                description: format!("Bank expense: {}", tx.description),
                reference: tx.reference.clone(),
                lines,
                source_type: EntrySource::BankExpense,
                source_id: Some(tx.id),
                document_id: None,
                auto_post: true,
            },
        )
        .await?;

        Self::resolve_proposals(&txn, ctx, tx.id, None).await?;

        let mut active: bank_transaction::ActiveModel = tx.into();
        active.status = Set(BankTransactionStatus::Matched);
        active.matched_entity_type = Set(Some(MatchedEntityType::JournalEntry));
        active.matched_entity_id = Set(Some(entry.id));
        let tx = active.update(&txn).await?;

        Self::record_action(
            &txn,
            ctx,
            tx.id,
            ReconciliationActionType::CreateExpense,
            serde_json::json!({
                "expense_account_id": expense_account_id,
                "vat_code_id": vat_code_id,
                "entry_id": entry.id,
            }),
        )
        .await?;

        txn.commit().await?;
        Ok(entry)
    }

    /// NEW → IGNORED.
    pub async fn ignore(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        tx_id: i32,
    ) -> CoreResult<bank_transaction::Model> {
        let txn = db.begin().await?;
        let tx = Self::get_transaction_locked(&txn, ctx, tx_id).await?;

        if tx.status == BankTransactionStatus::Ignored {
            return Err(CoreError::IdempotentNoop);
        }
        if tx.status != BankTransactionStatus::New {
            return Err(CoreError::EntryState {
                detail: format!("only NEW transactions can be ignored; {} is {:?}", tx.id, tx.status),
            });
        }

        let mut active: bank_transaction::ActiveModel = tx.into();
        active.status = Set(BankTransactionStatus::Ignored);
        let tx = active.update(&txn).await?;

        Self::record_action(
            &txn,
            ctx,
            tx.id,
            ReconciliationActionType::Ignore,
            serde_json::json!({}),
        )
        .await?;

        txn.commit().await?;
        Ok(tx)
    }

    /// MATCHED → NEW. The payment or expense entry generated by the match
    /// is reversed (never deleted) and its allocations are undone.
    pub async fn unmatch(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        tx_id: i32,
    ) -> CoreResult<bank_transaction::Model> {
        let txn = db.begin().await?;
        let tx = Self::get_transaction_locked(&txn, ctx, tx_id).await?;

        if tx.status != BankTransactionStatus::Matched {
            return Err(CoreError::EntryState {
                detail: format!("transaction {} is not matched", tx.id),
            });
        }

        // Find the entry this match generated, if any.
        let generated = journal_entry::Entity::find()
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(
                journal_entry::Column::SourceType
                    .is_in([EntrySource::BankPayment, EntrySource::BankExpense]),
            )
            .filter(journal_entry::Column::SourceId.eq(tx.id))
            .filter(journal_entry::Column::ReversedById.is_null())
            .one(&txn)
            .await?;

        let mut reversal_id = None;
        if let Some(entry) = generated {
            let reversal = LedgerService::reverse_entry_in_txn(
                &txn,
                ctx,
                entry.id,
                tx.booking_date,
                Some(format!("Unmatch bank transaction {}", tx.id)),
            )
            .await?;
            reversal_id = Some(reversal.id);
        }

        let matched = (tx.matched_entity_type, tx.matched_entity_id);
        let mut active: bank_transaction::ActiveModel = tx.into();
        active.status = Set(BankTransactionStatus::New);
        active.matched_entity_type = Set(None);
        active.matched_entity_id = Set(None);
        let tx = active.update(&txn).await?;

        Self::record_action(
            &txn,
            ctx,
            tx.id,
            ReconciliationActionType::Unmatch,
            serde_json::json!({
                "previous_entity_type": matched.0,
                "previous_entity_id": matched.1,
                "reversal_entry_id": reversal_id,
            }),
        )
        .await?;

        txn.commit().await?;
        Ok(tx)
    }

    async fn create_payment_entry(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        tx: &bank_transaction::Model,
        item: &open_item::Model,
    ) -> CoreResult<journal_entry::Model> {
        let bank = bank_account::Entity::find_by_id(tx.bank_account_id)
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "bank_account",
                id: tx.bank_account_id,
            })?;

        let control_line = journal_line::Entity::find_by_id(item.journal_line_id)
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "journal_line",
                id: item.journal_line_id,
            })?;

        let amount = tx.amount.abs();
        let settles = format!(
            "Settles {}",
            item.document_number.as_deref().unwrap_or("open item")
        );
        let lines = match item.item_type {
            // Customer paid us: money in, receivable cleared.
            OpenItemType::Receivable => vec![
                LineInput {
                    account_id: bank.ledger_account_id,
                    description: Some(format!("Payment received: {}", tx.description)),
                    debit_amount: amount,
                    ..Default::default()
                },
                LineInput {
                    account_id: control_line.account_id,
                    description: Some(settles),
                    credit_amount: amount,
                    party_type: Some(PartyType::Customer),
                    party_id: Some(item.party_id),
                    ..Default::default()
                },
            ],
            // We paid a supplier: payable cleared, money out.
            OpenItemType::Payable => vec![
                LineInput {
                    account_id: control_line.account_id,
                    description: Some(settles),
                    debit_amount: amount,
                    party_type: Some(PartyType::Supplier),
                    party_id: Some(item.party_id),
                    ..Default::default()
                },
                LineInput {
                    account_id: bank.ledger_account_id,
                    description: Some(format!("Payment sent: {}", tx.description)),
                    credit_amount: amount,
                    ..Default::default()
                },
            ],
        };

        LedgerService::create_entry_in_txn(
            txn,
            ctx,
            CreateEntryInput {
                entry_date: tx.booking_date,
                description: format!("Bank payment: {}", tx.description),
                reference: tx.reference.clone(),
                lines,
                source_type: EntrySource::BankPayment,
                source_id: Some(tx.id),
                document_id: None,
                auto_post: true,
            },
        )
        .await
    }

    /// Mark the accepted proposal ACCEPTED and every sibling EXPIRED.
    async fn resolve_proposals(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        tx_id: i32,
        accepted: Option<(MatchedEntityType, i32)>,
    ) -> CoreResult<()> {
        let proposals = bank_match_proposal::Entity::find()
            .filter(bank_match_proposal::Column::TenantId.eq(ctx.tenant_id))
            .filter(bank_match_proposal::Column::BankTransactionId.eq(tx_id))
            .filter(bank_match_proposal::Column::Status.eq(ProposalStatus::Suggested))
            .all(txn)
            .await?;

        for proposal in proposals {
            let is_accepted = accepted
                .map(|(entity_type, entity_id)| {
                    proposal.entity_type == entity_type && proposal.entity_id == entity_id
                })
                .unwrap_or(false);

            let mut active: bank_match_proposal::ActiveModel = proposal.into();
            active.status = Set(if is_accepted {
                ProposalStatus::Accepted
            } else {
                ProposalStatus::Expired
            });
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
        }

        Ok(())
    }

    async fn record_action(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        tx_id: i32,
        action: ReconciliationActionType,
        payload: serde_json::Value,
    ) -> CoreResult<()> {
        reconciliation_action::ActiveModel {
            tenant_id: Set(ctx.tenant_id),
            user_id: Set(ctx.user_id()),
            bank_transaction_id: Set(tx_id),
            action: Set(action),
            payload: Set(Some(payload)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(())
    }

    async fn get_transaction(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        tx_id: i32,
    ) -> CoreResult<bank_transaction::Model> {
        bank_transaction::Entity::find_by_id(tx_id)
            .filter(bank_transaction::Column::TenantId.eq(ctx.tenant_id))
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "bank_transaction",
                id: tx_id,
            })
    }

    async fn get_transaction_locked(
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        tx_id: i32,
    ) -> CoreResult<bank_transaction::Model> {
        bank_transaction::Entity::find_by_id(tx_id)
            .filter(bank_transaction::Column::TenantId.eq(ctx.tenant_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "bank_transaction",
                id: tx_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn hash_is_deterministic_and_64_hex() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let a = compute_import_hash(1, date, dec!(-45.00), "Microsoft 365", Some("MS-02"), None);
        let b = compute_import_hash(1, date, dec!(-45.00), "Microsoft 365", Some("MS-02"), None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_differs_per_field() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let base = compute_import_hash(1, date, dec!(-45.00), "Microsoft 365", None, None);

        assert_ne!(
            base,
            compute_import_hash(1, date, dec!(-45.01), "Microsoft 365", None, None)
        );
        assert_ne!(
            base,
            compute_import_hash(
                1,
                NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
                dec!(-45.00),
                "Microsoft 365",
                None,
                None
            )
        );
        assert_ne!(
            base,
            compute_import_hash(2, date, dec!(-45.00), "Microsoft 365", None, None)
        );
    }

    #[test]
    fn hash_normalizes_whitespace_and_missing_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let a = compute_import_hash(1, date, dec!(-45.00), "  Microsoft 365  ", None, None);
        let b = compute_import_hash(1, date, dec!(-45.00), "Microsoft 365", Some(""), Some(""));
        assert_eq!(a, b);
    }

    #[test]
    fn extracts_invoice_numbers_from_text() {
        assert!(extract_invoice_tokens("Factuur 12345 betaling").contains(&"12345".to_string()));
        assert!(extract_invoice_tokens("Invoice #67890").contains(&"67890".to_string()));
        assert!(
            extract_invoice_tokens("Inv-2024-0001 betaling").contains(&"2024-0001".to_string())
        );
        assert!(extract_invoice_tokens("INV-9999 payment").contains(&"9999".to_string()));
    }

    #[test]
    fn plain_references_do_not_match_the_invoice_rule() {
        // "REF-2024-045" lacks the factuur/invoice/inv prefix.
        assert!(extract_invoice_tokens("Project XYZ payment REF-2024-045").is_empty());
    }

    #[test]
    fn tolerance_matching_is_relative() {
        assert!(amount_within_tolerance(dec!(100.00), dec!(100.00), dec!(0.01)));
        assert!(amount_within_tolerance(dec!(100.00), dec!(99.00), dec!(0.01)));
        assert!(amount_within_tolerance(dec!(100.00), dec!(101.00), dec!(0.01)));
        assert!(!amount_within_tolerance(dec!(100.00), dec!(98.50), dec!(0.01)));
        assert!(!amount_within_tolerance(dec!(0.00), dec!(1.00), dec!(0.01)));
    }

}
