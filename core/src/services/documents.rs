//! Document posting
//!
//! Entry point for the document pipeline: takes the extracted document
//! shape, runs it through the VAT engine and posts the resulting entry.
//! The pipeline itself (upload, OCR, matching review) is a collaborator.

use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::context::RequestContext;
use crate::entities::{journal_entry, EntrySource};
use crate::error::{CoreError, CoreResult};
use crate::interfaces::DocumentData;
use crate::services::ledger::{CreateEntryInput, LedgerService};
use crate::services::subledger::SubledgerService;
use crate::services::vat_posting::{PurchaseAccounts, SalesAccounts, VatPostingService};

pub struct DocumentPostingService;

impl DocumentPostingService {
    /// Post a purchase invoice: the document's gross total is split per the
    /// VAT code and booked against the supplier's payable. A reverse-charge
    /// code produces the four-line net-zero form automatically.
    pub async fn post_purchase_invoice(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        document: &DocumentData,
        accounts: PurchaseAccounts,
        vat_code_id: i32,
        supplier_country: &str,
    ) -> CoreResult<journal_entry::Model> {
        let party_id = document.matched_party_id.ok_or(CoreError::MissingParty {
            account_code: "payable".to_string(),
        })?;

        let txn = db.begin().await?;

        let code = VatPostingService::get_vat_code(&txn, ctx, vat_code_id).await?;
        let posting = VatPostingService::purchase_lines(
            accounts,
            document.total_amount,
            &code,
            &format!("{} {}", document.supplier_name, document.invoice_number),
            Some(party_id),
            None,
            supplier_country,
        );

        let entry = LedgerService::create_entry_in_txn(
            &txn,
            ctx,
            CreateEntryInput {
                entry_date: document.invoice_date,
                description: format!(
                    "Purchase invoice {} from {}",
                    document.invoice_number, document.supplier_name
                ),
                reference: Some(document.invoice_number.clone()),
                lines: posting.lines,
                source_type: EntrySource::Document,
                source_id: document.document_id,
                document_id: document.document_id,
                auto_post: true,
            },
        )
        .await?;

        // A document pre-matched to an open item settles it right away.
        if let Some(open_item_id) = document.matched_open_item_id {
            SubledgerService::allocate_in_txn(
                &txn,
                ctx,
                entry.id,
                open_item_id,
                document.total_amount,
                document.invoice_date,
            )
            .await?;
        }

        txn.commit().await?;
        Ok(entry)
    }

    /// Post a sales invoice from the gross amount; ICP codes route through
    /// the ICP supply form and require the customer VAT number.
    #[allow(clippy::too_many_arguments)]
    pub async fn post_sales_invoice(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        document: &DocumentData,
        accounts: SalesAccounts,
        vat_code_id: i32,
        customer_country: &str,
        customer_vat_number: Option<&str>,
    ) -> CoreResult<journal_entry::Model> {
        let party_id = document.matched_party_id.ok_or(CoreError::MissingParty {
            account_code: "receivable".to_string(),
        })?;

        let txn = db.begin().await?;

        let code = VatPostingService::get_vat_code(&txn, ctx, vat_code_id).await?;
        if code.is_reverse_charge {
            return Err(CoreError::EntryState {
                detail: format!("VAT code {} is purchase-side reverse charge", code.code),
            });
        }
        let posting = if code.is_icp {
            VatPostingService::icp_supply_lines(
                accounts.receivable,
                accounts.revenue,
                document.total_amount,
                &code,
                &document.invoice_number,
                party_id,
                customer_vat_number.unwrap_or_default(),
                customer_country,
            )?
        } else {
            VatPostingService::sales_lines(
                accounts,
                document.total_amount,
                &code,
                &document.invoice_number,
                Some(party_id),
                customer_vat_number.map(|v| v.to_string()),
                customer_country,
            )
        };

        let entry = LedgerService::create_entry_in_txn(
            &txn,
            ctx,
            CreateEntryInput {
                entry_date: document.invoice_date,
                description: format!("Sales invoice {}", document.invoice_number),
                reference: Some(document.invoice_number.clone()),
                lines: posting.lines,
                source_type: EntrySource::Document,
                source_id: document.document_id,
                document_id: document.document_id,
                auto_post: true,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(entry)
    }
}
