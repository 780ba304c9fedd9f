//! VAT Posting Engine
//!
//! Builds balanced journal line sets for sales, purchases, reverse-charge
//! purchases and ICP supplies. The ledger persists the lines; this module
//! only computes them, so the split rules stay testable in isolation.

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::context::RequestContext;
use crate::entities::{account, journal_entry, journal_line, vat_code};
use crate::entities::{AccountType, ControlType, EntryStatus, PartyType, VatCategory};
use crate::error::{CoreError, CoreResult};
use crate::money;
use crate::services::ledger::LineInput;

pub struct VatPostingService;

/// The line set for one business event, plus its VAT effect.
#[derive(Debug, Clone)]
pub struct VatPostingResult {
    pub lines: Vec<LineInput>,
    pub total_vat_payable: Decimal,
    pub total_vat_receivable: Decimal,
    pub net_vat: Decimal,
    pub is_reverse_charge: bool,
    pub is_icp: bool,
}

impl VatPostingResult {
    pub fn is_balanced(&self) -> bool {
        let debit: Decimal = self.lines.iter().map(|l| l.debit_amount).sum();
        let credit: Decimal = self.lines.iter().map(|l| l.credit_amount).sum();
        debit == credit
    }
}

/// Account ids a sales posting writes to.
#[derive(Debug, Clone, Copy)]
pub struct SalesAccounts {
    pub receivable: i32,
    pub revenue: i32,
    pub vat_payable: i32,
}

/// Account ids a purchase posting writes to.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseAccounts {
    pub expense: i32,
    pub payable: i32,
    pub vat_receivable: i32,
    pub vat_payable: i32,
}

impl VatPostingService {
    pub async fn get_vat_code<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        vat_code_id: i32,
    ) -> CoreResult<vat_code::Model> {
        vat_code::Entity::find_by_id(vat_code_id)
            .filter(vat_code::Column::TenantId.eq(ctx.tenant_id))
            .one(conn)
            .await?
            .ok_or(CoreError::VatCodeUnknown {
                code: vat_code_id.to_string(),
            })
    }

    pub async fn get_vat_code_by_code<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        code: &str,
    ) -> CoreResult<vat_code::Model> {
        vat_code::Entity::find()
            .filter(vat_code::Column::TenantId.eq(ctx.tenant_id))
            .filter(vat_code::Column::Code.eq(code))
            .one(conn)
            .await?
            .ok_or(CoreError::VatCodeUnknown {
                code: code.to_string(),
            })
    }

    /// Sales with VAT extracted from the gross amount:
    /// Dr Receivable gross / Cr Revenue base / Cr VAT payable vat.
    pub fn sales_lines(
        accounts: SalesAccounts,
        gross_amount: Decimal,
        code: &vat_code::Model,
        description: &str,
        party_id: Option<i32>,
        party_vat_number: Option<String>,
        vat_country: &str,
    ) -> VatPostingResult {
        let (_, mut vat) = money::split_gross(gross_amount, code.rate);

        // ICP and zero-rated supplies carry no VAT regardless of rate.
        let is_icp = code.is_icp;
        if is_icp || code.category == VatCategory::Zero {
            vat = Decimal::ZERO;
        }
        let base = gross_amount - vat;

        let mut lines = vec![
            LineInput {
                account_id: accounts.receivable,
                description: Some(format!("Receivable: {}", description)),
                debit_amount: gross_amount,
                party_type: Some(PartyType::Customer),
                party_id,
                party_vat_number: party_vat_number.clone(),
                vat_country: Some(vat_country.to_string()),
                ..Default::default()
            },
            LineInput {
                account_id: accounts.revenue,
                description: Some(format!("Revenue: {}", description)),
                credit_amount: base,
                vat_code_id: Some(code.id),
                vat_base_amount: Some(base),
                vat_country: Some(vat_country.to_string()),
                party_vat_number,
                ..Default::default()
            },
        ];

        if vat > Decimal::ZERO {
            lines.push(LineInput {
                account_id: accounts.vat_payable,
                description: Some(format!("VAT payable: {}", description)),
                credit_amount: vat,
                vat_code_id: Some(code.id),
                vat_amount: Some(vat),
                vat_base_amount: Some(base),
                vat_country: Some(vat_country.to_string()),
                ..Default::default()
            });
        }

        VatPostingResult {
            lines,
            total_vat_payable: vat,
            total_vat_receivable: Decimal::ZERO,
            net_vat: vat,
            is_reverse_charge: false,
            is_icp,
        }
    }

    /// Purchase with VAT extracted from the gross amount:
    /// Dr Expense base / Dr VAT receivable vat / Cr Payable gross.
    /// A reverse-charge code routes to [`Self::reverse_charge_lines`] with
    /// the gross as net (the supplier invoiced no VAT).
    pub fn purchase_lines(
        accounts: PurchaseAccounts,
        gross_amount: Decimal,
        code: &vat_code::Model,
        description: &str,
        party_id: Option<i32>,
        party_vat_number: Option<String>,
        vat_country: &str,
    ) -> VatPostingResult {
        if code.is_reverse_charge {
            return Self::reverse_charge_lines(
                accounts,
                gross_amount,
                code,
                description,
                party_id,
                party_vat_number,
                vat_country,
            );
        }

        let (base, vat) = money::split_gross(gross_amount, code.rate);

        let mut lines = vec![LineInput {
            account_id: accounts.expense,
            description: Some(format!("Expense: {}", description)),
            debit_amount: base,
            vat_code_id: Some(code.id),
            vat_base_amount: Some(base),
            vat_country: Some(vat_country.to_string()),
            ..Default::default()
        }];

        if vat > Decimal::ZERO {
            lines.push(LineInput {
                account_id: accounts.vat_receivable,
                description: Some(format!("VAT receivable: {}", description)),
                debit_amount: vat,
                vat_code_id: Some(code.id),
                vat_amount: Some(vat),
                vat_base_amount: Some(base),
                vat_country: Some(vat_country.to_string()),
                ..Default::default()
            });
        }

        lines.push(LineInput {
            account_id: accounts.payable,
            description: Some(format!("Payable: {}", description)),
            credit_amount: gross_amount,
            party_type: Some(PartyType::Supplier),
            party_id,
            party_vat_number,
            vat_country: Some(vat_country.to_string()),
            ..Default::default()
        });

        VatPostingResult {
            lines,
            total_vat_payable: Decimal::ZERO,
            total_vat_receivable: vat,
            net_vat: -vat,
            is_reverse_charge: false,
            is_icp: false,
        }
    }

    /// Reverse charge: the buyer accounts for VAT that the EU supplier did
    /// not invoice. Four lines, VAT net-zero but reported on both sides.
    pub fn reverse_charge_lines(
        accounts: PurchaseAccounts,
        base_amount: Decimal,
        code: &vat_code::Model,
        description: &str,
        party_id: Option<i32>,
        party_vat_number: Option<String>,
        supplier_country: &str,
    ) -> VatPostingResult {
        let vat = money::vat_from_base(base_amount, code.rate);

        let lines = vec![
            LineInput {
                account_id: accounts.expense,
                description: Some(format!("Expense: {}", description)),
                debit_amount: base_amount,
                vat_code_id: Some(code.id),
                vat_base_amount: Some(base_amount),
                vat_country: Some(supplier_country.to_string()),
                vat_is_reverse_charge: true,
                ..Default::default()
            },
            LineInput {
                account_id: accounts.payable,
                description: Some(format!("Payable: {}", description)),
                credit_amount: base_amount,
                party_type: Some(PartyType::Supplier),
                party_id,
                party_vat_number,
                vat_country: Some(supplier_country.to_string()),
                ..Default::default()
            },
            LineInput {
                account_id: accounts.vat_receivable,
                description: Some(format!("RC VAT receivable: {}", description)),
                debit_amount: vat,
                vat_code_id: Some(code.id),
                vat_amount: Some(vat),
                vat_base_amount: Some(base_amount),
                vat_country: Some(supplier_country.to_string()),
                vat_is_reverse_charge: true,
                ..Default::default()
            },
            LineInput {
                account_id: accounts.vat_payable,
                description: Some(format!("RC VAT payable: {}", description)),
                credit_amount: vat,
                vat_code_id: Some(code.id),
                vat_amount: Some(vat),
                vat_base_amount: Some(base_amount),
                vat_country: Some(supplier_country.to_string()),
                vat_is_reverse_charge: true,
                ..Default::default()
            },
        ];

        VatPostingResult {
            lines,
            total_vat_payable: vat,
            total_vat_receivable: vat,
            net_vat: Decimal::ZERO,
            is_reverse_charge: true,
            is_icp: false,
        }
    }

    /// ICP supply: 0% outbound to an EU customer, reported separately.
    /// Requires the customer's VAT number; lines carry it so reports can
    /// aggregate ICP totals per customer.
    pub fn icp_supply_lines(
        receivable_account: i32,
        revenue_account: i32,
        net_amount: Decimal,
        code: &vat_code::Model,
        description: &str,
        party_id: i32,
        party_vat_number: &str,
        customer_country: &str,
    ) -> CoreResult<VatPostingResult> {
        if party_vat_number.trim().is_empty() {
            return Err(CoreError::EntryState {
                detail: "ICP supplies require the customer VAT number".to_string(),
            });
        }
        if !code.is_icp {
            return Err(CoreError::VatCodeUnknown {
                code: format!("{} is not an ICP code", code.code),
            });
        }

        let lines = vec![
            LineInput {
                account_id: receivable_account,
                description: Some(format!("ICP receivable: {}", description)),
                debit_amount: net_amount,
                party_type: Some(PartyType::Customer),
                party_id: Some(party_id),
                party_vat_number: Some(party_vat_number.to_string()),
                vat_country: Some(customer_country.to_string()),
                ..Default::default()
            },
            LineInput {
                account_id: revenue_account,
                description: Some(format!("ICP revenue: {}", description)),
                credit_amount: net_amount,
                vat_code_id: Some(code.id),
                vat_base_amount: Some(net_amount),
                vat_country: Some(customer_country.to_string()),
                party_vat_number: Some(party_vat_number.to_string()),
                ..Default::default()
            },
        ];

        Ok(VatPostingResult {
            lines,
            total_vat_payable: Decimal::ZERO,
            total_vat_receivable: Decimal::ZERO,
            net_vat: Decimal::ZERO,
            is_reverse_charge: false,
            is_icp: true,
        })
    }

    /// Used by the consistency engine on posted data.
    pub fn validate_vat_reconciliation(
        base: Decimal,
        vat: Decimal,
        rate: Decimal,
        tolerance: Decimal,
    ) -> Result<(), String> {
        if money::reconciles(base, vat, rate, tolerance) {
            Ok(())
        } else {
            Err(format!(
                "VAT {} does not match expected {} for base {} at {}%",
                vat,
                money::vat_from_base(base, rate),
                base,
                rate
            ))
        }
    }

    /// VAT position of the tenant over a period, sourced from the VAT
    /// control accounts and the per-code totals on posted lines.
    pub async fn vat_summary<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> CoreResult<VatSummary> {
        let vat_accounts = account::Entity::find()
            .filter(account::Column::TenantId.eq(ctx.tenant_id))
            .filter(account::Column::IsControl.eq(true))
            .filter(account::Column::ControlType.eq(ControlType::Vat))
            .all(conn)
            .await?;

        let mut vat_payable = Decimal::ZERO;
        let mut vat_receivable = Decimal::ZERO;

        for vat_account in &vat_accounts {
            let lines = journal_line::Entity::find()
                .left_join(journal_entry::Entity)
                .filter(journal_line::Column::AccountId.eq(vat_account.id))
                .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
                .filter(journal_entry::Column::Status.eq(EntryStatus::Posted))
                .filter(journal_entry::Column::EntryDate.lte(end))
                .all(conn)
                .await?;

            let debit: Decimal = lines.iter().map(|l| l.debit_amount).sum();
            let credit: Decimal = lines.iter().map(|l| l.credit_amount).sum();

            match vat_account.account_type {
                AccountType::Liability => vat_payable += credit - debit,
                AccountType::Asset => vat_receivable += debit - credit,
                _ => {}
            }
        }

        // Per-code turnover within the period window.
        let coded_lines = journal_line::Entity::find()
            .left_join(journal_entry::Entity)
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(journal_entry::Column::Status.eq(EntryStatus::Posted))
            .filter(journal_entry::Column::EntryDate.gte(start))
            .filter(journal_entry::Column::EntryDate.lte(end))
            .filter(journal_line::Column::VatCodeId.is_not_null())
            .all(conn)
            .await?;

        let codes = vat_code::Entity::find()
            .filter(vat_code::Column::TenantId.eq(ctx.tenant_id))
            .all(conn)
            .await?;

        let mut per_code: Vec<VatCodeTotal> = Vec::new();
        for code in &codes {
            let mut base = Decimal::ZERO;
            let mut vat = Decimal::ZERO;
            for line in coded_lines.iter().filter(|l| l.vat_code_id == Some(code.id)) {
                base += line.vat_base_amount.unwrap_or(Decimal::ZERO);
                vat += line.vat_amount.unwrap_or(Decimal::ZERO);
            }
            if !base.is_zero() || !vat.is_zero() {
                per_code.push(VatCodeTotal {
                    code: code.code.clone(),
                    rate: code.rate,
                    base,
                    vat,
                });
            }
        }

        Ok(VatSummary {
            period_start: start,
            period_end: end,
            vat_payable,
            vat_receivable,
            net_vat: vat_payable - vat_receivable,
            per_code,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VatCodeTotal {
    pub code: String,
    pub rate: Decimal,
    pub base: Decimal,
    pub vat: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct VatSummary {
    pub period_start: chrono::NaiveDate,
    pub period_end: chrono::NaiveDate,
    pub vat_payable: Decimal,
    pub vat_receivable: Decimal,
    pub net_vat: Decimal,
    pub per_code: Vec<VatCodeTotal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn code(rate: Decimal, category: VatCategory, reverse_charge: bool, icp: bool) -> vat_code::Model {
        vat_code::Model {
            id: 1,
            tenant_id: 1,
            code: "NL_H".to_string(),
            name: "BTW hoog".to_string(),
            rate,
            category,
            is_reverse_charge: reverse_charge,
            is_icp: icp,
            sales_account_id: None,
            purchase_account_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    const SALES: SalesAccounts = SalesAccounts {
        receivable: 10,
        revenue: 20,
        vat_payable: 30,
    };

    const PURCHASE: PurchaseAccounts = PurchaseAccounts {
        expense: 40,
        payable: 50,
        vat_receivable: 60,
        vat_payable: 30,
    };

    #[test]
    fn sale_with_standard_rate_splits_gross() {
        let code = code(dec!(21.00), VatCategory::Standard, false, false);
        let result =
            VatPostingService::sales_lines(SALES, dec!(121.00), &code, "Invoice 1", Some(5), None, "NL");

        assert!(result.is_balanced());
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.lines[0].debit_amount, dec!(121.00));
        assert_eq!(result.lines[1].credit_amount, dec!(100.00));
        assert_eq!(result.lines[2].credit_amount, dec!(21.00));
        assert_eq!(result.net_vat, dec!(21.00));
        assert_eq!(result.lines[0].party_id, Some(5));
    }

    #[test]
    fn zero_rated_sale_has_no_vat_line() {
        let code = code(dec!(0.00), VatCategory::Zero, false, false);
        let result =
            VatPostingService::sales_lines(SALES, dec!(500.00), &code, "Export", None, None, "NL");

        assert!(result.is_balanced());
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.net_vat, Decimal::ZERO);
    }

    #[test]
    fn purchase_with_standard_rate() {
        let code = code(dec!(21.00), VatCategory::Standard, false, false);
        let result = VatPostingService::purchase_lines(
            PURCHASE,
            dec!(121.00),
            &code,
            "Supplies",
            Some(9),
            None,
            "NL",
        );

        assert!(result.is_balanced());
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.lines[0].debit_amount, dec!(100.00));
        assert_eq!(result.lines[1].debit_amount, dec!(21.00));
        assert_eq!(result.lines[2].credit_amount, dec!(121.00));
        assert_eq!(result.net_vat, dec!(-21.00));
    }

    #[test]
    fn reverse_charge_purchase_nets_to_zero_vat() {
        let code = code(dec!(21.00), VatCategory::ReverseCharge, true, false);
        let result = VatPostingService::purchase_lines(
            PURCHASE,
            dec!(1000.00),
            &code,
            "EU supplier",
            Some(3),
            Some("DE123456789".to_string()),
            "DE",
        );

        assert!(result.is_reverse_charge);
        assert!(result.is_balanced());
        assert_eq!(result.lines.len(), 4);
        assert_eq!(result.lines[0].debit_amount, dec!(1000.00));
        assert_eq!(result.lines[1].credit_amount, dec!(1000.00));
        assert_eq!(result.lines[2].debit_amount, dec!(210.00));
        assert_eq!(result.lines[3].credit_amount, dec!(210.00));
        assert_eq!(result.net_vat, Decimal::ZERO);
        assert!(result.lines[2].vat_is_reverse_charge);
        assert_eq!(result.lines[2].vat_country.as_deref(), Some("DE"));
    }

    #[test]
    fn icp_supply_requires_vat_number() {
        let code = code(dec!(0.00), VatCategory::Icp, false, true);
        let err = VatPostingService::icp_supply_lines(
            10,
            20,
            dec!(800.00),
            &code,
            "ICP",
            4,
            "  ",
            "BE",
        )
        .unwrap_err();
        assert_eq!(err.kind(), "ENTRY_STATE");
    }

    #[test]
    fn icp_supply_emits_two_tagged_lines() {
        let code = code(dec!(0.00), VatCategory::Icp, false, true);
        let result = VatPostingService::icp_supply_lines(
            10,
            20,
            dec!(800.00),
            &code,
            "ICP sale",
            4,
            "BE0123456789",
            "BE",
        )
        .unwrap();

        assert!(result.is_icp);
        assert!(result.is_balanced());
        assert_eq!(result.lines.len(), 2);
        assert_eq!(
            result.lines[1].party_vat_number.as_deref(),
            Some("BE0123456789")
        );
        assert_eq!(result.net_vat, Decimal::ZERO);
    }

    #[test]
    fn vat_reconciliation_respects_tolerance() {
        assert!(VatPostingService::validate_vat_reconciliation(
            dec!(100.00),
            dec!(21.03),
            dec!(21.00),
            dec!(0.05)
        )
        .is_ok());
        assert!(VatPostingService::validate_vat_reconciliation(
            dec!(100.00),
            dec!(22.00),
            dec!(21.00),
            dec!(0.05)
        )
        .is_err());
    }
}
