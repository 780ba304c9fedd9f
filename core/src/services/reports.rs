//! Reports
//!
//! Pure aggregations over the ledger and the subledger: trial balance,
//! balance sheet, profit & loss and AR/AP aging. The balance-sheet and P&L
//! groupings follow the Dutch decimal chart conventions (RGS-style code
//! prefixes).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::context::RequestContext;
use crate::entities::{account, journal_entry, journal_line, open_item, party};
use crate::entities::{AccountType, EntryStatus, OpenItemStatus, OpenItemType};
use crate::error::CoreResult;

pub struct ReportService;

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalanceRow {
    pub account_id: i32,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub debit_total: Decimal,
    pub credit_total: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheetSection {
    pub name: String,
    pub accounts: Vec<AccountBalanceRow>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub fixed_assets: BalanceSheetSection,
    pub current_assets: BalanceSheetSection,
    pub current_liabilities: BalanceSheetSection,
    pub long_term_liabilities: BalanceSheetSection,
    pub equity: BalanceSheetSection,
    pub total_assets: Decimal,
    pub total_liabilities_equity: Decimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PnlSection {
    pub name: String,
    pub accounts: Vec<AccountBalanceRow>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitAndLoss {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenue: PnlSection,
    pub cost_of_goods_sold: PnlSection,
    pub operating_expenses: PnlSection,
    pub other_income: PnlSection,
    pub other_expenses: PnlSection,
    pub gross_profit: Decimal,
    pub operating_income: Decimal,
    pub net_income: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgingItem {
    pub party_id: i32,
    pub party_name: String,
    pub document_number: Option<String>,
    pub document_date: NaiveDate,
    pub due_date: NaiveDate,
    pub original_amount: Decimal,
    pub paid_amount: Decimal,
    pub open_amount: Decimal,
    pub days_overdue: i64,
    pub status: OpenItemStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgingReport {
    pub report_type: OpenItemType,
    pub as_of_date: NaiveDate,
    pub items: Vec<AgingItem>,
    pub total_original: Decimal,
    pub total_paid: Decimal,
    pub total_open: Decimal,
    pub overdue_amount: Decimal,
}

/// Balance sheet bucket for an account, per Dutch code-prefix conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceBucket {
    FixedAssets,
    CurrentAssets,
    CurrentLiabilities,
    LongTermLiabilities,
    Equity,
    None,
}

pub fn balance_bucket(account_type: AccountType, code: &str) -> BalanceBucket {
    match account_type {
        AccountType::Asset => {
            if code.starts_with('0') {
                BalanceBucket::FixedAssets
            } else {
                BalanceBucket::CurrentAssets
            }
        }
        AccountType::Liability => {
            if code.starts_with("06") || code.starts_with("07") || code.starts_with("08") {
                BalanceBucket::LongTermLiabilities
            } else {
                BalanceBucket::CurrentLiabilities
            }
        }
        AccountType::Equity => BalanceBucket::Equity,
        _ => BalanceBucket::None,
    }
}

/// P&L bucket for an expense account; revenue accounts form their own
/// section regardless of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnlBucket {
    CostOfGoodsSold,
    OperatingExpenses,
    OtherExpenses,
}

pub fn pnl_bucket(code: &str) -> PnlBucket {
    if code.starts_with("40") || code.starts_with("41") {
        PnlBucket::CostOfGoodsSold
    } else if code.starts_with("48") || code.starts_with("49") {
        PnlBucket::OtherExpenses
    } else {
        PnlBucket::OperatingExpenses
    }
}

const BALANCE_TOLERANCE: Decimal = dec!(0.01);

impl ReportService {
    /// Per-account (debit, credit, balance) over POSTED entries up to a
    /// date. Accounts without activity are omitted.
    pub async fn trial_balance<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        as_of: NaiveDate,
    ) -> CoreResult<Vec<AccountBalanceRow>> {
        Self::account_balances(conn, ctx, None, Some(as_of), None).await
    }

    pub async fn balance_sheet<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        as_of: NaiveDate,
    ) -> CoreResult<BalanceSheet> {
        let balances = Self::account_balances(conn, ctx, None, Some(as_of), None).await?;

        let mut fixed_assets = Vec::new();
        let mut current_assets = Vec::new();
        let mut current_liabilities = Vec::new();
        let mut long_term_liabilities = Vec::new();
        let mut equity = Vec::new();

        for row in balances {
            match balance_bucket(row.account_type, &row.account_code) {
                BalanceBucket::FixedAssets => fixed_assets.push(row),
                BalanceBucket::CurrentAssets => current_assets.push(row),
                BalanceBucket::CurrentLiabilities => current_liabilities.push(row),
                BalanceBucket::LongTermLiabilities => long_term_liabilities.push(row),
                BalanceBucket::Equity => equity.push(row),
                BalanceBucket::None => {}
            }
        }

        let section = |name: &str, accounts: Vec<AccountBalanceRow>| {
            let total = accounts.iter().map(|a| a.balance).sum();
            BalanceSheetSection {
                name: name.to_string(),
                accounts,
                total,
            }
        };

        let fixed_assets = section("Vaste activa", fixed_assets);
        let current_assets = section("Vlottende activa", current_assets);
        let current_liabilities = section("Kortlopende schulden", current_liabilities);
        let long_term_liabilities = section("Langlopende schulden", long_term_liabilities);
        let equity = section("Eigen vermogen", equity);

        let total_assets = fixed_assets.total + current_assets.total;
        let total_liabilities_equity =
            current_liabilities.total + long_term_liabilities.total + equity.total;

        Ok(BalanceSheet {
            as_of_date: as_of,
            is_balanced: (total_assets - total_liabilities_equity).abs() <= BALANCE_TOLERANCE,
            fixed_assets,
            current_assets,
            current_liabilities,
            long_term_liabilities,
            equity,
            total_assets,
            total_liabilities_equity,
        })
    }

    pub async fn profit_and_loss<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<ProfitAndLoss> {
        let activity = Self::account_balances(
            conn,
            ctx,
            Some(start),
            Some(end),
            Some(vec![AccountType::Revenue, AccountType::Expense]),
        )
        .await?;

        let mut revenue = Vec::new();
        let mut cogs = Vec::new();
        let mut operating = Vec::new();
        let mut other_expenses = Vec::new();

        for row in activity {
            match row.account_type {
                AccountType::Revenue => revenue.push(row),
                AccountType::Expense => match pnl_bucket(&row.account_code) {
                    PnlBucket::CostOfGoodsSold => cogs.push(row),
                    PnlBucket::OperatingExpenses => operating.push(row),
                    PnlBucket::OtherExpenses => other_expenses.push(row),
                },
                _ => {}
            }
        }

        let section = |name: &str, accounts: Vec<AccountBalanceRow>| {
            let total = accounts.iter().map(|a| a.balance).sum::<Decimal>();
            PnlSection {
                name: name.to_string(),
                accounts,
                total,
            }
        };

        let revenue = section("Omzet", revenue);
        let cogs = section("Kostprijs omzet", cogs);
        let operating = section("Bedrijfskosten", operating);
        let other_income = section("Overige baten", Vec::new());
        let other_expenses = section("Overige lasten", other_expenses);

        // Fixed derivation order: gross, operating, net.
        let gross_profit = revenue.total - cogs.total;
        let operating_income = gross_profit - operating.total;
        let net_income = operating_income + other_income.total - other_expenses.total;

        Ok(ProfitAndLoss {
            start_date: start,
            end_date: end,
            revenue,
            cost_of_goods_sold: cogs,
            operating_expenses: operating,
            other_income,
            other_expenses,
            gross_profit,
            operating_income,
            net_income,
        })
    }

    pub async fn ar_aging<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        as_of: NaiveDate,
    ) -> CoreResult<AgingReport> {
        Self::aging(conn, ctx, OpenItemType::Receivable, as_of).await
    }

    pub async fn ap_aging<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        as_of: NaiveDate,
    ) -> CoreResult<AgingReport> {
        Self::aging(conn, ctx, OpenItemType::Payable, as_of).await
    }

    async fn aging<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        item_type: OpenItemType,
        as_of: NaiveDate,
    ) -> CoreResult<AgingReport> {
        let items = open_item::Entity::find()
            .filter(open_item::Column::TenantId.eq(ctx.tenant_id))
            .filter(open_item::Column::ItemType.eq(item_type))
            .filter(
                open_item::Column::Status.is_in([OpenItemStatus::Open, OpenItemStatus::Partial]),
            )
            .order_by_asc(open_item::Column::DueDate)
            .all(conn)
            .await?;

        let mut rows = Vec::with_capacity(items.len());
        let mut total_original = Decimal::ZERO;
        let mut total_paid = Decimal::ZERO;
        let mut total_open = Decimal::ZERO;
        let mut overdue_amount = Decimal::ZERO;

        for item in items {
            let party_name = party::Entity::find_by_id(item.party_id)
                .one(conn)
                .await?
                .map(|p| p.name)
                .unwrap_or_default();

            let days_overdue = (as_of - item.due_date).num_days().max(0);

            total_original += item.original_amount;
            total_paid += item.paid_amount;
            total_open += item.open_amount;
            if days_overdue > 0 {
                overdue_amount += item.open_amount;
            }

            rows.push(AgingItem {
                party_id: item.party_id,
                party_name,
                document_number: item.document_number,
                document_date: item.document_date,
                due_date: item.due_date,
                original_amount: item.original_amount,
                paid_amount: item.paid_amount,
                open_amount: item.open_amount,
                days_overdue,
                status: item.status,
            });
        }

        Ok(AgingReport {
            report_type: item_type,
            as_of_date: as_of,
            items: rows,
            total_original,
            total_paid,
            total_open,
            overdue_amount,
        })
    }

    async fn account_balances<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        types: Option<Vec<AccountType>>,
    ) -> CoreResult<Vec<AccountBalanceRow>> {
        let mut accounts_query = account::Entity::find()
            .filter(account::Column::TenantId.eq(ctx.tenant_id))
            .filter(account::Column::IsActive.eq(true))
            .order_by_asc(account::Column::Code);
        if let Some(types) = types {
            accounts_query = accounts_query.filter(account::Column::AccountType.is_in(types));
        }
        let accounts = accounts_query.all(conn).await?;

        let mut rows = Vec::new();
        for acct in accounts {
            let mut query = journal_line::Entity::find()
                .left_join(journal_entry::Entity)
                .filter(journal_line::Column::AccountId.eq(acct.id))
                .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
                .filter(journal_entry::Column::Status.eq(EntryStatus::Posted));
            if let Some(from) = from {
                query = query.filter(journal_entry::Column::EntryDate.gte(from));
            }
            if let Some(to) = to {
                query = query.filter(journal_entry::Column::EntryDate.lte(to));
            }

            let mut debit_total = Decimal::ZERO;
            let mut credit_total = Decimal::ZERO;
            for line in query.all(conn).await? {
                debit_total += line.debit_amount;
                credit_total += line.credit_amount;
            }

            if debit_total.is_zero() && credit_total.is_zero() {
                continue;
            }

            let balance = if acct.account_type.is_debit_normal() {
                debit_total - credit_total
            } else {
                credit_total - debit_total
            };

            rows.push(AccountBalanceRow {
                account_id: acct.id,
                account_code: acct.code,
                account_name: acct.name,
                account_type: acct.account_type,
                debit_total,
                credit_total,
                balance,
            });
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assets_split_on_leading_zero() {
        assert_eq!(
            balance_bucket(AccountType::Asset, "0210"),
            BalanceBucket::FixedAssets
        );
        assert_eq!(
            balance_bucket(AccountType::Asset, "1300"),
            BalanceBucket::CurrentAssets
        );
        assert_eq!(
            balance_bucket(AccountType::Asset, "1010"),
            BalanceBucket::CurrentAssets
        );
    }

    #[test]
    fn liabilities_split_on_long_term_prefixes() {
        assert_eq!(
            balance_bucket(AccountType::Liability, "0690"),
            BalanceBucket::LongTermLiabilities
        );
        assert_eq!(
            balance_bucket(AccountType::Liability, "0800"),
            BalanceBucket::LongTermLiabilities
        );
        assert_eq!(
            balance_bucket(AccountType::Liability, "1600"),
            BalanceBucket::CurrentLiabilities
        );
        assert_eq!(
            balance_bucket(AccountType::Liability, "1500"),
            BalanceBucket::CurrentLiabilities
        );
    }

    #[test]
    fn revenue_and_expense_do_not_reach_the_balance_sheet() {
        assert_eq!(balance_bucket(AccountType::Revenue, "8000"), BalanceBucket::None);
        assert_eq!(balance_bucket(AccountType::Expense, "4300"), BalanceBucket::None);
    }

    #[test]
    fn expense_codes_bucket_into_pnl_sections() {
        assert_eq!(pnl_bucket("4000"), PnlBucket::CostOfGoodsSold);
        assert_eq!(pnl_bucket("4100"), PnlBucket::CostOfGoodsSold);
        assert_eq!(pnl_bucket("4300"), PnlBucket::OperatingExpenses);
        assert_eq!(pnl_bucket("4700"), PnlBucket::OperatingExpenses);
        assert_eq!(pnl_bucket("4800"), PnlBucket::OtherExpenses);
        assert_eq!(pnl_bucket("4950"), PnlBucket::OtherExpenses);
    }
}
