//! Monthly summary printed after the stores are loaded.
use std::io::{self, Write};

use api_types::Identified;
use chrono::NaiveDate;
use store::{
    DashboardBackend, EntityKind, EntityStore, StoreError, StoreRegistry,
    period::{BudgetProgress, budget_overview},
    schedule::{self, Direction},
};

const NEXT_PAYMENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPayment {
    pub date: NaiveDate,
    pub label: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetLine {
    pub label: String,
    pub progress: BudgetProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLine {
    pub kind: EntityKind,
    pub count: Option<usize>,
    pub error: Option<StoreError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub today: NaiveDate,
    pub upcoming_income: i64,
    pub upcoming_expenses: i64,
    pub monthly_income: i64,
    pub monthly_expenses: i64,
    pub next_payments: Vec<NextPayment>,
    pub budgets: Vec<BudgetLine>,
    pub stores: Vec<StoreLine>,
}

async fn store_line<T, B>(store: &EntityStore<T, B>) -> StoreLine
where
    T: Identified + Clone + Send + Sync,
{
    let snapshot = store.snapshot().await;
    StoreLine {
        kind: store.kind(),
        count: snapshot.data.as_ref().map(Vec::len),
        error: snapshot.error,
    }
}

pub async fn collect<B: DashboardBackend>(registry: &StoreRegistry<B>, today: NaiveDate) -> Summary {
    let subscriptions = registry.subscriptions.data().await.unwrap_or_default();
    let transactions = registry.transactions.data().await.unwrap_or_default();
    let budgets = registry.budgets.data().await.unwrap_or_default();

    let next_payments = schedule::upcoming_occurrences(&subscriptions, today)
        .into_iter()
        .take(NEXT_PAYMENTS)
        .map(|(date, sub)| NextPayment {
            date,
            label: sub.label.clone(),
            amount_minor: sub.amount_minor,
        })
        .collect();

    let budget_lines = budget_overview(&budgets, &transactions, today)
        .into_iter()
        .zip(&budgets)
        .map(|((_, progress), budget)| BudgetLine {
            label: budget.label.clone(),
            progress,
        })
        .collect();

    let stores = vec![
        store_line(&registry.categories).await,
        store_line(&registry.payment_methods).await,
        store_line(&registry.subscriptions).await,
        store_line(&registry.transactions).await,
        store_line(&registry.stock_positions).await,
        store_line(&registry.watchlists).await,
        store_line(&registry.budgets).await,
    ];

    Summary {
        today,
        upcoming_income: schedule::upcoming_income(&subscriptions, today),
        upcoming_expenses: schedule::upcoming_expenses(&subscriptions, today),
        monthly_income: schedule::monthly_total(Direction::Income, &subscriptions),
        monthly_expenses: schedule::monthly_total(Direction::Expenses, &subscriptions),
        next_payments,
        budgets: budget_lines,
        stores,
    }
}

/// Formats minor units as `1234.56`, keeping the sign.
pub fn format_minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

pub fn render(summary: &Summary, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Dashboard for {}", summary.today)?;
    let loaded: Vec<String> = summary
        .stores
        .iter()
        .filter_map(|line| line.count.map(|count| format!("{} {count}", line.kind)))
        .collect();
    writeln!(out, "Loaded: {}", loaded.join(", "))?;
    writeln!(out)?;
    writeln!(out, "Subscriptions")?;
    writeln!(
        out,
        "  still due this month: +{} / -{}",
        format_minor(summary.upcoming_income),
        format_minor(summary.upcoming_expenses)
    )?;
    writeln!(
        out,
        "  monthly total:        +{} / -{}",
        format_minor(summary.monthly_income),
        format_minor(summary.monthly_expenses)
    )?;
    for payment in &summary.next_payments {
        writeln!(
            out,
            "  {}  {:<24} {:>12}",
            payment.date,
            payment.label,
            format_minor(payment.amount_minor)
        )?;
    }

    if !summary.budgets.is_empty() {
        writeln!(out)?;
        writeln!(out, "Budgets")?;
        for line in &summary.budgets {
            let marker = if line.progress.over_budget { " !" } else { "" };
            writeln!(
                out,
                "  {:<24} {:>12} of {:>12} spent, {} left{marker}",
                line.label,
                format_minor(line.progress.spent_minor),
                format_minor(line.progress.limit_minor),
                format_minor(line.progress.remaining_minor)
            )?;
        }
    }

    let failed: Vec<&StoreLine> = summary.stores.iter().filter(|s| s.error.is_some()).collect();
    if !failed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Not refreshed")?;
        for line in failed {
            if let Some(err) = &line.error {
                writeln!(out, "  {}: {err}", line.kind)?;
            }
        }
    }
    Ok(())
}
