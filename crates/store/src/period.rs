//! Calendar-month consumption of a budget.
use api_types::{budget::Budget, transaction::Transaction};
use chrono::{Datelike, NaiveDate};

use crate::schedule::{month_end, month_start};

pub trait DatedAmount {
    fn category_id(&self) -> i64;
    fn occurred_at(&self) -> NaiveDate;
    /// Signed amount: positive = income, negative = expense.
    fn amount_minor(&self) -> i64;
}

impl DatedAmount for Transaction {
    fn category_id(&self) -> i64 {
        self.category_id
    }

    fn occurred_at(&self) -> NaiveDate {
        self.occurred_at
    }

    fn amount_minor(&self) -> i64 {
        self.amount_minor
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Amount spent in `category_id` from the first of `reference_date`'s month
/// up to and including `reference_date`, as a positive number.
///
/// Entries dated later in the same month are not spent yet and are skipped.
pub fn currently_spent<I: DatedAmount>(
    category_id: i64,
    items: &[I],
    reference_date: NaiveDate,
) -> i64 {
    items
        .iter()
        .filter(|item| item.category_id() == category_id)
        .filter(|item| item.amount_minor() < 0)
        .filter(|item| {
            let at = item.occurred_at();
            same_month(at, reference_date) && at <= reference_date
        })
        .map(DatedAmount::amount_minor)
        .fold(0, i64::saturating_add)
        .saturating_abs()
}

/// A budget limit evaluated for the month containing `reference_date`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetPeriod {
    pub category_id: i64,
    pub limit_minor: i64,
    pub reference_date: NaiveDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetProgress {
    pub limit_minor: i64,
    pub spent_minor: i64,
    /// Negative once the budget is exceeded.
    pub remaining_minor: i64,
    pub over_budget: bool,
}

impl BudgetPeriod {
    pub fn new(category_id: i64, limit_minor: i64, reference_date: NaiveDate) -> Self {
        Self {
            category_id,
            limit_minor,
            reference_date,
        }
    }

    pub fn for_budget(budget: &Budget, reference_date: NaiveDate) -> Self {
        Self::new(budget.category_id, budget.limit_minor, reference_date)
    }

    /// First and last day of the reference month.
    pub fn month_bounds(&self) -> (NaiveDate, NaiveDate) {
        let first = month_start(self.reference_date);
        (first, month_end(first))
    }

    pub fn progress<I: DatedAmount>(&self, items: &[I]) -> BudgetProgress {
        let spent_minor = currently_spent(self.category_id, items, self.reference_date);
        BudgetProgress {
            limit_minor: self.limit_minor,
            spent_minor,
            remaining_minor: self.limit_minor.saturating_sub(spent_minor),
            over_budget: spent_minor > self.limit_minor,
        }
    }
}

/// Progress of every budget for the month of `reference_date`, keyed by budget id.
pub fn budget_overview<I: DatedAmount>(
    budgets: &[Budget],
    items: &[I],
    reference_date: NaiveDate,
) -> Vec<(i64, BudgetProgress)> {
    budgets
        .iter()
        .map(|budget| {
            let period = BudgetPeriod::for_budget(budget, reference_date);
            (budget.id, period.progress(items))
        })
        .collect()
}
