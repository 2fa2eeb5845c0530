//! Monthly recurring items: next execution dates, ordering and due sums.
//!
//! A recurring item executes every month on its `day_of_month`. Months
//! shorter than that day execute on their last day (day 31 runs on April 30th
//! and on February 28th/29th). An item is "due" this month while its
//! execution day is strictly after today.
use api_types::subscription::Subscription;
use chrono::{Datelike, Days, Months, NaiveDate};

pub trait RecurringItem {
    /// Signed amount: positive = income, negative = expense.
    fn amount_minor(&self) -> i64;
    fn day_of_month(&self) -> u32;
    fn is_paused(&self) -> bool;
}

impl RecurringItem for Subscription {
    fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    fn day_of_month(&self) -> u32 {
        self.day_of_month
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Income,
    Expenses,
}

impl Direction {
    pub fn matches(self, amount_minor: i64) -> bool {
        match self {
            Self::Income => amount_minor > 0,
            Self::Expenses => amount_minor < 0,
        }
    }

    /// Expenses are reported as positive totals.
    fn present(self, total: i64) -> i64 {
        match self {
            Self::Income => total,
            Self::Expenses => total.saturating_abs(),
        }
    }
}

/// First day of the month containing `date`.
pub(crate) fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Last day of the month starting at `first`.
pub(crate) fn month_end(first: NaiveDate) -> NaiveDate {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// `day_of_month` inside the month starting at `first`, clamped to its last day.
fn day_in_month(first: NaiveDate, day_of_month: u32) -> NaiveDate {
    let last = month_end(first);
    first.with_day(day_of_month.clamp(1, last.day())).unwrap_or(last)
}

/// Day the item actually executes in `today`'s month.
fn effective_day(day_of_month: u32, today: NaiveDate) -> u32 {
    day_of_month.min(month_end(month_start(today)).day())
}

fn has_passed(day_of_month: u32, today: NaiveDate) -> bool {
    effective_day(day_of_month, today) <= today.day()
}

/// Next execution date strictly after `today`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use store::schedule::next_occurrence;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
/// assert_eq!(next_occurrence(15, today), NaiveDate::from_ymd_opt(2024, 4, 15).unwrap());
/// assert_eq!(next_occurrence(25, today), NaiveDate::from_ymd_opt(2024, 3, 25).unwrap());
/// ```
pub fn next_occurrence(day_of_month: u32, today: NaiveDate) -> NaiveDate {
    let first = month_start(today);
    let candidate = day_in_month(first, day_of_month);
    if candidate > today {
        return candidate;
    }
    match first.checked_add_months(Months::new(1)) {
        Some(next_first) => day_in_month(next_first, day_of_month),
        None => candidate,
    }
}

/// Items still due this month first, then those already executed; each group
/// ascending by day. Stable for equal days.
pub fn sort_by_execution<I: RecurringItem + Clone>(items: &[I], today: NaiveDate) -> Vec<I> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| (has_passed(item.day_of_month(), today), item.day_of_month()));
    sorted
}

/// Sum of active items still due this month, in one direction.
pub fn upcoming_total<I: RecurringItem>(
    direction: Direction,
    items: &[I],
    today: NaiveDate,
) -> i64 {
    let total = items
        .iter()
        .filter(|item| !item.is_paused())
        .filter(|item| !has_passed(item.day_of_month(), today))
        .filter(|item| direction.matches(item.amount_minor()))
        .map(RecurringItem::amount_minor)
        .fold(0, i64::saturating_add);
    direction.present(total)
}

pub fn upcoming_income<I: RecurringItem>(items: &[I], today: NaiveDate) -> i64 {
    upcoming_total(Direction::Income, items, today)
}

pub fn upcoming_expenses<I: RecurringItem>(items: &[I], today: NaiveDate) -> i64 {
    upcoming_total(Direction::Expenses, items, today)
}

/// Items of one direction, in execution order.
pub fn planned_balance_by_type<I: RecurringItem + Clone>(
    items: &[I],
    direction: Direction,
    today: NaiveDate,
) -> Vec<I> {
    let filtered: Vec<I> = items
        .iter()
        .filter(|item| direction.matches(item.amount_minor()))
        .cloned()
        .collect();
    sort_by_execution(&filtered, today)
}

/// Full monthly amount of active items in one direction.
pub fn monthly_total<I: RecurringItem>(direction: Direction, items: &[I]) -> i64 {
    let total = items
        .iter()
        .filter(|item| !item.is_paused())
        .filter(|item| direction.matches(item.amount_minor()))
        .map(RecurringItem::amount_minor)
        .fold(0, i64::saturating_add);
    direction.present(total)
}

/// Active items paired with their next execution date, soonest first.
pub fn upcoming_occurrences<I: RecurringItem>(
    items: &[I],
    today: NaiveDate,
) -> Vec<(NaiveDate, &I)> {
    let mut upcoming: Vec<(NaiveDate, &I)> = items
        .iter()
        .filter(|item| !item.is_paused())
        .map(|item| (next_occurrence(item.day_of_month(), today), item))
        .collect();
    upcoming.sort_by_key(|(date, _)| *date);
    upcoming
}
