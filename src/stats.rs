//! Completion statistics over a period: per-day status of each habit and
//! completion percentages per habit and across all habits.
//!
//! Every function here is pure. "Today" is always passed in explicitly and
//! must already be expressed in the reference zone.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    model::{Completion, Habit},
    period::{Granularity, Period},
};

// ==================== Day Status ====================

/// Classification of one (habit, day) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    /// A completion exists for the day
    Completed,
    /// The day is over and nothing was recorded
    Incomplete,
    /// Today or later, nothing recorded yet
    Neutral,
}

impl DayStatus {
    /// Single-character cell used by the text grid.
    pub fn symbol(&self) -> char {
        match self {
            DayStatus::Completed => '#',
            DayStatus::Incomplete => 'x',
            DayStatus::Neutral => '.',
        }
    }
}

/// Classify `day` for `habit_id` against a snapshot of completions.
///
/// Matching is by calendar day equality only.
pub fn classify_day(
    habit_id: &str,
    day: NaiveDate,
    completions: &[Completion],
    today: NaiveDate,
) -> DayStatus {
    let completed = completions
        .iter()
        .any(|c| c.habit_id == habit_id && c.day == day);

    if completed {
        DayStatus::Completed
    } else if day < today {
        DayStatus::Incomplete
    } else {
        DayStatus::Neutral
    }
}

// ==================== Period Totals ====================

/// Number of days that count toward the denominator of a completion
/// percentage.
///
/// Ongoing quarters, semesters and years only count the days up to and
/// including `today`; weeks and months always count their full length.
pub fn count_days_in_period(granularity: Granularity, period: &Period, today: NaiveDate) -> u32 {
    match granularity {
        Granularity::Week => 7,
        Granularity::Month => days_in_month(period.start.year(), period.start.month()),
        Granularity::Quarter | Granularity::Semester => {
            let count_end = if period.end > today { today } else { period.end };
            inclusive_days(period.start, count_end)
        }
        Granularity::Year => {
            let year = period.start.year();
            if year == today.year() {
                today.ordinal()
            } else if is_leap_year(year) {
                366
            } else {
                365
            }
        }
    }
}

/// Days from `start` through `end` inclusive, or 0 when `end` precedes `start`.
fn inclusive_days(start: NaiveDate, end: NaiveDate) -> u32 {
    u32::try_from((end - start).num_days() + 1).unwrap_or(0)
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// ==================== Aggregates ====================

/// Completed versus possible days, with a rounded percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CompletionSummary {
    pub completed: u32,
    pub total: u32,
    /// 0-100, rounded half up
    pub percentage: u32,
}

impl CompletionSummary {
    pub fn new(completed: u32, total: u32) -> Self {
        Self {
            completed,
            total,
            percentage: rounded_percentage(completed, total),
        }
    }
}

/// `round(completed / total * 100)` with halves rounded up; 0 when `total` is 0.
pub fn rounded_percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (completed, total) = (u64::from(completed), u64::from(total));
    ((200 * completed + total) / (2 * total)) as u32
}

/// Distinct days in `period` on which `habit_id` was completed.
fn completed_days(habit_id: &str, completions: &[Completion], period: &Period) -> u32 {
    let days: BTreeSet<NaiveDate> = completions
        .iter()
        .filter(|c| c.habit_id == habit_id && period.contains(c.day))
        .map(|c| c.day)
        .collect();
    days.len() as u32
}

/// Completion summary of one habit over a period.
pub fn aggregate_habit_completion(
    habit: &Habit,
    completions: &[Completion],
    granularity: Granularity,
    period: &Period,
    today: NaiveDate,
) -> CompletionSummary {
    CompletionSummary::new(
        completed_days(&habit.id, completions, period),
        count_days_in_period(granularity, period, today),
    )
}

/// Completion summary across all habits: every habit contributes the same
/// number of possible days.
pub fn aggregate_overall_completion(
    habits: &[Habit],
    completions: &[Completion],
    granularity: Granularity,
    period: &Period,
    today: NaiveDate,
) -> CompletionSummary {
    if habits.is_empty() {
        return CompletionSummary::default();
    }

    let per_habit = count_days_in_period(granularity, period, today);
    let completed = habits
        .iter()
        .map(|h| completed_days(&h.id, completions, period))
        .sum();

    CompletionSummary::new(completed, per_habit * habits.len() as u32)
}

// ==================== Grid ====================

/// One habit's row of the period grid.
#[derive(Debug, Clone, Serialize)]
pub struct HabitRow {
    pub habit: Habit,
    /// Status per day, aligned with `Period::days`
    pub statuses: Vec<DayStatus>,
    pub summary: CompletionSummary,
}

/// Everything needed to render one period.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodView {
    pub period: Period,
    pub today: NaiveDate,
    pub rows: Vec<HabitRow>,
    pub overall: CompletionSummary,
}

/// Build the grid rows for `habits`, keeping their input order.
pub fn build_grid(
    habits: &[Habit],
    completions: &[Completion],
    period: Period,
    today: NaiveDate,
) -> PeriodView {
    let granularity = period.granularity;
    let rows = habits
        .iter()
        .map(|habit| HabitRow {
            habit: habit.clone(),
            statuses: period
                .days
                .iter()
                .map(|day| classify_day(&habit.id, *day, completions, today))
                .collect(),
            summary: aggregate_habit_completion(habit, completions, granularity, &period, today),
        })
        .collect();
    let overall = aggregate_overall_completion(habits, completions, granularity, &period, today);

    PeriodView {
        period,
        today,
        rows,
        overall,
    }
}
