//! Calendar periods: computing the date range a view covers and moving
//! between adjacent ranges of the same size.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::{Clock, ReferenceZone};

// ==================== Granularity ====================

/// Size of the calendar window a grid shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Monday through Sunday
    Week,
    /// One calendar month
    Month,
    /// Jan-Mar, Apr-Jun, Jul-Sep or Oct-Dec
    Quarter,
    /// Jan-Jun or Jul-Dec
    Semester,
    /// Jan 1 through Dec 31
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Week,
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Semester,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Semester => "semester",
            Granularity::Year => "year",
        }
    }

    /// Months spanned by one step, or `None` for week.
    fn months(&self) -> Option<u32> {
        match self {
            Granularity::Week => None,
            Granularity::Month => Some(1),
            Granularity::Quarter => Some(3),
            Granularity::Semester => Some(6),
            Granularity::Year => Some(12),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a granularity tag is not one of the five known views.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity `{0}` (expected week, month, quarter, semester or year)")]
pub struct UnknownGranularity(pub String);

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "quarter" => Ok(Granularity::Quarter),
            "semester" => Ok(Granularity::Semester),
            "year" => Ok(Granularity::Year),
            _ => Err(UnknownGranularity(s.to_string())),
        }
    }
}

/// Navigation direction between adjacent periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

// ==================== Period ====================

/// A concrete inclusive date range of one granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub granularity: Granularity,
    /// First day (inclusive)
    pub start: NaiveDate,
    /// Last day (inclusive)
    pub end: NaiveDate,
    /// Every day from `start` to `end`, ascending
    pub days: Vec<NaiveDate>,
}

impl Period {
    /// Start of the range at 00:00:00.000.
    pub fn start_of_range(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// End of the range at 23:59:59.999.
    pub fn end_of_range(&self) -> NaiveDateTime {
        self.end.and_time(end_of_day())
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days covered.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// Compute the period of `granularity` that contains `reference`.
pub fn compute_range(reference: NaiveDate, granularity: Granularity) -> Period {
    let (start, end) = match granularity {
        Granularity::Week => {
            let back = Days::new(reference.weekday().num_days_from_monday() as u64);
            let start = reference.checked_sub_days(back).unwrap_or(NaiveDate::MIN);
            (start, start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX))
        }
        Granularity::Month => month_span(reference.year(), reference.month(), 1),
        Granularity::Quarter => {
            let first_month = (reference.month0() / 3) * 3 + 1;
            month_span(reference.year(), first_month, 3)
        }
        Granularity::Semester => {
            let first_month = if reference.month0() < 6 { 1 } else { 7 };
            month_span(reference.year(), first_month, 6)
        }
        Granularity::Year => month_span(reference.year(), 1, 12),
    };

    Period {
        granularity,
        start,
        end,
        days: start.iter_days().take_while(|day| *day <= end).collect(),
    }
}

/// First day of `first_month` through the last day of the month `count - 1`
/// months later.
fn month_span(year: i32, first_month: u32, count: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, first_month, 1).unwrap_or(NaiveDate::MIN);
    let end = start
        .checked_add_months(Months::new(count))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// Move `reference` by one unit of `granularity`.
///
/// Month-based steps keep the day of month where possible and clamp to the
/// last day of the target month otherwise, so 2024-01-31 moves to
/// 2024-02-29 and 2024-02-29 plus one year is 2025-02-28. At the edge of the
/// representable calendar the reference is returned unchanged.
pub fn shift_period(
    reference: NaiveDate,
    granularity: Granularity,
    direction: Direction,
) -> NaiveDate {
    let shifted = match (granularity.months(), direction) {
        (None, Direction::Previous) => reference.checked_sub_days(Days::new(7)),
        (None, Direction::Next) => reference.checked_add_days(Days::new(7)),
        (Some(months), Direction::Previous) => reference.checked_sub_months(Months::new(months)),
        (Some(months), Direction::Next) => reference.checked_add_months(Months::new(months)),
    };
    shifted.unwrap_or(reference)
}

/// Reference date for "the current period": today in the reference zone.
pub fn current_reference_date<C: Clock>(clock: &C, zone: &ReferenceZone) -> NaiveDate {
    clock.today_in(zone)
}

// ==================== Month Blocks ====================

/// Days of one calendar month inside a period, split into rows of at most
/// seven days for compact year and semester grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBlock {
    pub year: i32,
    /// 1-based month
    pub month: u32,
    pub chunks: Vec<Vec<NaiveDate>>,
}

impl MonthBlock {
    pub fn days(&self) -> impl Iterator<Item = &NaiveDate> {
        self.chunks.iter().flatten()
    }
}

/// Group a period's days by month, in calendar order.
pub fn month_blocks(period: &Period) -> Vec<MonthBlock> {
    let mut blocks: Vec<MonthBlock> = Vec::new();

    for day in &period.days {
        let same_month = blocks
            .last()
            .is_some_and(|b| b.year == day.year() && b.month == day.month());
        if !same_month {
            blocks.push(MonthBlock {
                year: day.year(),
                month: day.month(),
                chunks: Vec::new(),
            });
        }
        let Some(block) = blocks.last_mut() else {
            continue;
        };
        match block.chunks.last_mut() {
            Some(chunk) if chunk.len() < 7 => chunk.push(*day),
            _ => block.chunks.push(vec![*day]),
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use chrono::{Timelike, Weekday};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==================== Granularity Parsing Tests ====================

    #[test]
    fn test_granularity_parses_known_tags() {
        assert_eq!("week".parse::<Granularity>(), Ok(Granularity::Week));
        assert_eq!("Month".parse::<Granularity>(), Ok(Granularity::Month));
        assert_eq!(" QUARTER ".parse::<Granularity>(), Ok(Granularity::Quarter));
        assert_eq!("semester".parse::<Granularity>(), Ok(Granularity::Semester));
        assert_eq!("year".parse::<Granularity>(), Ok(Granularity::Year));
    }

    #[test]
    fn test_granularity_rejects_unknown_tag() {
        let err = "fortnight".parse::<Granularity>().unwrap_err();
        assert_eq!(err, UnknownGranularity("fortnight".to_string()));
        assert!(err.to_string().contains("fortnight"));
    }

    #[test]
    fn test_granularity_display_round_trips() {
        for g in Granularity::ALL {
            assert_eq!(g.to_string().parse::<Granularity>(), Ok(g));
        }
    }

    #[test]
    fn test_granularity_serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&Granularity::Semester).unwrap();
        assert_eq!(json, "\"semester\"");
        let parsed: Granularity = serde_json::from_str("\"quarter\"").unwrap();
        assert_eq!(parsed, Granularity::Quarter);
    }

    // ==================== compute_range Tests ====================

    #[test]
    fn test_week_of_thursday() {
        let period = compute_range(date(2024, 3, 14), Granularity::Week);
        assert_eq!(period.start, date(2024, 3, 11));
        assert_eq!(period.end, date(2024, 3, 17));
        assert_eq!(period.len(), 7);
        assert_eq!(period.start.weekday(), Weekday::Mon);
        assert_eq!(period.end.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_week_of_sunday_belongs_to_preceding_monday() {
        let period = compute_range(date(2024, 3, 17), Granularity::Week);
        assert_eq!(period.start, date(2024, 3, 11));
    }

    #[test]
    fn test_week_spanning_year_boundary() {
        let period = compute_range(date(2025, 1, 1), Granularity::Week);
        assert_eq!(period.start, date(2024, 12, 30));
        assert_eq!(period.end, date(2025, 1, 5));
    }

    #[test]
    fn test_month_lengths() {
        assert_eq!(compute_range(date(2024, 2, 10), Granularity::Month).len(), 29);
        assert_eq!(compute_range(date(2023, 2, 10), Granularity::Month).len(), 28);
        assert_eq!(compute_range(date(2024, 4, 30), Granularity::Month).len(), 30);
        let december = compute_range(date(2024, 12, 31), Granularity::Month);
        assert_eq!(december.start, date(2024, 12, 1));
        assert_eq!(december.end, date(2024, 12, 31));
    }

    #[test]
    fn test_quarter_boundaries() {
        let q1 = compute_range(date(2024, 2, 29), Granularity::Quarter);
        assert_eq!((q1.start, q1.end), (date(2024, 1, 1), date(2024, 3, 31)));
        assert_eq!(q1.len(), 91);

        let q3 = compute_range(date(2024, 7, 1), Granularity::Quarter);
        assert_eq!((q3.start, q3.end), (date(2024, 7, 1), date(2024, 9, 30)));

        let q4 = compute_range(date(2023, 12, 31), Granularity::Quarter);
        assert_eq!((q4.start, q4.end), (date(2023, 10, 1), date(2023, 12, 31)));
    }

    #[test]
    fn test_semester_boundaries() {
        let h1 = compute_range(date(2023, 6, 30), Granularity::Semester);
        assert_eq!((h1.start, h1.end), (date(2023, 1, 1), date(2023, 6, 30)));
        assert_eq!(h1.len(), 181);

        let h2 = compute_range(date(2023, 7, 1), Granularity::Semester);
        assert_eq!((h2.start, h2.end), (date(2023, 7, 1), date(2023, 12, 31)));
        assert_eq!(h2.len(), 184);
    }

    #[test]
    fn test_year_boundaries() {
        let year = compute_range(date(2024, 8, 8), Granularity::Year);
        assert_eq!((year.start, year.end), (date(2024, 1, 1), date(2024, 12, 31)));
        assert_eq!(year.len(), 366);
        assert_eq!(compute_range(date(2023, 1, 1), Granularity::Year).len(), 365);
    }

    #[test]
    fn test_range_normalized_to_day_boundaries() {
        let period = compute_range(date(2024, 3, 14), Granularity::Month);
        let start = period.start_of_range();
        let end = period.end_of_range();

        assert_eq!(start.date(), date(2024, 3, 1));
        assert_eq!((start.hour(), start.minute(), start.second()), (0, 0, 0));
        assert_eq!(end.date(), date(2024, 3, 31));
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.nanosecond(), 999_000_000);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let period = compute_range(date(2024, 3, 14), Granularity::Week);
        assert!(period.contains(date(2024, 3, 11)));
        assert!(period.contains(date(2024, 3, 17)));
        assert!(!period.contains(date(2024, 3, 10)));
        assert!(!period.contains(date(2024, 3, 18)));
    }

    // ==================== shift_period Tests ====================

    #[test]
    fn test_shift_month_clamps_to_leap_day() {
        let next = shift_period(date(2024, 1, 31), Granularity::Month, Direction::Next);
        assert_eq!(next, date(2024, 2, 29));
    }

    #[test]
    fn test_shift_month_previous_clamps() {
        let prev = shift_period(date(2023, 3, 31), Granularity::Month, Direction::Previous);
        assert_eq!(prev, date(2023, 2, 28));
    }

    #[test]
    fn test_shift_week_moves_seven_days() {
        let next = shift_period(date(2024, 12, 28), Granularity::Week, Direction::Next);
        assert_eq!(next, date(2025, 1, 4));
        let prev = shift_period(date(2024, 3, 14), Granularity::Week, Direction::Previous);
        assert_eq!(prev, date(2024, 3, 7));
    }

    #[test]
    fn test_shift_quarter_and_semester() {
        assert_eq!(
            shift_period(date(2024, 11, 30), Granularity::Quarter, Direction::Next),
            date(2025, 2, 28)
        );
        assert_eq!(
            shift_period(date(2024, 8, 31), Granularity::Semester, Direction::Previous),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn test_shift_year_from_leap_day() {
        assert_eq!(
            shift_period(date(2024, 2, 29), Granularity::Year, Direction::Next),
            date(2025, 2, 28)
        );
    }

    #[test]
    fn test_shift_lands_in_adjacent_period() {
        let reference = date(2024, 5, 31);
        for g in Granularity::ALL {
            let current = compute_range(reference, g);
            let next = compute_range(shift_period(reference, g, Direction::Next), g);
            let prev = compute_range(shift_period(reference, g, Direction::Previous), g);
            assert_eq!(next.start, current.end.succ_opt().unwrap(), "{g}");
            assert_eq!(prev.end, current.start.pred_opt().unwrap(), "{g}");
        }
    }

    #[test]
    fn test_shift_at_calendar_limit_is_unchanged() {
        assert_eq!(
            shift_period(NaiveDate::MAX, Granularity::Year, Direction::Next),
            NaiveDate::MAX
        );
    }

    // ==================== Month Block Tests ====================

    #[test]
    fn test_month_blocks_for_year() {
        let period = compute_range(date(2024, 5, 5), Granularity::Year);
        let blocks = month_blocks(&period);

        assert_eq!(blocks.len(), 12);
        assert_eq!(blocks[1].month, 2);
        assert_eq!(blocks[1].days().count(), 29);
        // 31 days -> 7+7+7+7+3
        assert_eq!(blocks[0].chunks.len(), 5);
        assert_eq!(blocks[0].chunks[4].len(), 3);
        let total: usize = blocks.iter().map(|b| b.days().count()).sum();
        assert_eq!(total, 366);
    }

    #[test]
    fn test_month_blocks_for_week_crossing_months() {
        let period = compute_range(date(2024, 2, 28), Granularity::Week);
        let blocks = month_blocks(&period);

        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].month, blocks[0].days().count()), (2, 4));
        assert_eq!((blocks[1].month, blocks[1].days().count()), (3, 3));
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn any_granularity() -> impl Strategy<Value = Granularity> {
            prop::sample::select(Granularity::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn range_contains_reference_and_is_contiguous(
                ordinal in 0i64..(400 * 366),
                g in any_granularity()
            ) {
                let reference = date(1900, 1, 1) + chrono::Duration::days(ordinal);
                let period = compute_range(reference, g);

                prop_assert!(period.start <= period.end);
                prop_assert!(period.contains(reference));
                prop_assert_eq!(
                    period.len() as i64,
                    (period.end - period.start).num_days() + 1
                );
                for pair in period.days.windows(2) {
                    prop_assert_eq!(pair[0].succ_opt(), Some(pair[1]));
                }
            }

            #[test]
            fn week_is_monday_to_sunday(ordinal in 0i64..(400 * 366)) {
                let reference = date(1900, 1, 1) + chrono::Duration::days(ordinal);
                let period = compute_range(reference, Granularity::Week);
                prop_assert_eq!(period.len(), 7);
                prop_assert_eq!(period.start.weekday(), Weekday::Mon);
                prop_assert_eq!(period.end.weekday(), Weekday::Sun);
            }

            #[test]
            fn periods_partition_the_year(
                year in 1900i32..2300,
                g in prop::sample::select(vec![
                    Granularity::Month,
                    Granularity::Quarter,
                    Granularity::Semester,
                    Granularity::Year,
                ])
            ) {
                let mut cursor = date(year, 1, 1);
                let mut covered = Vec::new();
                while cursor.year() == year {
                    let period = compute_range(cursor, g);
                    prop_assert_eq!(period.start, cursor);
                    covered.extend(period.days.iter().copied());
                    cursor = period.end.succ_opt().unwrap();
                }
                let expected: Vec<NaiveDate> = date(year, 1, 1)
                    .iter_days()
                    .take_while(|d| d.year() == year)
                    .collect();
                prop_assert_eq!(covered, expected);
            }

            #[test]
            fn shift_next_then_previous_stays_in_same_period(
                ordinal in 0i64..(400 * 366),
                g in any_granularity()
            ) {
                let reference = date(1900, 1, 1) + chrono::Duration::days(ordinal);
                let back = shift_period(
                    shift_period(reference, g, Direction::Next),
                    g,
                    Direction::Previous,
                );
                prop_assert_eq!(compute_range(back, g), compute_range(reference, g));
            }
        }
    }
}
