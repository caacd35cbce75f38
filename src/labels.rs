//! Display labels for grid headers and captions.
//!
//! Kept apart from the period and statistics code, which never format text.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::period::Granularity;

/// Language used for labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn labeler(&self) -> Box<dyn DayLabeler> {
        match self {
            Locale::Es => Box::new(SpanishLabels),
            Locale::En => Box::new(EnglishLabels),
        }
    }
}

/// Produces the text shown for days, months and periods.
pub trait DayLabeler: Send + Sync {
    /// Lowercase full month name for a 1-based month.
    fn month_name(&self, month: u32) -> &'static str;

    /// One-letter weekday initial, Monday first.
    fn weekday_initial(&self, day: NaiveDate) -> char;

    /// Caption naming the current period, e.g. "This week".
    fn period_caption(&self, granularity: Granularity) -> &'static str;

    /// Long form of a date, e.g. "14 de marzo de 2024".
    fn long_date(&self, day: NaiveDate) -> String;

    /// Column header for a day in a grid of the given granularity.
    fn day_header(&self, day: NaiveDate, granularity: Granularity) -> String {
        match granularity {
            Granularity::Week => self.weekday_initial(day).to_string(),
            Granularity::Month => day.day().to_string(),
            Granularity::Quarter | Granularity::Semester | Granularity::Year => {
                format!("{}/{}", day.day(), day.month())
            }
        }
    }
}

// ==================== Spanish ====================

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanishLabels;

impl DayLabeler for SpanishLabels {
    fn month_name(&self, month: u32) -> &'static str {
        month_lookup(&MONTHS_ES, month)
    }

    fn weekday_initial(&self, day: NaiveDate) -> char {
        // X marks miércoles so it differs from martes
        ['L', 'M', 'X', 'J', 'V', 'S', 'D'][day.weekday().num_days_from_monday() as usize]
    }

    fn period_caption(&self, granularity: Granularity) -> &'static str {
        match granularity {
            Granularity::Week => "Esta semana",
            Granularity::Month => "Este mes",
            Granularity::Quarter => "Este trimestre",
            Granularity::Semester => "Este semestre",
            Granularity::Year => "Este año",
        }
    }

    fn long_date(&self, day: NaiveDate) -> String {
        format!(
            "{} de {} de {}",
            day.day(),
            self.month_name(day.month()),
            day.year()
        )
    }
}

// ==================== English ====================

const MONTHS_EN: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishLabels;

impl DayLabeler for EnglishLabels {
    fn month_name(&self, month: u32) -> &'static str {
        month_lookup(&MONTHS_EN, month)
    }

    fn weekday_initial(&self, day: NaiveDate) -> char {
        ['M', 'T', 'W', 'T', 'F', 'S', 'S'][day.weekday().num_days_from_monday() as usize]
    }

    fn period_caption(&self, granularity: Granularity) -> &'static str {
        match granularity {
            Granularity::Week => "This week",
            Granularity::Month => "This month",
            Granularity::Quarter => "This quarter",
            Granularity::Semester => "This semester",
            Granularity::Year => "This year",
        }
    }

    fn long_date(&self, day: NaiveDate) -> String {
        day.format("%B %-d, %Y").to_string()
    }
}

fn month_lookup(names: &[&'static str; 12], month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| names.get(i as usize))
        .copied()
        .unwrap_or("???")
}
