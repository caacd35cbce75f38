//! Habit Tracker Library
//!
//! Calendar periods, per-day completion statuses and completion statistics
//! for daily habits, plus the stores and services the CLI builds on.

pub mod api;
pub mod config;
pub mod db;
pub mod labels;
pub mod model;
pub mod period;
pub mod report;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod traits;

// Re-export commonly used types
pub use api::BackendClient;
pub use config::AppConfig;
pub use db::PgStore;
pub use labels::{DayLabeler, EnglishLabels, Locale, SpanishLabels};
pub use model::{Completion, Habit, HabitName, InvalidHabitName};
pub use period::{
    Direction,
    Granularity,
    MonthBlock,
    Period,
    UnknownGranularity,
    // Period arithmetic
    compute_range,
    current_reference_date,
    month_blocks,
    shift_period,
};
pub use stats::{
    CompletionSummary,
    DayStatus,
    HabitRow,
    PeriodView,
    // Aggregation
    aggregate_habit_completion,
    aggregate_overall_completion,
    build_grid,
    classify_day,
    count_days_in_period,
    // Calendar helpers
    days_in_month,
    is_leap_year,
    rounded_percentage,
};
pub use store::{CompletionStore, HabitStore, MemoryStore, StoreError, StoreResult};
pub use tracker::{TodayStatus, Toggle, Tracker};
pub use traits::{Clock, MockClock, ReferenceZone, SystemClock};
