//! Owner-scoped habit operations on top of a store, a clock and the
//! reference zone.

use chrono::NaiveDate;

use crate::{
    model::{Completion, Habit},
    period::{Granularity, compute_range, current_reference_date},
    stats::{PeriodView, build_grid},
    store::{CompletionStore, HabitStore, StoreResult},
    traits::{Clock, ReferenceZone},
};

/// Result of toggling today's completion for a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Marked(Completion),
    Cleared,
}

/// Whether a habit has been done today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayStatus {
    pub habit: Habit,
    pub done: bool,
}

pub struct Tracker<S, C> {
    store: S,
    clock: C,
    zone: ReferenceZone,
    owner: String,
}

impl<S, C> Tracker<S, C>
where
    S: HabitStore + CompletionStore,
    C: Clock,
{
    pub fn new(store: S, clock: C, zone: ReferenceZone, owner: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            zone,
            owner: owner.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Today's date in the reference zone.
    pub fn today(&self) -> NaiveDate {
        current_reference_date(&self.clock, &self.zone)
    }

    /// Clear today's completion of `habit_id` if it exists, otherwise record it.
    pub async fn toggle_today(&self, habit_id: &str) -> StoreResult<Toggle> {
        let today = self.today();
        let done = self
            .store
            .completions_on(&self.owner, today)
            .await?
            .iter()
            .any(|c| c.habit_id == habit_id);

        if done {
            self.store
                .remove_completion(&self.owner, habit_id, today)
                .await?;
            tracing::debug!(habit_id, %today, "toggled off");
            return Ok(Toggle::Cleared);
        }

        let completion = self
            .store
            .mark_complete(&self.owner, habit_id, today, self.clock.now_utc())
            .await?;
        tracing::debug!(habit_id, %today, "toggled on");
        Ok(Toggle::Marked(completion))
    }

    /// Grid and summaries for the period of `granularity` containing `reference`.
    pub async fn period_view(
        &self,
        granularity: Granularity,
        reference: NaiveDate,
    ) -> StoreResult<PeriodView> {
        let period = compute_range(reference, granularity);
        let habits = self.store.list_habits(&self.owner).await?;
        let completions = self
            .store
            .list_completions(&self.owner, period.start, period.end)
            .await?;
        tracing::debug!(
            %granularity,
            start = %period.start,
            end = %period.end,
            habits = habits.len(),
            completions = completions.len(),
            "building period view"
        );
        Ok(build_grid(&habits, &completions, period, self.today()))
    }

    /// Every habit with a flag telling whether it is done today.
    pub async fn today_status(&self) -> StoreResult<Vec<TodayStatus>> {
        let today = self.today();
        let habits = self.store.list_habits(&self.owner).await?;
        let completions = self.store.completions_on(&self.owner, today).await?;

        Ok(habits
            .into_iter()
            .map(|habit| {
                let done = completions.iter().any(|c| c.habit_id == habit.id);
                TodayStatus { habit, done }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{model::HabitName, stats::DayStatus, store::MemoryStore, traits::MockClock};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Tracker whose clock reads 2024-03-14 12:00 in Mexico City.
    fn make_tracker() -> (Tracker<MemoryStore, MockClock>, MockClock) {
        let clock = MockClock::new(Utc.with_ymd_and_hms(2024, 3, 14, 18, 0, 0).unwrap());
        let tracker = Tracker::new(
            MemoryStore::new(),
            clock.clone(),
            ReferenceZone::default(),
            "user-123",
        );
        (tracker, clock)
    }

    async fn add_habit(tracker: &Tracker<MemoryStore, MockClock>, name: &str) -> Habit {
        tracker
            .store()
            .create_habit(tracker.owner(), &HabitName::parse(name).unwrap())
            .await
            .unwrap()
    }

    // ==================== Toggle Tests ====================

    #[tokio::test]
    async fn test_toggle_marks_then_clears() {
        let (tracker, _clock) = make_tracker();
        let habit = add_habit(&tracker, "Run").await;

        let first = tracker.toggle_today(&habit.id).await.unwrap();
        match first {
            Toggle::Marked(completion) => {
                assert_eq!(completion.day, date(2024, 3, 14));
                assert_eq!(
                    completion.recorded_at,
                    Utc.with_ymd_and_hms(2024, 3, 14, 18, 0, 0).unwrap()
                );
            }
            Toggle::Cleared => panic!("first toggle should mark"),
        }
        assert_eq!(tracker.store().completion_count(), 1);

        let second = tracker.toggle_today(&habit.id).await.unwrap();
        assert_eq!(second, Toggle::Cleared);
        assert_eq!(tracker.store().completion_count(), 0);
    }

    #[tokio::test]
    async fn test_toggle_uses_reference_zone_day() {
        let (tracker, clock) = make_tracker();
        let habit = add_habit(&tracker, "Read").await;

        // 03:00 UTC on the 15th is still the 14th in Mexico City
        clock.set_time(Utc.with_ymd_and_hms(2024, 3, 15, 3, 0, 0).unwrap());
        let Toggle::Marked(completion) = tracker.toggle_today(&habit.id).await.unwrap() else {
            panic!("expected a new completion");
        };
        assert_eq!(completion.day, date(2024, 3, 14));
    }

    #[tokio::test]
    async fn test_toggle_unknown_habit_fails() {
        let (tracker, _clock) = make_tracker();
        assert!(tracker.toggle_today("missing").await.is_err());
    }

    // ==================== Period View Tests ====================

    #[tokio::test]
    async fn test_period_view_week() {
        let (tracker, clock) = make_tracker();
        let habit = add_habit(&tracker, "Run").await;

        clock.set_time(Utc.with_ymd_and_hms(2024, 3, 11, 18, 0, 0).unwrap());
        tracker.toggle_today(&habit.id).await.unwrap();
        clock.set_time(Utc.with_ymd_and_hms(2024, 3, 13, 18, 0, 0).unwrap());
        tracker.toggle_today(&habit.id).await.unwrap();
        clock.set_time(Utc.with_ymd_and_hms(2024, 3, 14, 18, 0, 0).unwrap());

        let view = tracker
            .period_view(Granularity::Week, date(2024, 3, 14))
            .await
            .unwrap();

        assert_eq!(view.period.start, date(2024, 3, 11));
        assert_eq!(view.period.end, date(2024, 3, 17));
        assert_eq!(view.today, date(2024, 3, 14));
        assert_eq!(view.rows.len(), 1);
        assert_eq!(
            view.rows[0].statuses,
            vec![
                DayStatus::Completed,
                DayStatus::Incomplete,
                DayStatus::Completed,
                DayStatus::Neutral,
                DayStatus::Neutral,
                DayStatus::Neutral,
                DayStatus::Neutral,
            ]
        );
        assert_eq!(view.rows[0].summary.completed, 2);
        assert_eq!(view.rows[0].summary.total, 7);
        assert_eq!(view.rows[0].summary.percentage, 29);
        assert_eq!(view.overall, view.rows[0].summary);
    }

    #[tokio::test]
    async fn test_period_view_ignores_other_owners() {
        let (tracker, _clock) = make_tracker();
        let mine = add_habit(&tracker, "Run").await;
        let theirs = tracker
            .store()
            .create_habit("someone-else", &HabitName::parse("Swim").unwrap())
            .await
            .unwrap();
        tracker
            .store()
            .mark_complete("someone-else", &theirs.id, date(2024, 3, 12), Utc::now())
            .await
            .unwrap();

        let view = tracker
            .period_view(Granularity::Month, date(2024, 3, 1))
            .await
            .unwrap();

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].habit.id, mine.id);
        assert_eq!(view.overall.completed, 0);
        assert_eq!(view.overall.total, 31);
    }

    #[tokio::test]
    async fn test_period_view_without_habits() {
        let (tracker, _clock) = make_tracker();
        let view = tracker
            .period_view(Granularity::Year, date(2024, 6, 1))
            .await
            .unwrap();
        assert!(view.rows.is_empty());
        assert_eq!(view.overall.percentage, 0);
        assert_eq!(view.period.len(), 366);
    }

    // ==================== Today Status Tests ====================

    #[tokio::test]
    async fn test_today_status() {
        let (tracker, _clock) = make_tracker();
        let run = add_habit(&tracker, "Run").await;
        let read = add_habit(&tracker, "Read").await;
        tracker.toggle_today(&run.id).await.unwrap();

        let status = tracker.today_status().await.unwrap();
        assert_eq!(status.len(), 2);
        for entry in status {
            if entry.habit.id == run.id {
                assert!(entry.done);
            } else {
                assert_eq!(entry.habit.id, read.id);
                assert!(!entry.done);
            }
        }
    }
}
