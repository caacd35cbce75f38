//! Habit and completion storage.
//!
//! The engine never talks to a store; these traits are what the tracker and
//! the CLI use to load snapshots and record changes. Every call is scoped by
//! owner.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::{Completion, Habit, HabitName};

/// Failure reported by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn habit_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "habit",
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD over an owner's habits.
pub trait HabitStore: Send + Sync {
    /// All habits of `owner`, newest first.
    fn list_habits(&self, owner: &str) -> impl Future<Output = StoreResult<Vec<Habit>>> + Send;

    fn create_habit(
        &self,
        owner: &str,
        name: &HabitName,
    ) -> impl Future<Output = StoreResult<Habit>> + Send;

    fn rename_habit(
        &self,
        owner: &str,
        habit_id: &str,
        name: &HabitName,
    ) -> impl Future<Output = StoreResult<Habit>> + Send;

    /// Delete a habit together with its completions.
    fn delete_habit(
        &self,
        owner: &str,
        habit_id: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Completion records keyed by (habit, day).
pub trait CompletionStore: Send + Sync {
    /// Completions of `owner` with `start <= day <= end`.
    fn list_completions(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = StoreResult<Vec<Completion>>> + Send;

    /// Record `habit_id` as done on `day`. Marking an already completed day
    /// returns the existing record and creates nothing.
    fn mark_complete(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Completion>> + Send;

    /// Remove the completion for (`habit_id`, `day`), if any.
    fn remove_completion(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn completions_on(
        &self,
        owner: &str,
        day: NaiveDate,
    ) -> impl Future<Output = StoreResult<Vec<Completion>>> + Send {
        self.list_completions(owner, day, day)
    }
}

// ==================== In-Memory Store ====================

#[derive(Debug, Default)]
struct MemoryState {
    habits: Vec<Habit>,
    completions: Vec<Completion>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// Store kept entirely in memory, for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored completions across all owners.
    pub fn completion_count(&self) -> usize {
        self.lock().completions.len()
    }

    /// Insert a habit with a fixed creation time.
    pub fn insert_habit_at(&self, owner: &str, name: &HabitName, created_at: DateTime<Utc>) -> Habit {
        let mut state = self.lock();
        let habit = Habit {
            id: state.next_id("habit"),
            owner_id: owner.to_string(),
            name: name.as_str().to_string(),
            created_at,
        };
        state.habits.push(habit.clone());
        habit
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HabitStore for MemoryStore {
    async fn list_habits(&self, owner: &str) -> StoreResult<Vec<Habit>> {
        let mut habits: Vec<Habit> = self
            .lock()
            .habits
            .iter()
            .filter(|h| h.owner_id == owner)
            .cloned()
            .collect();
        habits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(habits)
    }

    async fn create_habit(&self, owner: &str, name: &HabitName) -> StoreResult<Habit> {
        Ok(self.insert_habit_at(owner, name, Utc::now()))
    }

    async fn rename_habit(
        &self,
        owner: &str,
        habit_id: &str,
        name: &HabitName,
    ) -> StoreResult<Habit> {
        let mut state = self.lock();
        let habit = state
            .habits
            .iter_mut()
            .find(|h| h.id == habit_id && h.owner_id == owner)
            .ok_or_else(|| StoreError::habit_not_found(habit_id))?;
        habit.name = name.as_str().to_string();
        Ok(habit.clone())
    }

    async fn delete_habit(&self, owner: &str, habit_id: &str) -> StoreResult<()> {
        let mut state = self.lock();
        let before = state.habits.len();
        state
            .habits
            .retain(|h| !(h.id == habit_id && h.owner_id == owner));
        if state.habits.len() == before {
            return Err(StoreError::habit_not_found(habit_id));
        }
        state
            .completions
            .retain(|c| !(c.habit_id == habit_id && c.owner_id == owner));
        Ok(())
    }
}

impl CompletionStore for MemoryStore {
    async fn list_completions(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Completion>> {
        Ok(self
            .lock()
            .completions
            .iter()
            .filter(|c| c.owner_id == owner && start <= c.day && c.day <= end)
            .cloned()
            .collect())
    }

    async fn mark_complete(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<Completion> {
        let mut state = self.lock();
        if !state
            .habits
            .iter()
            .any(|h| h.id == habit_id && h.owner_id == owner)
        {
            return Err(StoreError::habit_not_found(habit_id));
        }
        if let Some(existing) = state
            .completions
            .iter()
            .find(|c| c.habit_id == habit_id && c.day == day)
        {
            return Ok(existing.clone());
        }

        let completion = Completion {
            id: state.next_id("completion"),
            habit_id: habit_id.to_string(),
            owner_id: owner.to_string(),
            day,
            recorded_at,
        };
        state.completions.push(completion.clone());
        Ok(completion)
    }

    async fn remove_completion(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> StoreResult<()> {
        self.lock()
            .completions
            .retain(|c| !(c.owner_id == owner && c.habit_id == habit_id && c.day == day));
        Ok(())
    }
}
