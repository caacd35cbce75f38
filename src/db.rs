//! Direct PostgreSQL access to the same `habits` / `habit_completions`
//! tables the table API serves.
//!
//! The schema is owned by the backend. Ids are `uuid` and are read back as
//! text; `habit_completions` carries a unique constraint on
//! `(habit_id, date)`.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::{
    model::{Completion, Habit, HabitName},
    store::{CompletionStore, HabitStore, StoreError, StoreResult},
};

macro_rules! habit_columns {
    () => {
        "id::text AS id, user_id, name, created_at"
    };
}

macro_rules! completion_columns {
    () => {
        "id::text AS id, habit_id::text AS habit_id, user_id, date, completed_at"
    };
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        tracing::info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_completion(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> StoreResult<Option<Completion>> {
        let sql = concat!(
            "SELECT ",
            completion_columns!(),
            " FROM habit_completions",
            " WHERE habit_id = $1::uuid AND user_id = $2 AND date = $3 LIMIT 1"
        );
        let completion = sqlx::query_as::<_, Completion>(sql)
            .bind(habit_id)
            .bind(owner)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        Ok(completion)
    }

    async fn owns_habit(&self, owner: &str, habit_id: &str) -> StoreResult<bool> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM habits WHERE id = $1::uuid AND user_id = $2")
                .bind(habit_id)
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

impl HabitStore for PgStore {
    async fn list_habits(&self, owner: &str) -> StoreResult<Vec<Habit>> {
        let sql = concat!(
            "SELECT ",
            habit_columns!(),
            " FROM habits WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let habits = sqlx::query_as::<_, Habit>(sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(owner, count = habits.len(), "fetched habits");
        Ok(habits)
    }

    async fn create_habit(&self, owner: &str, name: &HabitName) -> StoreResult<Habit> {
        let sql = concat!(
            "INSERT INTO habits (user_id, name) VALUES ($1, $2) RETURNING ",
            habit_columns!()
        );
        let habit = sqlx::query_as::<_, Habit>(sql)
            .bind(owner)
            .bind(name.as_str())
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(owner, habit_id = %habit.id, "created habit");
        Ok(habit)
    }

    async fn rename_habit(
        &self,
        owner: &str,
        habit_id: &str,
        name: &HabitName,
    ) -> StoreResult<Habit> {
        let sql = concat!(
            "UPDATE habits SET name = $1 WHERE id = $2::uuid AND user_id = $3 RETURNING ",
            habit_columns!()
        );
        sqlx::query_as::<_, Habit>(sql)
            .bind(name.as_str())
            .bind(habit_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::habit_not_found(habit_id))
    }

    async fn delete_habit(&self, owner: &str, habit_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM habit_completions WHERE habit_id = $1::uuid AND user_id = $2")
            .bind(habit_id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM habits WHERE id = $1::uuid AND user_id = $2")
            .bind(habit_id)
            .bind(owner)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(StoreError::habit_not_found(habit_id));
        }
        tx.commit().await?;
        tracing::info!(owner, habit_id, "deleted habit");
        Ok(())
    }
}

impl CompletionStore for PgStore {
    async fn list_completions(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Completion>> {
        let sql = concat!(
            "SELECT ",
            completion_columns!(),
            " FROM habit_completions",
            " WHERE user_id = $1 AND date >= $2 AND date <= $3 ORDER BY date ASC"
        );
        let completions = sqlx::query_as::<_, Completion>(sql)
            .bind(owner)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(completions)
    }

    async fn mark_complete(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<Completion> {
        if !self.owns_habit(owner, habit_id).await? {
            return Err(StoreError::habit_not_found(habit_id));
        }

        let sql = concat!(
            "INSERT INTO habit_completions (habit_id, user_id, date, completed_at)",
            " VALUES ($1::uuid, $2, $3, $4)",
            " ON CONFLICT (habit_id, date) DO NOTHING RETURNING ",
            completion_columns!()
        );
        let inserted = sqlx::query_as::<_, Completion>(sql)
            .bind(habit_id)
            .bind(owner)
            .bind(day)
            .bind(recorded_at)
            .fetch_optional(&self.pool)
            .await?;

        match inserted {
            Some(completion) => {
                tracing::info!(owner, habit_id, %day, "marked habit complete");
                Ok(completion)
            }
            None => self
                .find_completion(owner, habit_id, day)
                .await?
                .ok_or_else(|| StoreError::Decode("completion vanished after conflict".into())),
        }
    }

    async fn remove_completion(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> StoreResult<()> {
        sqlx::query(
            "DELETE FROM habit_completions WHERE habit_id = $1::uuid AND user_id = $2 AND date = $3",
        )
        .bind(habit_id)
        .bind(owner)
        .bind(day)
        .execute(&self.pool)
        .await?;
        tracing::info!(owner, habit_id, %day, "removed completion");
        Ok(())
    }
}
