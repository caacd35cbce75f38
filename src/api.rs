//! Client for the managed backend's table API.
//!
//! Tables are exposed under `/rest/v1/<table>` with PostgREST-style filters
//! (`column=eq.value`). The anon key is sent both as `apikey` and as a bearer
//! token.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::{
    config::{BackendConfig, NetworkConfig},
    model::{Completion, Habit, HabitName},
    store::{CompletionStore, HabitStore, StoreError, StoreResult},
};

const HABITS_TABLE: &str = "habits";
const COMPLETIONS_TABLE: &str = "habit_completions";

/// API client for the habit tables.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl BackendClient {
    /// Create a new API client with configurable timeouts.
    pub fn new(backend: &BackendConfig, network_config: &NetworkConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(backend.url.trim_end_matches('/'))
            .with_context(|| format!("Invalid backend URL: {}", backend.url))?;

        Ok(Self {
            client,
            base_url,
            anon_key: backend.anon_key.clone(),
        })
    }

    /// URL of `table` with the given filters appended as query pairs.
    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!(
            "{}/rest/v1/{table}",
            self.base_url.path().trim_end_matches('/')
        ));
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "backend request failed");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<Vec<T>> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Send a write that asks for the affected rows back.
    async fn write_returning<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        prefer: &str,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        let request = self
            .request(method, url)
            .header("Prefer", prefer)
            .json(body);
        self.fetch_rows(request).await
    }

    async fn find_completion(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> StoreResult<Option<Completion>> {
        let url = self.table_url(
            COMPLETIONS_TABLE,
            &[
                ("select", "*".to_string()),
                ("habit_id", eq(habit_id)),
                ("user_id", eq(owner)),
                ("date", eq(day)),
                ("limit", "1".to_string()),
            ],
        );
        let rows: Vec<Completion> = self.fetch_rows(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().next())
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn single<T>(rows: Vec<T>, missing: impl FnOnce() -> StoreError) -> StoreResult<T> {
    rows.into_iter().next().ok_or_else(missing)
}

impl HabitStore for BackendClient {
    async fn list_habits(&self, owner: &str) -> StoreResult<Vec<Habit>> {
        let url = self.table_url(
            HABITS_TABLE,
            &[
                ("select", "*".to_string()),
                ("user_id", eq(owner)),
                ("order", "created_at.desc".to_string()),
            ],
        );
        let habits: Vec<Habit> = self.fetch_rows(self.request(Method::GET, url)).await?;
        tracing::debug!(owner, count = habits.len(), "fetched habits");
        Ok(habits)
    }

    async fn create_habit(&self, owner: &str, name: &HabitName) -> StoreResult<Habit> {
        let url = self.table_url(HABITS_TABLE, &[]);
        let body = json!([{ "name": name, "user_id": owner }]);
        let rows = self
            .write_returning(Method::POST, url, "return=representation", &body)
            .await?;
        let habit: Habit = single(rows, || {
            StoreError::Decode("insert returned no habit".to_string())
        })?;
        tracing::info!(owner, habit_id = %habit.id, "created habit");
        Ok(habit)
    }

    async fn rename_habit(
        &self,
        owner: &str,
        habit_id: &str,
        name: &HabitName,
    ) -> StoreResult<Habit> {
        let url = self.table_url(HABITS_TABLE, &[("id", eq(habit_id)), ("user_id", eq(owner))]);
        let body = json!({ "name": name });
        let rows = self
            .write_returning(Method::PATCH, url, "return=representation", &body)
            .await?;
        single(rows, || StoreError::habit_not_found(habit_id))
    }

    async fn delete_habit(&self, owner: &str, habit_id: &str) -> StoreResult<()> {
        let url = self.table_url(HABITS_TABLE, &[("id", eq(habit_id)), ("user_id", eq(owner))]);
        let rows: Vec<Habit> = self
            .fetch_rows(
                self.request(Method::DELETE, url)
                    .header("Prefer", "return=representation"),
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::habit_not_found(habit_id));
        }
        tracing::info!(owner, habit_id, "deleted habit");
        Ok(())
    }
}

impl CompletionStore for BackendClient {
    async fn list_completions(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Completion>> {
        let url = self.table_url(
            COMPLETIONS_TABLE,
            &[
                ("select", "*".to_string()),
                ("user_id", eq(owner)),
                ("date", format!("gte.{start}")),
                ("date", format!("lte.{end}")),
            ],
        );
        let completions: Vec<Completion> = self.fetch_rows(self.request(Method::GET, url)).await?;
        tracing::debug!(owner, %start, %end, count = completions.len(), "fetched completions");
        Ok(completions)
    }

    async fn mark_complete(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<Completion> {
        // The unique (habit_id, date) constraint makes a repeated mark a no-op
        let url = self.table_url(COMPLETIONS_TABLE, &[("on_conflict", "habit_id,date".to_string())]);
        let body = json!([{
            "habit_id": habit_id,
            "user_id": owner,
            "date": day,
            "completed_at": recorded_at,
        }]);
        let rows: Vec<Completion> = self
            .write_returning(
                Method::POST,
                url,
                "resolution=ignore-duplicates,return=representation",
                &body,
            )
            .await?;

        if let Some(created) = rows.into_iter().next() {
            tracing::info!(owner, habit_id, %day, "marked habit complete");
            return Ok(created);
        }

        tracing::debug!(owner, habit_id, %day, "completion already recorded");
        self.find_completion(owner, habit_id, day)
            .await?
            .ok_or_else(|| StoreError::Decode("completion vanished after conflict".to_string()))
    }

    async fn remove_completion(
        &self,
        owner: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> StoreResult<()> {
        let url = self.table_url(
            COMPLETIONS_TABLE,
            &[
                ("habit_id", eq(habit_id)),
                ("user_id", eq(owner)),
                ("date", eq(day)),
            ],
        );
        self.send(self.request(Method::DELETE, url)).await?;
        tracing::info!(owner, habit_id, %day, "removed completion");
        Ok(())
    }
}
