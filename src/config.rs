use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::{
    labels::Locale,
    period::Granularity,
    traits::{DEFAULT_TIME_ZONE, ReferenceZone},
};

/// Owner used until real sign-in exists.
pub const PLACEHOLDER_OWNER: &str = "user-123";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub database: DatabaseConfig,
    pub network: NetworkConfig,
    pub tracker: TrackerConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Direct PostgreSQL connection, used instead of the table API when set
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    pub owner_id: String,
    /// IANA zone every calendar day is computed in
    pub time_zone: String,
    pub default_view: Granularity,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            owner_id: PLACEHOLDER_OWNER.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            default_view: Granularity::Week,
        }
    }
}

impl TrackerConfig {
    pub fn reference_zone(&self) -> Result<ReferenceZone> {
        ReferenceZone::parse(&self.time_zone)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Invalid tracker.time_zone `{}`", self.time_zone))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplayConfig {
    pub locale: Locale,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present - production uses env vars directly)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("habit-tracker");

        let builder = Self::defaults()?
            // Local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            // User config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // Environment variables (HABITS__TRACKER__OWNER_ID=...)
            .add_source(Environment::with_prefix("HABITS").separator("__"));

        Self::finish(builder)
    }

    /// Load from one explicit file on top of the defaults, still honoring
    /// environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(Environment::with_prefix("HABITS").separator("__"));

        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        // Backend credentials seeded from the conventional variables
        let backend_url = std::env::var("SUPABASE_URL").unwrap_or_default();
        let anon_key = std::env::var("SUPABASE_ANON_KEY").unwrap_or_default();
        let database_url = std::env::var("DATABASE_URL").ok();

        let builder = Config::builder()
            // Backend
            .set_default("backend.url", backend_url)?
            .set_default("backend.anon_key", anon_key)?
            // Database
            .set_default("database.url", database_url)?
            // Network
            .set_default("network.request_timeout_secs", 30)?
            .set_default("network.connect_timeout_secs", 10)?
            // Tracker
            .set_default("tracker.owner_id", PLACEHOLDER_OWNER)?
            .set_default("tracker.time_zone", DEFAULT_TIME_ZONE)?
            .set_default("tracker.default_view", "week")?
            // Display
            .set_default("display.locale", "es")?;

        Ok(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: AppConfig = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.tracker.reference_zone()?;
        if self.database.url.is_none() && self.backend.url.trim().is_empty() {
            anyhow::bail!(
                "No backend configured: set SUPABASE_URL and SUPABASE_ANON_KEY (or backend.url), \
                 or DATABASE_URL for a direct connection"
            );
        }
        Ok(())
    }
}
