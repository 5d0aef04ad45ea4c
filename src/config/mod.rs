use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub narrative: NarrativeConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

/// Remote record store. Leaving `remote_url` unset runs against the local cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Per-request timeout; 0 leaves it to the remote side.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Local cache, used when no remote store is configured.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Bumping the version suffix discards everything cached under older keys.
    #[serde(default = "default_cache_key")]
    pub cache_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NarrativeConfig {
    #[serde(default = "default_narrative_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_narrative_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotifyConfig {
    /// Mail relay endpoint; falls back to `store.remote_url`.
    #[serde(default)]
    pub relay_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportingConfig {
    /// Organization time zone as minutes east of UTC. Unset uses the local zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    /// Weekly report recipient when none is given on the command line.
    #[serde(default)]
    pub recipient: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    0
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_user_agent() -> String {
    "pipeline-tracker/0.1 (sales pipeline sync)".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/pipeline.duckdb")
}
fn default_cache_key() -> String {
    "pipeline_data_v11".to_string()
}
fn default_refresh_interval_secs() -> u64 {
    600
}
fn default_narrative_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}
fn default_narrative_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_key: default_cache_key(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_narrative_endpoint(),
            model: default_narrative_model(),
            api_key: None,
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("PIPELINE").separator("__"))
            .build()?;

        let mut app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|e| {
            warn!("Unusable configuration ({}), falling back to defaults", e);
            AppConfig::default()
        });

        if app_cfg.narrative.api_key.is_none() {
            app_cfg.narrative.api_key = std::env::var("API_KEY").ok();
        }
        app_cfg.narrative.api_key = app_cfg.narrative.api_key.filter(|k| !k.trim().is_empty());
        Ok(app_cfg)
    }

    /// Endpoint for outbound mail, if any.
    pub fn relay_url(&self) -> Option<&str> {
        non_blank(&self.notify.relay_url).or_else(|| non_blank(&self.store.remote_url))
    }
}
