//! `arena-pulse.toml` configuration.
//!
//! Every section and field is optional; a missing file means defaults.
//!
//! # Example
//!
//! ```toml
//! [generation]
//! model = "claude-sonnet-4-20250514"
//! base_url = "https://api.anthropic.com"
//! max_tokens = 1024
//! timeout_secs = 30
//!
//! [persistence]
//! backend = "jsonl"
//! path = "data"
//! mode = "await"
//! created_by = "system"
//!
//! [server]
//! port = 8080
//! ```
//!
//! Secrets never live in the file: the generation key comes from
//! `ANTHROPIC_API_KEY` and the REST store key from `ARENA_PULSE_STORE_KEY`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arena_pulse_predict::{
    PersistMode, PipelineConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use arena_pulse_storage::{
    InMemoryStore, JsonlStore, NullStore, RestStore, RestStoreConfig, StorageError, TableStore,
    SYSTEM_CREATOR,
};
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "arena-pulse.toml";

pub(crate) const GENERATION_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub(crate) const STORE_KEY_ENV: &str = "ARENA_PULSE_STORE_KEY";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("error reading config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not open store: {0}")]
    Store(#[from] StorageError),
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AppConfig {
    pub generation: GenerationSettings,
    pub persistence: PersistenceSettings,
    pub server: ServerSettings,
}

/// `[generation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GenerationSettings {
    pub model: String,
    /// Generation service base URL. `None` uses the provider default.
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Backend {
    /// Discard every write.
    #[default]
    None,
    Memory,
    Jsonl,
    Rest,
}

/// `[persistence]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PersistenceSettings {
    pub backend: Backend,
    /// Directory for the `jsonl` backend.
    pub path: PathBuf,
    /// Base URL for the `rest` backend.
    pub url: Option<String>,
    pub mode: PersistMode,
    pub created_by: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            backend: Backend::None,
            path: PathBuf::from("data"),
            url: None,
            mode: PersistMode::Await,
            created_by: SYSTEM_CREATOR.to_string(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load `path`, or `arena-pulse.toml` if it exists, or defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub(crate) fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Invalid("generation.model is empty".to_string()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generation.timeout_secs must be at least 1".to_string(),
            ));
        }
        let mut config = PipelineConfig::default()
            .with_model(self.generation.model.trim())
            .with_timeout(Duration::from_secs(self.generation.timeout_secs))
            .with_persist_mode(self.persistence.mode);
        config.max_tokens = self.generation.max_tokens;
        config.created_by = self.persistence.created_by.clone();
        Ok(config)
    }

    /// Open the configured backend.
    pub(crate) async fn open_store(&self) -> Result<Arc<dyn TableStore>, ConfigError> {
        let settings = &self.persistence;
        let store: Arc<dyn TableStore> = match settings.backend {
            Backend::None => Arc::new(NullStore),
            Backend::Memory => Arc::new(InMemoryStore::new()),
            Backend::Jsonl => Arc::new(JsonlStore::open(&settings.path).await?),
            Backend::Rest => {
                let url = settings
                    .url
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        ConfigError::Invalid(
                            "persistence.url is required for the rest backend".to_string(),
                        )
                    })?;
                let api_key = std::env::var(STORE_KEY_ENV).ok().filter(|k| !k.is_empty());
                Arc::new(RestStore::new(RestStoreConfig::new(url, api_key)))
            }
        };
        Ok(store)
    }
}
