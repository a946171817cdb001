use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HindsightConfig {
    pub log_level: String,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub default_owner: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub search_limit: usize,
    pub recall_limit: usize,
    pub recall_candidates: usize,
    pub hybrid_alpha: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub recent_window: usize,
}

impl Default for HindsightConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_hindsight_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            default_owner: "default".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            api_key: None,
            dimensions: 768,
            timeout_secs: 30,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: "llama3.1".into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_limit: 10,
            recall_limit: 3,
            recall_candidates: 5,
            hybrid_alpha: 0.5,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { recent_window: 20 }
    }
}

/// Returns `~/.hindsight/`
pub fn default_hindsight_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".hindsight")
}

/// Returns the default config file path: `~/.hindsight/config.toml`
pub fn default_config_path() -> PathBuf {
    default_hindsight_dir().join("config.toml")
}

impl HindsightConfig {
    /// Load the default config file, falling back to defaults when it does
    /// not exist, with env vars applied on top.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Same as [`load`](Self::load) but reading an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            HindsightConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (HINDSIGHT_DB, HINDSIGHT_OWNER,
    /// HINDSIGHT_EMBEDDING_URL, HINDSIGHT_GENERATION_URL, HINDSIGHT_API_KEY,
    /// HINDSIGHT_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HINDSIGHT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HINDSIGHT_OWNER") {
            self.storage.default_owner = val;
        }
        if let Ok(val) = std::env::var("HINDSIGHT_EMBEDDING_URL") {
            self.embedding.base_url = val;
        }
        if let Ok(val) = std::env::var("HINDSIGHT_GENERATION_URL") {
            self.generation.base_url = val;
        }
        if let Ok(val) = std::env::var("HINDSIGHT_API_KEY") {
            self.embedding.api_key = Some(val.clone());
            self.generation.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("HINDSIGHT_LOG_LEVEL") {
            self.log_level = val;
        }
    }

    /// The configured database path with a leading `~` expanded.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
