use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct QuillConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one SQLite file per collection.
    pub data_dir: String,
    pub default_collection: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"hash"` (offline, deterministic) or `"http"` (OpenAI-compatible endpoint).
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub api_base: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_quill_dir()
            .join("collections")
            .to_string_lossy()
            .into_owned();
        Self {
            data_dir,
            default_collection: "notes".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".into(),
            model: "hash-v1".into(),
            dimensions: 384,
            api_base: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_k: 5 }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Returns `~/.quill/`, falling back to `./.quill` when no home directory is known.
pub fn default_quill_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quill")
}

/// Returns the default config file path: `~/.quill/config.toml`
pub fn default_config_path() -> PathBuf {
    default_quill_dir().join("config.toml")
}

impl QuillConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            QuillConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (QUILL_DATA_DIR, QUILL_COLLECTION, QUILL_LOG_LEVEL, QUILL_EMBEDDING_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("QUILL_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("QUILL_COLLECTION") {
            self.storage.default_collection = val;
        }
        if let Ok(val) = std::env::var("QUILL_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("QUILL_EMBEDDING_API_KEY") {
            self.embedding.api_key = val;
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be greater than zero"
        );
        anyhow::ensure!(
            self.embedding.timeout_ms > 0,
            "embedding.timeout_ms must be greater than zero"
        );
        anyhow::ensure!(
            self.retrieval.default_k > 0,
            "retrieval.default_k must be greater than zero"
        );
        Ok(())
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
