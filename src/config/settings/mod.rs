
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;

/// Prefix for all recognized environment overrides.
const ENV_PREFIX: &str = "PARISH_RAG_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Model identifier including its revision tag. Participates in cache key
    /// derivation so a model change invalidates old entries on its own.
    pub model: String,
    pub dimension: u32,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            protocol: "https".to_string(),
            host: "api.openai.com".to_string(),
            port: 443,
            model: "text-embedding-3-small".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            protocol: "https".to_string(),
            host: "api.openai.com".to_string(),
            port: 443,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_tokens: 800,
        }
    }
}

/// Cache feature flag and per-namespace TTL defaults, read once at startup
/// and passed down by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub embedding_ttl_secs: i64,
    pub answer_ttl_secs: i64,
    pub token_ttl_secs: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            embedding_ttl_secs: 6 * 60 * 60,
            answer_ttl_secs: 30 * 60,
            token_ttl_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_similarity: f32,
    pub max_context_chars: usize,
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: 0.25,
            max_context_chars: 6000,
            max_results: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid TTL: {0} (must not be negative)")]
    InvalidTtl(i64),
    #[error("Invalid similarity threshold: {0} (must be between -1.0 and 1.0)")]
    InvalidSimilarityThreshold(f32),
    #[error("Invalid max context chars: {0} (must be between 100 and 100000)")]
    InvalidMaxContextChars(usize),
    #[error("Invalid max results: {0} (must be between 1 and 50)")]
    InvalidMaxResults(usize),
    #[error("Invalid top k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid value for {0}: {1}")]
    InvalidEnvValue(String, String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            let mut config: Config = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;
            config.base_dir = config_dir.as_ref().to_path_buf();
            config
        } else {
            Self {
                embedding: EmbeddingConfig::default(),
                generation: GenerationConfig::default(),
                cache: CacheSettings::default(),
                retrieval: RetrievalConfig::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            }
        };

        config.apply_env_overrides()?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Apply the recognized `PARISH_RAG_*` environment overrides on top of
    /// whatever the TOML file provided.
    #[inline]
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Override application with an injected lookup, so tests can exercise the
    /// override path without mutating process environment.
    #[inline]
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
            raw.parse()
                .map_err(|_| ConfigError::InvalidEnvValue(name.to_string(), raw.to_string()))
        }

        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        if let Some(raw) = var("CACHE_ENABLED") {
            self.cache.enabled = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnvValue(
                        format!("{}CACHE_ENABLED", ENV_PREFIX),
                        raw,
                    ));
                }
            };
        }
        if let Some(raw) = var("EMBEDDING_TTL_SECS") {
            self.cache.embedding_ttl_secs = parse("EMBEDDING_TTL_SECS", &raw)?;
        }
        if let Some(raw) = var("ANSWER_TTL_SECS") {
            self.cache.answer_ttl_secs = parse("ANSWER_TTL_SECS", &raw)?;
        }
        if let Some(raw) = var("TOKEN_TTL_SECS") {
            self.cache.token_ttl_secs = parse("TOKEN_TTL_SECS", &raw)?;
        }
        if let Some(raw) = var("MIN_SIMILARITY") {
            self.retrieval.min_similarity = parse("MIN_SIMILARITY", &raw)?;
        }
        if let Some(raw) = var("MAX_CONTEXT_CHARS") {
            self.retrieval.max_context_chars = parse("MAX_CONTEXT_CHARS", &raw)?;
        }
        if let Some(raw) = var("MAX_RESULTS") {
            self.retrieval.max_results = parse("MAX_RESULTS", &raw)?;
        }
        if let Some(raw) = var("EMBEDDING_MODEL") {
            if raw.trim().is_empty() {
                return Err(ConfigError::InvalidModel(raw));
            }
            self.embedding.model = raw;
        }

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.generation.validate()?;
        self.cache.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }
}

fn endpoint_url(protocol: &str, host: &str, port: u16) -> Result<Url, ConfigError> {
    let url_str = format!("{}://{}:{}", protocol, host, port);
    Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
}

fn validate_endpoint(protocol: &str, host: &str, port: u16) -> Result<(), ConfigError> {
    if protocol != "http" && protocol != "https" {
        return Err(ConfigError::InvalidProtocol(protocol.to_string()));
    }
    if port == 0 {
        return Err(ConfigError::InvalidPort(port));
    }
    endpoint_url(protocol, host, port)?;
    Ok(())
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.protocol, &self.host, self.port)?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(64..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        Ok(())
    }

    #[inline]
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        endpoint_url(&self.protocol, &self.host, self.port)
    }
}

impl GenerationConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.protocol, &self.host, self.port)?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        Ok(())
    }

    #[inline]
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        endpoint_url(&self.protocol, &self.host, self.port)
    }
}

impl CacheSettings {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        for ttl in [
            self.embedding_ttl_secs,
            self.answer_ttl_secs,
            self.token_ttl_secs,
        ] {
            if ttl < 0 {
                return Err(ConfigError::InvalidTtl(ttl));
            }
        }
        Ok(())
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.min_similarity) {
            return Err(ConfigError::InvalidSimilarityThreshold(
                self.min_similarity,
            ));
        }

        if !(100..=100_000).contains(&self.max_context_chars) {
            return Err(ConfigError::InvalidMaxContextChars(self.max_context_chars));
        }

        if !(1..=50).contains(&self.max_results) {
            return Err(ConfigError::InvalidMaxResults(self.max_results));
        }

        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        Ok(())
    }
}
