// Configuration management module
// Handles TOML settings plus the environment overrides recognized at startup

pub mod settings;

pub use settings::{
    CacheSettings, Config, ConfigError, EmbeddingConfig, GenerationConfig, RetrievalConfig,
};
