// Configuration management module
// TOML-backed settings for the engine, backends, and embedding endpoint

pub mod settings;

pub use settings::{Config, ConfigError, EmbeddingConfig, EngineConfig};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("vectorkeep"))
        .ok_or(ConfigError::DirectoryError)
}
