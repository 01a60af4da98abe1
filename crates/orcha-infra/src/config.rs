//! Engine configuration loader.
//!
//! Reads `config.toml` and deserializes it into [`EngineConfig`]. Falls back
//! to defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use orcha_types::config::EngineConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ORCHA_CONFIG";

/// Resolve the config file location.
///
/// Priority:
/// 1. `ORCHA_CONFIG` environment variable
/// 2. `~/.orcha/config.toml`
/// 3. `.orcha/config.toml` relative to the working directory
pub fn resolve_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".orcha").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".orcha").join("config.toml"))
}

/// Load configuration from `path`.
///
/// - Missing file: [`EngineConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_engine_config(path: &Path) -> EngineConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            EngineConfig::default()
        }
    }
}
