//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$FEYN_CONFIG` environment variable
//! 2. `~/.config/feyn/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
}

/// Remote model API settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key. `QIANFAN_API_KEY` in the environment takes precedence.
    pub key: Option<String>,
    /// Chat-completions base URL.
    pub base_url: String,
    /// Sampling temperature sent with every request.
    pub temperature: f32,
    /// Per-request timeout. A timeout counts as a switchable failure.
    pub timeout_secs: u64,
}

/// Database storage settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path. Default: platform-specific data dir.
    pub path: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            base_url: feyn_llm::transport::DEFAULT_BASE_URL.to_string(),
            temperature: feyn_llm::transport::DEFAULT_TEMPERATURE,
            timeout_secs: feyn_llm::transport::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}

/// The API key, environment first, config file second.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    if let Ok(key) = std::env::var("QIANFAN_API_KEY") {
        if !key.trim().is_empty() {
            return Some(key);
        }
    }
    config.api.key.clone()
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(p) = std::env::var("FEYN_CONFIG") {
        return Some(PathBuf::from(p));
    }

    // 2. ~/.config/feyn/config.toml
    if let Some(home) = dirs_home() {
        let p = home.join(".config").join("feyn").join("config.toml");
        return Some(p);
    }

    None
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Show the active config path (for `feyn config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api.key.is_none());
        assert!(config.api.base_url.contains("qianfan"));
        assert_eq!(config.api.temperature, 0.7);
        assert_eq!(config.api.timeout_secs, 60);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[api]
key = "bce-v3/test"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.key.as_deref(), Some("bce-v3/test"));
        // Other fields should be defaults
        assert_eq!(config.api.temperature, 0.7);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[api]
key = "bce-v3/test"
base_url = "https://example.test/v2"
temperature = 0.3
timeout_secs = 30

[store]
path = "/tmp/feyn-test.db"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://example.test/v2");
        assert_eq!(config.api.temperature, 0.3);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.store.path.as_deref(), Some("/tmp/feyn-test.db"));
    }
}
