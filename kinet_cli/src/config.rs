use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use kinet_frontend::TokenStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the API, including any `/api` prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Where the bearer token is kept. Defaults to the platform data dir.
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            token_path: None,
        }
    }
}

impl CliConfig {
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("kinet").join("config.toml"),
            None => PathBuf::from(".kinet").join("config.toml"),
        }
    }

    /// Config file (if any) with environment overrides applied.
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::default_path())?;
        Ok(config.with_overrides(|key| env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config in {}", path.display()))
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("KINET_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        match var("KINET_TIMEOUT_SECS").map(|raw| raw.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => self.timeout_secs = secs,
            Some(_) => tracing::warn!("ignoring invalid KINET_TIMEOUT_SECS"),
            None => {}
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token_store(&self) -> TokenStore {
        match &self.token_path {
            Some(path) => TokenStore::new(path.clone()),
            None => TokenStore::new(TokenStore::default_path()),
        }
    }
}

fn default_api_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = \"https://kinet.example/api\"\n").unwrap();
        let config = CliConfig::load_from(&path).unwrap();
        assert_eq!(config.api_url, "https://kinet.example/api");
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn environment_overrides_file() {
        let config = CliConfig::default().with_overrides(|key| match key {
            "KINET_API_URL" => Some("http://other/api".into()),
            "KINET_TIMEOUT_SECS" => Some("30".into()),
            _ => None,
        });
        assert_eq!(config.api_url, "http://other/api");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn bad_timeout_is_ignored() {
        let config = CliConfig::default().with_overrides(|key| {
            (key == "KINET_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.timeout_secs, 15);
    }
}
