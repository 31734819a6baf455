//! TOML configuration for the server and its external services.
//!
//! A missing config file is not an error: every field has a default, and
//! unconfigured services degrade to no-ops (canned diaries, no semantic
//! retrieval, bundled artwork).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One OpenAI-compatible endpoint. The API key may come from the
/// `LINKPET_API_KEY` environment variable instead of the file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

impl EndpointConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.model.is_empty()
    }

    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("LINKPET_API_KEY").unwrap_or_default()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "linkpet.db".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub chat: EndpointConfig,
    pub embedding: EndpointConfig,
    pub image: EndpointConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds between background sweeps while serving.
    pub tick_interval_secs: u64,
    /// Fixed RNG seed, for reproducible simulations.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub services: ServicesConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load from a TOML file, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config =
            toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/linkpet.toml")).unwrap();
        assert_eq!(config.database.path, "linkpet.db");
        assert_eq!(config.simulation.tick_interval_secs, 60);
        assert_eq!(config.simulation.seed, None);
        assert!(!config.services.chat.is_configured());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[database]\npath = \"pets.db\"\n\n\
             [services.chat]\nendpoint = \"https://llm.example/v1\"\nmodel = \"gpt-x\"\n\n\
             [simulation]\nseed = 42"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database.path, "pets.db");
        assert!(config.services.chat.is_configured());
        assert!(config.services.chat.api_key.is_empty());
        assert!(!config.services.embedding.is_configured());
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.tick_interval_secs, 60);
    }

    #[test]
    fn test_invalid_toml_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database\npath = 3").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
