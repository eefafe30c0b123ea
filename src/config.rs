use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Engine configuration, loadable from ~/.mnemo/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub providers: ProviderConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Retention sweep policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Entries older than this many days become sweep candidates
    pub retention_days: u32,
    /// Entries at or above this importance are never swept
    pub min_importance: f64,
    /// Entries at or above this access count are never swept
    pub min_access_count: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: 90,
            min_importance: 0.3,
            min_access_count: 2,
        }
    }
}

/// External provider call settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Bounded timeout applied to every provider call, in seconds
    pub timeout_secs: u64,
    /// Embedding vector dimension
    pub embedding_dim: usize,
    /// Remote embedding service endpoint, if used
    pub embedding_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            embedding_dim: 768,
            embedding_url: None,
        }
    }
}

/// Search and ranking thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum similarity for a search hit to be kept
    pub similarity_floor: f64,
    /// Relevance at which an existing memory suppresses a near-duplicate store
    pub dedup_threshold: f64,
    /// Nearest same-user neighbors bumped after each store
    pub neighbor_fanout: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.3,
            dedup_threshold: 0.8,
            neighbor_fanout: 5,
        }
    }
}

impl MemoryConfig {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = MemoryConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: MemoryConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".mnemo").join("config.toml"))
    }

    /// Provider timeout as a Duration
    pub fn provider_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.providers.timeout_secs)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            retention: RetentionConfig::default(),
            providers: ProviderConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.retention.retention_days, 90);
        assert_eq!(config.providers.timeout_secs, 10);
        assert_eq!(config.providers.embedding_dim, 768);
        assert_eq!(config.retrieval.similarity_floor, 0.3);
        assert_eq!(config.retrieval.neighbor_fanout, 5);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = MemoryConfig::default();
        config.retention.retention_days = 30;
        config.providers.embedding_url = Some("http://localhost:9090/embed".to_string());

        let toml_string = toml::to_string(&config).unwrap();
        assert!(toml_string.contains("retention_days = 30"));

        let deserialized: MemoryConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized.retention.retention_days, 30);
        assert_eq!(
            deserialized.providers.embedding_url.as_deref(),
            Some("http://localhost:9090/embed")
        );
    }

    #[test]
    fn test_partial_config_parses() {
        let config: MemoryConfig = toml::from_str("[retention]\nretention_days = 7\nmin_importance = 0.3\nmin_access_count = 2\n").unwrap();
        assert_eq!(config.retention.retention_days, 7);
        // Missing sections fall back to defaults
        assert_eq!(config.providers.timeout_secs, 10);
    }
}
