
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub ollama: OllamaConfig,
    pub ingest: IngestConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Store file location. Defaults to `<base_dir>/embedix.db` when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub embedding_dimension: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub data_dir: PathBuf,
    /// Extensions matched against directory entries, without the leading dot.
    pub extensions: Vec<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extensions: vec!["txt".to_string(), "jsonl".to_string()],
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No usable configuration directory on this platform")]
    DirectoryError,
    #[error("Cannot build a valid URL from {0:?}")]
    InvalidUrl(String),
    #[error("Port {0} is outside the usable range (1-65535)")]
    InvalidPort(u16),
    #[error("Model name {0:?} is empty or blank")]
    InvalidModel(String),
    #[error("Unsupported protocol {0:?}, only http and https work here")]
    InvalidProtocol(String),
    #[error("Embedding dimension {0} is outside the supported range (64-4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("No input file extensions configured")]
    NoExtensions,
    #[error("Invalid file extension: {0:?} (cannot be empty)")]
    InvalidExtension(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Some(home) = dirs::home_dir() {
            return Ok(home.join(".embedix"));
        }
        #[cfg(windows)]
        if let Some(data) = dirs::data_dir() {
            return Ok(data.join("embedix"));
        }
        Err(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let base_dir = config_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir,
                ..Self::default()
            });
        }

        let raw = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let mut config: Self = toml::from_str(&raw)
            .with_context(|| format!("Malformed config file {}", config_path.display()))?;
        config.base_dir = base_dir;

        config
            .validate()
            .with_context(|| format!("Invalid settings in {}", config_path.display()))?;

        Ok(config)
    }

    /// Load from the default configuration directory (`~/.embedix`).
    #[inline]
    pub fn load_default() -> Result<Self> {
        Self::load(Self::config_dir()?)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Refusing to save an invalid configuration")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let rendered =
            toml::to_string_pretty(self).context("Failed to render configuration as TOML")?;
        let config_path = self.config_file_path();
        fs::write(&config_path, rendered)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Get the path for the vector store file
    #[inline]
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.base_dir.join("embedix.db"))
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.ingest.validate()?;
        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::check_protocol(&self.protocol)?;
        Self::check_port(self.port)?;
        Self::check_model(&self.model)?;
        Self::check_dimension(self.embedding_dimension)?;
        self.ollama_url()?;
        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let endpoint = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&endpoint).map_err(|_| ConfigError::InvalidUrl(endpoint))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        Self::check_protocol(&protocol)?;
        self.protocol = protocol;
        Ok(())
    }

    /// Host changes are checked by building the full endpoint URL, so a host
    /// that only parses together with the current protocol and port is caught.
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let endpoint = format!("{}://{}:{}", self.protocol, host, self.port);
        Url::parse(&endpoint).map_err(|_| ConfigError::InvalidUrl(endpoint))?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        Self::check_port(port)?;
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        Self::check_model(&model)?;
        self.model = model;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        Self::check_dimension(dimension)?;
        self.embedding_dimension = dimension;
        Ok(())
    }

    fn check_protocol(protocol: &str) -> Result<(), ConfigError> {
        if protocol == "http" || protocol == "https" {
            Ok(())
        } else {
            Err(ConfigError::InvalidProtocol(protocol.to_string()))
        }
    }

    fn check_port(port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        Ok(())
    }

    fn check_model(model: &str) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model.to_string()));
        }
        Ok(())
    }

    fn check_dimension(dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        Ok(())
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }

        for ext in &self.extensions {
            if ext.trim_start_matches('.').trim().is_empty() {
                return Err(ConfigError::InvalidExtension(ext.clone()));
            }
        }

        Ok(())
    }

    /// Whether a directory entry matches the configured extension set.
    /// Comparison is case-insensitive and tolerates configured leading dots.
    #[inline]
    pub fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}
