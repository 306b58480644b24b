//! Configuration types for the price comparison service.

use comparekart_match::MatchConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::categories::{CategoryConfig, default_categories};
use crate::error::{AppError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Matching engine settings.
    pub matching: MatchConfig,
    /// Title embedding provider settings.
    pub embedding: EmbeddingConfig,
    /// Natural-language query parser settings.
    pub query_parser: QueryParserConfig,
    /// Log filter settings.
    pub logging: LoggingConfig,
    /// Named groups of sources, keyed by category id.
    pub categories: BTreeMap<String, CategoryConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            embedding: EmbeddingConfig::default(),
            query_parser: QueryParserConfig::default(),
            logging: LoggingConfig::default(),
            categories: default_categories(),
        }
    }
}

/// Where an API key comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretRef {
    /// No API key.
    #[default]
    None,
    /// Inline literal key (discouraged; prefer `env`).
    Literal { value: String },
    /// Read the key from an environment variable.
    Env { var: String },
}

impl SecretRef {
    /// Resolve to the key value, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the referenced environment variable
    /// is missing or empty.
    pub fn resolve(&self) -> Result<Option<String>> {
        match self {
            Self::None => Ok(None),
            Self::Literal { value } => Ok(Some(value.clone())),
            Self::Env { var } => {
                let value = std::env::var(var)
                    .map_err(|_| AppError::Config(format!("secret env var is missing: {var}")))?;
                if value.trim().is_empty() {
                    return Err(AppError::Config(format!("secret env var is empty: {var}")));
                }
                Ok(Some(value))
            }
        }
    }
}

fn default_api_key() -> SecretRef {
    SecretRef::Env {
        var: "OPENROUTER_API_KEY".into(),
    }
}

const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1";

/// Which embedding provider to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint.
    #[default]
    OpenAi,
    /// Local hashed bag-of-words vectors; no network.
    Lexical,
    /// No embeddings; every request runs degraded.
    Disabled,
}

impl EmbeddingProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Lexical => "lexical",
            Self::Disabled => "disabled",
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Base URL of the OpenAI-compatible API.
    pub api_url: String,
    pub api_model: String,
    pub api_key: SecretRef,
    /// HTTP timeout for one batched embedding call.
    pub timeout_seconds: u64,
    /// Bucket count for the lexical provider.
    pub lexical_dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            api_url: DEFAULT_API_URL.into(),
            api_model: "text-embedding-3-small".into(),
            api_key: default_api_key(),
            timeout_seconds: 30,
            lexical_dimensions: 512,
        }
    }
}

/// Query parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParserConfig {
    /// When false, every query parses to the fallback filter.
    pub enabled: bool,
    pub api_url: String,
    pub api_model: String,
    pub api_key: SecretRef,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for QueryParserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: DEFAULT_API_URL.into(),
            api_model: "openai/gpt-3.5-turbo".into(),
            api_key: default_api_key(),
            temperature: 0.1,
            timeout_seconds: 30,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directives, overridden by `RUST_LOG` when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "comparekart=info,comparekart_match=info,reqwest=warn,hyper=warn".into(),
        }
    }
}

impl AppConfig {
    /// Load a TOML config file and validate it.
    ///
    /// Missing sections and fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the file cannot be read, or
    /// [`AppError::Config`] naming the file if it does not parse or fails
    /// [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        config
            .validate()
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise return the defaults.
    ///
    /// # Errors
    ///
    /// As [`from_file`](Self::from_file) for an existing file.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate, then write as TOML, creating parent directories as needed.
    ///
    /// An invalid config is never written.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the config cannot be serialized,
    /// or the file cannot be written.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file: `$COMPAREKART_CONFIG_DIR/config.toml`, else
    /// `<platform config dir>/comparekart/config.toml`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.matching
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.embedding.provider == EmbeddingProvider::OpenAi {
            validate_api_url("embedding.api_url", &self.embedding.api_url)?;
            if self.embedding.timeout_seconds == 0 {
                return Err(AppError::Config(
                    "embedding.timeout_seconds must be greater than 0".into(),
                ));
            }
        }
        if self.embedding.provider == EmbeddingProvider::Lexical
            && self.embedding.lexical_dimensions == 0
        {
            return Err(AppError::Config(
                "embedding.lexical_dimensions must be greater than 0".into(),
            ));
        }

        if self.query_parser.enabled {
            validate_api_url("query_parser.api_url", &self.query_parser.api_url)?;
            if !(0.0..=2.0).contains(&self.query_parser.temperature) {
                return Err(AppError::Config(
                    "query_parser.temperature must be in [0, 2]".into(),
                ));
            }
            if self.query_parser.timeout_seconds == 0 {
                return Err(AppError::Config(
                    "query_parser.timeout_seconds must be greater than 0".into(),
                ));
            }
        }

        for (id, category) in &self.categories {
            if category.sources.is_empty() {
                return Err(AppError::Config(format!(
                    "category '{id}' must list at least one source"
                )));
            }
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("COMPAREKART_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join("comparekart"))
        .unwrap_or_else(|| PathBuf::from(".comparekart"))
}

fn validate_api_url(field: &str, raw: &str) -> Result<()> {
    let url = url::Url::parse(raw).map_err(|e| AppError::Config(format!("{field} is invalid: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!("{field} must use http or https")));
    }
    Ok(())
}
