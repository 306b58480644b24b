//! Builds the embedding and query-parse backends named in [`AppConfig`].
//!
//! A missing API key is not fatal: the affected feature is switched off with
//! a warning and the service keeps running (comparisons become degraded,
//! query parsing falls back to the raw query).

pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use comparekart_match::{FeatureExtractor, LexicalEmbedder, QueryParser};

use crate::config::{AppConfig, EmbeddingProvider, SecretRef};
use crate::error::Result;

use self::openai::{OpenAiConfig, OpenAiEmbeddingBackend, OpenAiQueryBackend};

/// Resolve a key, turning absence or a missing env var into `None`.
fn resolve_key(feature: &str, key: &SecretRef) -> Option<String> {
    match key.resolve() {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            tracing::warn!(feature, "no API key configured, feature disabled");
            None
        }
        Err(e) => {
            tracing::warn!(feature, error = %e, "API key unavailable, feature disabled");
            None
        }
    }
}

/// Build the feature extractor selected by `config.embedding.provider`.
///
/// # Errors
///
/// Returns an error only if an HTTP client cannot be constructed.
pub fn build_feature_extractor(config: &AppConfig) -> Result<FeatureExtractor> {
    let dimensions = config.matching.embedding_dimensions;
    let embedding = &config.embedding;

    match embedding.provider {
        EmbeddingProvider::Disabled => {
            tracing::info!("embeddings disabled; comparisons will not match across sources");
            Ok(FeatureExtractor::disabled(dimensions))
        }
        EmbeddingProvider::Lexical => {
            let backend = LexicalEmbedder::new(embedding.lexical_dimensions);
            Ok(FeatureExtractor::new(
                Arc::new(backend),
                embedding.lexical_dimensions,
            ))
        }
        EmbeddingProvider::OpenAi => {
            let Some(api_key) = resolve_key("embedding", &embedding.api_key) else {
                return Ok(FeatureExtractor::disabled(dimensions));
            };
            let openai = OpenAiConfig::new(api_key, &embedding.api_model)
                .with_base_url(&embedding.api_url)
                .with_timeout(Duration::from_secs(embedding.timeout_seconds));
            let backend = OpenAiEmbeddingBackend::new(openai)?;
            Ok(FeatureExtractor::new(Arc::new(backend), dimensions))
        }
    }
}

/// Build the query parser described by `config.query_parser`.
///
/// # Errors
///
/// Returns an error only if an HTTP client cannot be constructed.
pub fn build_query_parser(config: &AppConfig) -> Result<QueryParser> {
    let parser = &config.query_parser;
    if !parser.enabled {
        return Ok(QueryParser::disabled());
    }
    let Some(api_key) = resolve_key("query_parser", &parser.api_key) else {
        return Ok(QueryParser::disabled());
    };

    let openai = OpenAiConfig::new(api_key, &parser.api_model)
        .with_base_url(&parser.api_url)
        .with_timeout(Duration::from_secs(parser.timeout_seconds))
        .with_temperature(parser.temperature);
    Ok(QueryParser::new(Arc::new(OpenAiQueryBackend::new(openai)?)))
}
