//! Price comparison service: the entry point hosts call.
//!
//! Wraps a [`Comparator`] with source selection by category, single-source
//! search, and natural-language query parsing, all configured from one
//! [`AppConfig`].

use std::collections::BTreeMap;
use std::sync::Arc;

use comparekart_match::adapter::source_key;
use comparekart_match::normalize::normalize;
use comparekart_match::orchestrator::fanout::fan_out;
use comparekart_match::{
    AdapterRegistry, CompareError, Comparator, ComparisonRequest, ComparisonResponse, Listing,
    QueryFilter, QueryParser,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::categories::{CategoryConfig, SourceSelection, resolve_sources};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::providers::{build_feature_extractor, build_query_parser};

/// A registered source and the categories that list it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub id: String,
    pub categories: Vec<String>,
}

/// Long-lived comparison service. Cheap to clone; clones share adapters.
#[derive(Debug, Clone)]
pub struct PriceComparisonService {
    comparator: Comparator,
    parser: QueryParser,
    categories: BTreeMap<String, CategoryConfig>,
}

impl PriceComparisonService {
    /// Build the service from `config` and the adapters in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if `config` is invalid, or an error if a
    /// backend HTTP client cannot be built.
    pub fn new(config: &AppConfig, registry: AdapterRegistry) -> Result<Self> {
        config.validate()?;

        let extractor = build_feature_extractor(config)?;
        let parser = build_query_parser(config)?;
        let comparator = Comparator::new(Arc::new(registry), extractor, config.matching.clone())?;

        tracing::info!(
            sources = comparator.registry().len(),
            categories = config.categories.len(),
            embeddings = config.embedding.provider.as_str(),
            "price comparison service ready"
        );

        Ok(Self {
            comparator,
            parser,
            categories: config.categories.clone(),
        })
    }

    /// Replace the query parser, e.g. with a custom backend.
    pub fn with_query_parser(mut self, parser: QueryParser) -> Self {
        self.parser = parser;
        self
    }

    /// Compare prices for `query` across the selected sources.
    ///
    /// `max_results` defaults to the configured per-source cap.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoSources`] if the selection resolves to no
    /// registered source, or any request validation error.
    pub async fn compare(
        &self,
        query: &str,
        selection: &SourceSelection,
        max_results: Option<usize>,
    ) -> Result<ComparisonResponse> {
        let request = self.request(query, selection, max_results)?;
        Ok(self.comparator.compare(&request).await?)
    }

    /// [`compare`](Self::compare), abandoned as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`compare`](Self::compare), plus [`CompareError::Cancelled`].
    pub async fn compare_with_cancellation(
        &self,
        query: &str,
        selection: &SourceSelection,
        max_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResponse> {
        let request = self.request(query, selection, max_results)?;
        Ok(self
            .comparator
            .compare_with_cancellation(&request, cancel)
            .await?)
    }

    /// Search a single source without matching.
    ///
    /// Listings are capped, sanitised, tagged with the source id, and carry
    /// their normalised titles.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownSource`] for an unregistered source,
    /// [`AppError::Source`] if the adapter fails or times out, or
    /// [`CompareError::InvalidRequest`] for a blank query.
    pub async fn search_source(
        &self,
        source_id: &str,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<Listing>> {
        let source_id = source_key(source_id);
        if !self.comparator.registry().contains(&source_id) {
            return Err(AppError::UnknownSource(source_id));
        }
        if query.trim().is_empty() {
            return Err(CompareError::InvalidRequest("query must not be blank".into()).into());
        }

        let max_results = max_results.unwrap_or(self.comparator.config().max_results_per_source);
        let outcome = fan_out(
            self.comparator.registry(),
            query,
            std::slice::from_ref(&source_id),
            max_results,
            self.comparator.config().source_timeout(),
        )
        .await;

        if let Some(reason) = outcome.reports.first().and_then(|r| r.fault.clone()) {
            return Err(AppError::Source { source_id, reason });
        }

        Ok(outcome
            .listings
            .into_iter()
            .map(|listing| Listing {
                normalized_title: normalize(&listing.title),
                ..listing
            })
            .collect())
    }

    /// Registered sources, sorted, each with the categories that list it.
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.comparator
            .registry()
            .ids()
            .into_iter()
            .map(|id| {
                let categories = self
                    .categories
                    .iter()
                    .filter(|(_, c)| c.sources.iter().any(|s| s.eq_ignore_ascii_case(&id)))
                    .map(|(key, _)| key.clone())
                    .collect();
                SourceInfo { id, categories }
            })
            .collect()
    }

    /// The configured category table.
    pub fn categories(&self) -> &BTreeMap<String, CategoryConfig> {
        &self.categories
    }

    /// Turn free text into structured filters. Never fails.
    pub async fn parse_query(&self, text: &str) -> QueryFilter {
        self.parser.parse(text).await
    }

    fn request(
        &self,
        query: &str,
        selection: &SourceSelection,
        max_results: Option<usize>,
    ) -> Result<ComparisonRequest> {
        let sources = resolve_sources(selection, &self.categories, self.comparator.registry())?;
        let max_results = max_results.unwrap_or(self.comparator.config().max_results_per_source);
        Ok(ComparisonRequest::new(query, sources, max_results))
    }
}
