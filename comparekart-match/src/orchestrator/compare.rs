//! Core comparison pipeline: fan-out, normalise, embed, cluster, aggregate.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::adapter::AdapterRegistry;
use crate::config::MatchConfig;
use crate::error::{CompareError, Result};
use crate::features::FeatureExtractor;
use crate::normalize::normalize;
use crate::types::{ComparisonRequest, ComparisonResponse, Listing};

use super::aggregate::{aggregate, best_overall_deal, total_savings};
use super::cluster::{cluster_listings, singletons};
use super::fanout::fan_out;

/// Runs comparison requests against an explicitly supplied set of adapters.
///
/// Holds no per-request state; one comparator can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct Comparator {
    registry: Arc<AdapterRegistry>,
    extractor: FeatureExtractor,
    config: MatchConfig,
}

impl Comparator {
    /// Build a comparator, validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Config`] if `config` is invalid.
    pub fn new(
        registry: Arc<AdapterRegistry>,
        extractor: FeatureExtractor,
        config: MatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            extractor,
            config,
        })
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Run one comparison request.
    ///
    /// # Pipeline
    ///
    /// 1. Validate the request
    /// 2. Fan out to every selected source concurrently
    /// 3. Normalise every title
    /// 4. Embed the normalised titles in one batch (may degrade)
    /// 5. Cluster by similarity to each cluster's seed
    /// 6. Aggregate clusters spanning two or more sources
    ///
    /// Source failures never fail the request; they show up as zero counts
    /// and fault reasons on the response. When every source fails the
    /// response is simply empty.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::InvalidRequest`] for a blank query, a zero
    /// result cap, or an empty source selection.
    pub async fn compare(&self, request: &ComparisonRequest) -> Result<ComparisonResponse> {
        validate_request(request)?;

        let outcome = fan_out(
            &self.registry,
            &request.query,
            &request.source_ids,
            request.max_results_per_source,
            self.config.source_timeout(),
        )
        .await;

        if outcome.all_failed() {
            tracing::warn!(sources = outcome.reports.len(), "every source failed");
        }

        let per_source_counts = outcome.per_source_counts();
        let listings: Vec<Listing> = outcome
            .listings
            .into_iter()
            .map(|listing| Listing {
                normalized_title: normalize(&listing.title),
                ..listing
            })
            .collect();

        let titles: Vec<String> = listings.iter().map(|l| l.normalized_title.clone()).collect();
        let features = self.extractor.extract(&titles).await;

        let clusters = if features.degraded {
            singletons(listings.clone())
        } else {
            cluster_listings(
                listings.iter().cloned().zip(features.vectors).collect(),
                self.config.similarity_threshold,
            )
        };

        let matched_groups = aggregate(&clusters);
        let total_savings = total_savings(&matched_groups);
        let best_overall_deal = best_overall_deal(&matched_groups, &listings);

        tracing::info!(
            listings = listings.len(),
            clusters = clusters.len(),
            matched = matched_groups.len(),
            degraded = features.degraded,
            total_savings,
            "comparison complete"
        );

        Ok(ComparisonResponse {
            query: request.query.clone(),
            listings,
            matched_groups,
            per_source_counts,
            source_reports: outcome.reports,
            total_savings,
            best_overall_deal,
            embeddings_degraded: features.degraded,
        })
    }

    /// Run [`compare`](Self::compare) until it finishes or `cancel` fires.
    ///
    /// Cancellation aborts every in-flight source task and returns no
    /// partial result.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Cancelled`] if `cancel` fires first, or any
    /// error [`compare`](Self::compare) returns.
    pub async fn compare_with_cancellation(
        &self,
        request: &ComparisonRequest,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResponse> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("comparison cancelled by caller");
                Err(CompareError::Cancelled)
            }
            result = self.compare(request) => result,
        }
    }
}

fn validate_request(request: &ComparisonRequest) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(CompareError::InvalidRequest("query must not be blank".into()));
    }
    if request.max_results_per_source == 0 {
        return Err(CompareError::InvalidRequest(
            "max_results_per_source must be greater than 0".into(),
        ));
    }
    if request.source_ids.is_empty() {
        return Err(CompareError::InvalidRequest(
            "at least one source must be selected".into(),
        ));
    }
    Ok(())
}
