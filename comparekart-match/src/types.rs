//! Core types for listings, clusters, and comparison results.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::SourceFault;

/// One product offer from one source.
///
/// Adapters fill in everything except `source_id` and `normalized_title`;
/// the orchestrator tags the source and the pipeline normalises the title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Title exactly as the source displayed it.
    pub title: String,
    /// Cleaned title used for similarity comparison.
    #[serde(default)]
    pub normalized_title: String,
    /// Currency-agnostic price. Never negative.
    pub price: Option<f64>,
    /// Currency code or symbol as reported by the source.
    #[serde(default)]
    pub currency: String,
    /// Identifier of the source that returned this listing.
    #[serde(default)]
    pub source_id: String,
    /// Product page URL.
    #[serde(default)]
    pub url: String,
    /// Product image URL, if any.
    pub image_url: Option<String>,
    /// Average rating on a 0–5 scale.
    pub rating: Option<f32>,
    /// Free-form source-specific attributes.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Listing {
    /// Create a listing with only a title set.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            normalized_title: String::new(),
            price: None,
            currency: String::new(),
            source_id: String::new(),
            url: String::new(),
            image_url: None,
            rating: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the product URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Set the rating.
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Set the source id.
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether the title carries any non-whitespace text.
    pub fn has_usable_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Clear values that violate the listing invariants.
    ///
    /// A negative or non-finite price and a rating outside 0–5 are replaced
    /// with `None`.
    pub fn sanitize(mut self) -> Self {
        if matches!(self.price, Some(p) if !p.is_finite() || p < 0.0) {
            self.price = None;
        }
        if matches!(self.rating, Some(r) if !r.is_finite() || !(0.0..=5.0).contains(&r)) {
            self.rating = None;
        }
        self
    }
}

/// A non-empty set of listings believed to be the same product.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    listings: Vec<Listing>,
}

impl Cluster {
    /// Start a cluster from its seed listing.
    pub fn seeded(seed: Listing) -> Self {
        Self {
            listings: vec![seed],
        }
    }

    /// Add a member.
    pub fn push(&mut self, listing: Listing) {
        self.listings.push(listing);
    }

    /// Members in the order they joined; the seed is first.
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Always false; a cluster holds at least its seed.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Number of distinct sources among the members.
    pub fn distinct_sources(&self) -> usize {
        self.listings
            .iter()
            .map(|l| l.source_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// A matched group spans at least two distinct sources.
    pub fn is_matched(&self) -> bool {
        self.distinct_sources() >= 2
    }
}

/// Price statistics over the priced members of a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    /// `max - min`, or 0 when no member has a price.
    pub savings: f64,
}

/// Public view of one matched group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Longest raw title among the members.
    pub representative_title: String,
    /// Members grouped by source id.
    pub sources: BTreeMap<String, Vec<Listing>>,
    pub price_stats: PriceStats,
    /// `(max - min) / max * 100` for this group.
    pub savings_percentage: f64,
    /// Cheapest member, if any member has a price.
    pub best_deal: Option<Listing>,
    /// Number of members in the group.
    pub total_products: usize,
}

/// What the caller asks the core to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub query: String,
    /// Sources to query, in dispatch order.
    pub source_ids: Vec<String>,
    pub max_results_per_source: usize,
}

impl ComparisonRequest {
    /// Build a request.
    pub fn new(
        query: impl Into<String>,
        source_ids: impl IntoIterator<Item = impl Into<String>>,
        max_results_per_source: usize,
    ) -> Self {
        Self {
            query: query.into(),
            source_ids: source_ids.into_iter().map(Into::into).collect(),
            max_results_per_source,
        }
    }
}

/// Outcome for one source in a fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: String,
    /// Listings kept from this source (0 on failure).
    pub count: usize,
    /// Why the source produced nothing, if it failed.
    pub fault: Option<String>,
}

impl SourceReport {
    pub(crate) fn succeeded(source_id: &str, count: usize) -> Self {
        Self {
            source_id: source_id.to_owned(),
            count,
            fault: None,
        }
    }

    pub(crate) fn failed(source_id: &str, fault: &SourceFault) -> Self {
        Self {
            source_id: source_id.to_owned(),
            count: 0,
            fault: Some(fault.to_string()),
        }
    }

    /// Whether the source failed rather than returning zero results.
    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

/// Everything the core produces for one comparison request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResponse {
    pub query: String,
    /// Every listing from every source, in dispatch order.
    pub listings: Vec<Listing>,
    /// Groups spanning at least two sources.
    pub matched_groups: Vec<ComparisonResult>,
    /// Listing count per queried source, zero included.
    pub per_source_counts: BTreeMap<String, usize>,
    /// Per-source outcomes in dispatch order.
    pub source_reports: Vec<SourceReport>,
    /// Sum of group savings, rounded to cents.
    pub total_savings: f64,
    /// Cheapest deal among the matched groups, or among all listings when
    /// nothing matched.
    pub best_overall_deal: Option<Listing>,
    /// True when features fell back to zero vectors; no groups can form.
    pub embeddings_degraded: bool,
}
