//! Cross-source aggregation of clusters into comparison results.
//!
//! Only clusters spanning at least two sources become results. Ties in the
//! representative title and the best deal go to the earliest member, which
//! is the earliest listing in dispatch order.

use std::collections::BTreeMap;

use crate::price::{price_stats, round_to_cents, savings_percentage};
use crate::types::{Cluster, ComparisonResult, Listing};

/// Build a [`ComparisonResult`] for every matched cluster, in cluster order.
pub fn aggregate(clusters: &[Cluster]) -> Vec<ComparisonResult> {
    clusters
        .iter()
        .filter(|c| c.is_matched())
        .map(summarize)
        .collect()
}

/// Summarise one cluster regardless of how many sources it spans.
pub fn summarize(cluster: &Cluster) -> ComparisonResult {
    let listings = cluster.listings();

    let mut sources: BTreeMap<String, Vec<Listing>> = BTreeMap::new();
    for listing in listings {
        sources
            .entry(listing.source_id.clone())
            .or_default()
            .push(listing.clone());
    }

    let price_stats = price_stats(listings);
    let savings_percentage = savings_percentage(price_stats.min, price_stats.max);

    ComparisonResult {
        representative_title: representative_title(listings),
        sources,
        savings_percentage,
        best_deal: cheapest(listings).cloned(),
        total_products: listings.len(),
        price_stats,
    }
}

/// Longest raw title; the first of equally long titles wins.
pub fn representative_title(listings: &[Listing]) -> String {
    let mut best: Option<&Listing> = None;
    for listing in listings {
        let longer = best.map_or(true, |b| {
            listing.title.chars().count() > b.title.chars().count()
        });
        if longer {
            best = Some(listing);
        }
    }
    best.map(|l| l.title.clone()).unwrap_or_default()
}

/// Cheapest priced listing; the first of equally cheap listings wins.
pub fn cheapest<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Option<&'a Listing> {
    let mut best: Option<(&Listing, f64)> = None;
    for listing in listings {
        let Some(price) = listing.price else {
            continue;
        };
        if best.map_or(true, |(_, p)| price < p) {
            best = Some((listing, price));
        }
    }
    best.map(|(listing, _)| listing)
}

/// Sum of group savings, rounded to cents.
pub fn total_savings(results: &[ComparisonResult]) -> f64 {
    round_to_cents(results.iter().map(|r| r.price_stats.savings).sum())
}

/// Cheapest deal across the matched groups, or across every listing when
/// nothing matched.
pub fn best_overall_deal(results: &[ComparisonResult], listings: &[Listing]) -> Option<Listing> {
    if results.is_empty() {
        return cheapest(listings).cloned();
    }
    cheapest(results.iter().filter_map(|r| r.best_deal.as_ref())).cloned()
}
