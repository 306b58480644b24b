//! Concurrent fan-out to source adapters.
//!
//! Every selected adapter runs as its own tokio task under its own timeout.
//! A failing, slow, or panicking adapter yields an empty result and a
//! recorded fault for that source only; siblings are never affected.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use tokio_util::task::AbortOnDropHandle;

use crate::adapter::{AdapterRegistry, source_key};
use crate::error::SourceFault;
use crate::types::{Listing, SourceReport};

/// Merged output of one fan-out.
#[derive(Debug, Clone, Default)]
pub struct FanOutOutcome {
    /// Tagged listings in dispatch order, then adapter order.
    pub listings: Vec<Listing>,
    /// One report per dispatched source, in dispatch order.
    pub reports: Vec<SourceReport>,
}

impl FanOutOutcome {
    /// Listing count per source, zero for failed sources.
    pub fn per_source_counts(&self) -> BTreeMap<String, usize> {
        self.reports
            .iter()
            .map(|r| (r.source_id.clone(), r.count))
            .collect()
    }

    /// True when every dispatched source failed.
    pub fn all_failed(&self) -> bool {
        !self.reports.is_empty() && self.reports.iter().all(SourceReport::is_fault)
    }
}

type SourceTask = AbortOnDropHandle<Result<Vec<Listing>, SourceFault>>;

/// Query every source in `source_ids` concurrently and merge the results.
///
/// # Pipeline
///
/// 1. Canonicalise ids (trimmed, lower-case) and drop repeats; the first
///    occurrence keeps its position
/// 2. Spawn one task per known source, bounded by the adapter's own timeout
///    or `default_timeout`
/// 3. Await the tasks in dispatch order; they run concurrently, so the total
///    wait is the slowest adapter, not the sum
/// 4. Convert errors, timeouts and panics into per-source faults
/// 5. Cap, sanitise and tag each adapter's listings with its source id
///
/// Dropping the returned future aborts every task still in flight.
pub async fn fan_out(
    registry: &AdapterRegistry,
    query: &str,
    source_ids: &[String],
    max_results: usize,
    default_timeout: Duration,
) -> FanOutOutcome {
    tracing::trace!(query, sources = source_ids.len(), "fan-out starting");

    let mut seen = HashSet::new();
    let tasks: Vec<(String, Option<SourceTask>)> = source_ids
        .iter()
        .map(|id| source_key(id))
        .filter(|id| seen.insert(id.clone()))
        .map(|source_id| {
            let task = registry.get(&source_id).map(|adapter| {
                let query = query.to_owned();
                let limit = adapter.timeout().unwrap_or(default_timeout);
                AbortOnDropHandle::new(tokio::spawn(async move {
                    match tokio::time::timeout(limit, adapter.search(&query, max_results)).await {
                        Ok(result) => result,
                        Err(_) => Err(SourceFault::Timeout(limit)),
                    }
                }))
            });
            (source_id, task)
        })
        .collect();

    let mut outcome = FanOutOutcome::default();

    for (source_id, task) in tasks {
        let result = match task {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(SourceFault::Panicked(join_err.to_string())),
            },
            None => Err(SourceFault::UnknownSource),
        };

        match result {
            Ok(listings) => {
                let listings = prepare_listings(&source_id, listings, max_results);
                let count = listings.len();
                tracing::info!(source = %source_id, count, "source returned listings");
                outcome.reports.push(SourceReport::succeeded(&source_id, count));
                outcome.listings.extend(listings);
            }
            Err(fault) => {
                tracing::warn!(source = %source_id, count = 0, error = %fault, "source query failed");
                outcome.reports.push(SourceReport::failed(&source_id, &fault));
            }
        }
    }

    outcome
}

/// Cap, drop untitled listings, clear invalid values, and tag the source.
fn prepare_listings(source_id: &str, listings: Vec<Listing>, max_results: usize) -> Vec<Listing> {
    let received = listings.len();
    let prepared: Vec<Listing> = listings
        .into_iter()
        .filter(Listing::has_usable_title)
        .take(max_results)
        .map(|listing| Listing {
            source_id: source_id.to_owned(),
            ..listing.sanitize()
        })
        .collect();

    if prepared.len() < received.min(max_results) {
        tracing::debug!(
            source = %source_id,
            dropped = received.min(max_results) - prepared.len(),
            "dropped listings without a usable title"
        );
    }
    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SourceAdapter;
    use async_trait::async_trait;
    use std::sync::Arc;

    enum Behaviour {
        Return(Vec<Listing>),
        Fail,
        Sleep(Duration),
        Panic,
    }

    struct TestAdapter {
        behaviour: Behaviour,
        timeout: Option<Duration>,
    }

    #[async_trait]
    impl SourceAdapter for TestAdapter {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<Listing>, SourceFault> {
            match &self.behaviour {
                Behaviour::Return(listings) => Ok(listings.clone()),
                Behaviour::Fail => Err(SourceFault::Blocked("HTTP 429".into())),
                Behaviour::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(vec![Listing::new("late")])
                }
                Behaviour::Panic => panic!("adapter exploded"),
            }
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }
    }

    fn adapter(behaviour: Behaviour) -> Arc<dyn SourceAdapter> {
        Arc::new(TestAdapter {
            behaviour,
            timeout: None,
        })
    }

    fn titles(items: &[&str]) -> Vec<Listing> {
        items.iter().map(|t| Listing::new(*t).with_price(10.0)).collect()
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn listings_are_tagged_and_ordered_by_dispatch() {
        let registry = AdapterRegistry::new()
            .with("b", adapter(Behaviour::Return(titles(&["b1", "b2"]))))
            .with("a", adapter(Behaviour::Return(titles(&["a1"]))));

        let outcome = fan_out(&registry, "q", &ids(&["b", "a"]), 5, Duration::from_secs(1)).await;

        let order: Vec<(&str, &str)> = outcome
            .listings
            .iter()
            .map(|l| (l.source_id.as_str(), l.title.as_str()))
            .collect();
        assert_eq!(order, vec![("b", "b1"), ("b", "b2"), ("a", "a1")]);
        assert_eq!(outcome.reports[0].source_id, "b");
    }

    #[tokio::test]
    async fn failure_is_isolated_and_counted_as_zero() {
        let registry = AdapterRegistry::new()
            .with("ok", adapter(Behaviour::Return(titles(&["x"]))))
            .with("bad", adapter(Behaviour::Fail));

        let outcome = fan_out(&registry, "q", &ids(&["ok", "bad"]), 5, Duration::from_secs(1)).await;

        assert_eq!(outcome.listings.len(), 1);
        let counts = outcome.per_source_counts();
        assert_eq!(counts.get("ok"), Some(&1));
        assert_eq!(counts.get("bad"), Some(&0));
        assert_eq!(outcome.reports[1].fault.as_deref(), Some("blocked: HTTP 429"));
        assert!(!outcome.all_failed());
    }

    #[tokio::test]
    async fn slow_adapter_times_out_with_default() {
        let registry = AdapterRegistry::new()
            .with("slow", adapter(Behaviour::Sleep(Duration::from_secs(30))));

        let outcome = fan_out(&registry, "q", &ids(&["slow"]), 5, Duration::from_millis(50)).await;

        assert!(outcome.listings.is_empty());
        assert_eq!(outcome.reports[0].fault.as_deref(), Some("timed out after 50ms"));
        assert!(outcome.all_failed());
    }

    #[tokio::test]
    async fn adapter_declared_timeout_wins() {
        let slow = Arc::new(TestAdapter {
            behaviour: Behaviour::Sleep(Duration::from_secs(30)),
            timeout: Some(Duration::from_millis(20)),
        });
        let registry = AdapterRegistry::new().with("slow", slow);

        let outcome = fan_out(&registry, "q", &ids(&["slow"]), 5, Duration::from_secs(60)).await;

        assert_eq!(outcome.reports[0].fault.as_deref(), Some("timed out after 20ms"));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let registry = AdapterRegistry::new()
            .with("boom", adapter(Behaviour::Panic))
            .with("ok", adapter(Behaviour::Return(titles(&["x"]))));

        let outcome = fan_out(&registry, "q", &ids(&["boom", "ok"]), 5, Duration::from_secs(1)).await;

        assert_eq!(outcome.listings.len(), 1);
        let fault = outcome.reports[0].fault.as_deref().unwrap_or_default();
        assert!(fault.starts_with("adapter task panicked"), "fault = {fault}");
    }

    #[tokio::test]
    async fn unknown_source_is_reported() {
        let registry = AdapterRegistry::new();
        let outcome = fan_out(&registry, "q", &ids(&["nope"]), 5, Duration::from_secs(1)).await;
        assert_eq!(outcome.per_source_counts().get("nope"), Some(&0));
        assert_eq!(outcome.reports[0].fault.as_deref(), Some("unknown source"));
    }

    #[tokio::test]
    async fn duplicate_source_ids_dispatch_once() {
        let registry =
            AdapterRegistry::new().with("a", adapter(Behaviour::Return(titles(&["x"]))));
        let outcome = fan_out(&registry, "q", &ids(&["a", "a"]), 5, Duration::from_secs(1)).await;
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.listings.len(), 1);
    }

    #[tokio::test]
    async fn ids_are_canonicalised_before_dispatch() {
        let registry =
            AdapterRegistry::new().with("Amazon", adapter(Behaviour::Return(titles(&["x"]))));
        let outcome = fan_out(
            &registry,
            "q",
            &ids(&["AMAZON", " amazon "]),
            5,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].source_id, "amazon");
        assert!(!outcome.reports[0].is_fault());
        assert_eq!(outcome.listings[0].source_id, "amazon");
    }

    #[tokio::test]
    async fn results_are_capped_and_sanitised() {
        let mut listings = titles(&["", "one", "two", "three"]);
        listings[1].price = Some(-3.0);
        let registry = AdapterRegistry::new().with("a", adapter(Behaviour::Return(listings)));

        let outcome = fan_out(&registry, "q", &ids(&["a"]), 2, Duration::from_secs(1)).await;

        let titles: Vec<&str> = outcome.listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two"]);
        assert!(outcome.listings[0].price.is_none());
        assert_eq!(outcome.reports[0].count, 2);
    }

    #[tokio::test]
    async fn adapters_run_concurrently() {
        let registry = AdapterRegistry::new()
            .with("a", adapter(Behaviour::Sleep(Duration::from_millis(200))))
            .with("b", adapter(Behaviour::Sleep(Duration::from_millis(200))))
            .with("c", adapter(Behaviour::Sleep(Duration::from_millis(200))));

        let started = std::time::Instant::now();
        let outcome = fan_out(&registry, "q", &ids(&["a", "b", "c"]), 5, Duration::from_secs(5)).await;

        assert_eq!(outcome.listings.len(), 3);
        assert!(started.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn empty_selection_yields_empty_outcome() {
        let outcome = fan_out(&AdapterRegistry::new(), "q", &[], 5, Duration::from_secs(1)).await;
        assert!(outcome.listings.is_empty());
        assert!(outcome.reports.is_empty());
        assert!(!outcome.all_failed());
    }
}
