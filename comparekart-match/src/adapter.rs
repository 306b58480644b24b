//! Trait definition for pluggable source adapters, and the registry that
//! maps source ids to them.
//!
//! Fetching pages and extracting fields is the adapter's business. The core
//! only relies on the contract below.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SourceFault;
use crate::types::Listing;

/// One e-commerce source.
///
/// Implementors must answer within [`timeout`](Self::timeout); the
/// orchestrator enforces it and reports [`SourceFault::Timeout`] otherwise.
/// All implementations must be `Send + Sync` for concurrent fan-out.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Search the source and return at most `max_results` listings.
    ///
    /// Listings need not carry a `source_id`; the orchestrator tags them.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceFault`] for network errors, blocked or rate-limited
    /// responses, and parse failures. An empty `Ok` means "nothing found".
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<Listing>, SourceFault>;

    /// Upper bound on one [`search`](Self::search) call.
    ///
    /// `None` defers to the matcher's configured default.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Explicitly constructed mapping from source id to adapter.
///
/// Source ids are case-insensitive: they are trimmed and lower-cased on
/// registration and on every lookup.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `source_id`, replacing any previous entry.
    pub fn register(&mut self, source_id: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(source_key(&source_id.into()), adapter);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, source_id: impl Into<String>, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(source_id, adapter);
        self
    }

    /// Look up an adapter.
    pub fn get(&self, source_id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&source_key(source_id)).cloned()
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.adapters.contains_key(&source_key(source_id))
    }

    /// Registered source ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Canonical form of a source id.
pub fn source_key(source_id: &str) -> String {
    source_id.trim().to_lowercase()
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("sources", &self.ids())
            .finish()
    }
}
