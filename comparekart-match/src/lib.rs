//! # comparekart-match
//!
//! Cross-source product matching and price aggregation for CompareKart.
//!
//! Given a product query, this crate asks every selected e-commerce source
//! for offers, decides which offers from different sources describe the same
//! product, and reports price statistics and the best deal for each such
//! group.
//!
//! ## Design
//!
//! - Sources are [`SourceAdapter`]s held in an explicitly built
//!   [`AdapterRegistry`]; there is no global state
//! - All selected sources are queried concurrently; a failing, slow, or
//!   panicking source only costs its own results
//! - Titles are normalised, embedded in one batch, and clustered greedily
//!   around seed listings by cosine similarity
//! - If embeddings are unavailable the request still succeeds, flagged as
//!   degraded, with no matched groups
//! - Natural-language queries can be turned into structured filters with a
//!   deterministic fallback
//!
//! ## Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use comparekart_match::*;
//! # async fn example(registry: AdapterRegistry) -> comparekart_match::Result<()> {
//! let comparator = Comparator::new(
//!     Arc::new(registry),
//!     FeatureExtractor::new(Arc::new(LexicalEmbedder::default()), 512),
//!     MatchConfig::default(),
//! )?;
//! let request = ComparisonRequest::new("amul butter 500g", ["amazon", "bigbasket"], 5);
//! let response = comparator.compare(&request).await?;
//! for group in &response.matched_groups {
//!     println!("{}: save {:.2}", group.representative_title, group.price_stats.savings);
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod features;
pub mod normalize;
pub mod orchestrator;
pub mod price;
pub mod query;
pub mod types;

pub use adapter::{AdapterRegistry, SourceAdapter};
pub use config::MatchConfig;
pub use error::{CompareError, Result, SourceFault};
pub use features::{EmbeddingBackend, FeatureExtractor, FeatureVector, LexicalEmbedder};
pub use orchestrator::compare::Comparator;
pub use query::{QueryFilter, QueryParseBackend, QueryParser};
pub use types::{
    Cluster, ComparisonRequest, ComparisonResponse, ComparisonResult, Listing, PriceStats,
    SourceReport,
};
