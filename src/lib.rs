//! CompareKart: cross-platform e-commerce price comparison.
//!
//! This crate hosts the application layer around
//! [`comparekart_match`]: TOML configuration, OpenAI-compatible embedding and
//! query-parse backends, source categories, tracing setup, and the
//! [`PriceComparisonService`] facade.
//!
//! Source adapters (scrapers, partner APIs) live outside this crate and are
//! registered explicitly:
//!
//! ```no_run
//! # use comparekart::*;
//! # async fn example(registry: AdapterRegistry) -> comparekart::Result<()> {
//! let config = AppConfig::load_or_default(&AppConfig::default_config_path())?;
//! diagnostics::init_tracing(&config.logging)?;
//!
//! let service = PriceComparisonService::new(&config, registry)?;
//! let response = service
//!     .compare("amul butter 500g", &SourceSelection::Category("grocery".into()), None)
//!     .await?;
//! println!("total savings: {:.2}", response.total_savings);
//! # Ok(())
//! # }
//! ```

pub mod categories;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod providers;
pub mod service;

pub use categories::{CategoryConfig, SourceSelection, default_categories, resolve_sources};
pub use config::{
    AppConfig, EmbeddingConfig, EmbeddingProvider, LoggingConfig, QueryParserConfig, SecretRef,
};
pub use error::{AppError, Result};
pub use service::{PriceComparisonService, SourceInfo};

pub use comparekart_match::{
    AdapterRegistry, ComparisonResponse, ComparisonResult, Listing, MatchConfig, PriceStats,
    QueryFilter, SourceAdapter, SourceFault, SourceReport,
};
