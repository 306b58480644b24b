//! Source categories and source selection.
//!
//! A category names a group of sources that carry a kind of product
//! (groceries, fashion, ...). Requests pick sources either explicitly, by
//! category, or all at once; [`resolve_sources`] turns that choice into the
//! list of registered source ids to fan out to.

use std::collections::{BTreeMap, HashSet};

use comparekart_match::AdapterRegistry;
use comparekart_match::adapter::source_key;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A named group of sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Source ids, in preferred dispatch order.
    pub sources: Vec<String>,
}

impl CategoryConfig {
    fn new(name: &str, description: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            sources: sources.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// Built-in categories used when the config file does not define any.
pub fn default_categories() -> BTreeMap<String, CategoryConfig> {
    [
        (
            "general",
            CategoryConfig::new(
                "General",
                "Electronics, home goods and everyday items",
                &["amazon", "snapdeal", "jiomart"],
            ),
        ),
        (
            "fashion",
            CategoryConfig::new(
                "Fashion",
                "Clothing, footwear and accessories",
                &["myntra", "amazon", "snapdeal"],
            ),
        ),
        (
            "beauty",
            CategoryConfig::new("Beauty", "Cosmetics and personal care", &["purplle", "amazon"]),
        ),
        (
            "grocery",
            CategoryConfig::new(
                "Grocery",
                "Packaged food and household staples",
                &["bigbasket", "jiomart", "amazon"],
            ),
        ),
        (
            "quick_commerce",
            CategoryConfig::new(
                "Quick Commerce",
                "Minutes-level delivery of daily essentials",
                &["zepto", "instamart"],
            ),
        ),
    ]
    .into_iter()
    .map(|(id, category)| (id.to_owned(), category))
    .collect()
}

/// How a request chooses its sources.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceSelection {
    /// Every registered source.
    #[default]
    All,
    /// The sources of one category.
    Category(String),
    /// An explicit list of source ids.
    Explicit(Vec<String>),
}

impl SourceSelection {
    /// Build an explicit selection from ids.
    pub fn explicit(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Explicit(ids.into_iter().map(Into::into).collect())
    }
}

/// Resolve `selection` to registered source ids, preserving selection order.
///
/// Ids are trimmed and lowercased; unregistered and repeated ids are
/// dropped. An unknown category falls back to every registered source.
///
/// # Errors
///
/// Returns [`AppError::NoSources`] if nothing registered remains.
pub fn resolve_sources(
    selection: &SourceSelection,
    categories: &BTreeMap<String, CategoryConfig>,
    registry: &AdapterRegistry,
) -> Result<Vec<String>> {
    let requested: Vec<String> = match selection {
        SourceSelection::All => registry.ids(),
        SourceSelection::Category(category) => {
            let key = source_key(category);
            match categories.get(&key) {
                Some(config) => config.sources.clone(),
                None => {
                    tracing::warn!(category = %key, "unknown category, searching all sources");
                    registry.ids()
                }
            }
        }
        SourceSelection::Explicit(ids) => ids.clone(),
    };

    let mut seen = HashSet::new();
    let resolved: Vec<String> = requested
        .iter()
        .map(|id| source_key(id))
        .filter(|id| !id.is_empty())
        .filter(|id| {
            let known = registry.contains(id);
            if !known {
                tracing::debug!(source = %id, "ignoring unregistered source");
            }
            known
        })
        .filter(|id| seen.insert(id.clone()))
        .collect();

    if resolved.is_empty() {
        return Err(AppError::NoSources);
    }
    Ok(resolved)
}
