//! Natural-language query parsing into structured filters.
//!
//! Parsing is a two-stage pipeline: ask a language model for JSON, then
//! validate the answer against a fixed schema. Any failure in either stage
//! yields the deterministic fallback filter, so [`QueryParser::parse`] never
//! fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::CompareError;

/// Instruction sent with every query.
pub const QUERY_PARSE_INSTRUCTION: &str = "\
You are a smart query parser for an e-commerce price comparison tool.
Parse the user's natural language query and extract:
1. Product name/category
2. Price range (if mentioned)
3. Brand preferences
4. Any other filters

Return only a JSON object with these fields:
- product: main product/category (string)
- min_price: minimum price if mentioned (number or null)
- max_price: maximum price if mentioned (number or null)
- brand: preferred brand if mentioned (string or null)
- keywords: additional relevant keywords (array of strings)";

/// A text completion service used for query parsing.
#[async_trait]
pub trait QueryParseBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Answer `text` following `instruction`, returning the raw reply.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Backend`] when the service cannot be reached
    /// or replies with something other than text.
    async fn complete(&self, instruction: &str, text: &str) -> Result<String, CompareError>;
}

/// Structured search filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub product: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub brand: Option<String>,
    pub keywords: Vec<String>,
}

impl QueryFilter {
    /// The filter used whenever parsing fails: the whole query is the product
    /// and the only keyword.
    pub fn fallback(query: &str) -> Self {
        Self {
            product: query.to_owned(),
            min_price: None,
            max_price: None,
            brand: None,
            keywords: vec![query.to_owned()],
        }
    }
}

/// Wire shape expected from the model; unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RawFilter {
    product: String,
    #[serde(default)]
    min_price: Option<f64>,
    #[serde(default)]
    max_price: Option<f64>,
    #[serde(default)]
    brand: Option<String>,
    /// Models sometimes send `null` here; treated as no keywords.
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

/// Best-effort query parser with deterministic fallback.
#[derive(Clone, Default)]
pub struct QueryParser {
    backend: Option<Arc<dyn QueryParseBackend>>,
}

impl QueryParser {
    pub fn new(backend: Arc<dyn QueryParseBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A parser that always returns the fallback filter.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Parse `query` into a [`QueryFilter`]. Never fails.
    pub async fn parse(&self, query: &str) -> QueryFilter {
        let Some(backend) = self.backend.as_ref() else {
            return QueryFilter::fallback(query);
        };

        tracing::trace!(query, backend = backend.name(), "parsing query");
        let reply = match backend
            .complete(QUERY_PARSE_INSTRUCTION, &format!("Parse this query: {query}"))
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(backend = backend.name(), error = %err, "query parse backend failed, using fallback");
                return QueryFilter::fallback(query);
            }
        };

        match validate_reply(&reply) {
            Ok(filter) => filter,
            Err(reason) => {
                tracing::debug!(%reason, "unusable query parse output, using fallback");
                QueryFilter::fallback(query)
            }
        }
    }
}

impl std::fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_owned()))
            .finish()
    }
}

/// Check a model reply against the filter schema.
fn validate_reply(reply: &str) -> Result<QueryFilter, String> {
    let raw: RawFilter =
        serde_json::from_str(strip_code_fence(reply)).map_err(|e| format!("not a filter: {e}"))?;

    let product = raw.product.trim().to_owned();
    if product.is_empty() {
        return Err("product is blank".into());
    }
    for price in [raw.min_price, raw.max_price].into_iter().flatten() {
        if !price.is_finite() || price < 0.0 {
            return Err(format!("invalid price {price}"));
        }
    }
    if let (Some(min), Some(max)) = (raw.min_price, raw.max_price) {
        if min > max {
            return Err("min_price exceeds max_price".into());
        }
    }

    Ok(QueryFilter {
        product,
        min_price: raw.min_price,
        max_price: raw.max_price,
        brand: raw
            .brand
            .map(|b| b.trim().to_owned())
            .filter(|b| !b.is_empty()),
        keywords: raw
            .keywords
            .unwrap_or_default()
            .into_iter()
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty())
            .collect(),
    })
}

/// Unwrap a reply wrapped in a Markdown code fence.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend {
        reply: Result<String, String>,
    }

    #[async_trait]
    impl QueryParseBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, instruction: &str, text: &str) -> Result<String, CompareError> {
            assert!(instruction.contains("keywords"));
            assert!(text.starts_with("Parse this query: "));
            self.reply.clone().map_err(CompareError::Backend)
        }
    }

    fn parser(reply: Result<&str, &str>) -> QueryParser {
        QueryParser::new(Arc::new(FixedBackend {
            reply: reply.map(str::to_owned).map_err(str::to_owned),
        }))
    }

    const QUERY: &str = "cheap blue shoes under 2000";

    fn expected_fallback() -> QueryFilter {
        QueryFilter {
            product: QUERY.into(),
            min_price: None,
            max_price: None,
            brand: None,
            keywords: vec![QUERY.into()],
        }
    }

    #[tokio::test]
    async fn malformed_output_falls_back() {
        let filter = parser(Ok("Sure! Here are your filters: shoes")).parse(QUERY).await;
        assert_eq!(filter, expected_fallback());
    }

    #[tokio::test]
    async fn backend_error_falls_back() {
        let filter = parser(Err("HTTP 502")).parse(QUERY).await;
        assert_eq!(filter, expected_fallback());
    }

    #[tokio::test]
    async fn disabled_parser_falls_back() {
        assert_eq!(QueryParser::disabled().parse(QUERY).await, expected_fallback());
    }

    #[tokio::test]
    async fn valid_output_is_used() {
        let reply = r#"{"product":"shoes","min_price":null,"max_price":2000,"brand":null,"keywords":["blue","cheap"]}"#;
        let filter = parser(Ok(reply)).parse(QUERY).await;
        assert_eq!(filter.product, "shoes");
        assert_eq!(filter.max_price, Some(2000.0));
        assert_eq!(filter.keywords, vec!["blue".to_string(), "cheap".to_string()]);
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let reply = "```json\n{\"product\":\"shoes\",\"brand\":\"Puma\"}\n```";
        let filter = parser(Ok(reply)).parse(QUERY).await;
        assert_eq!(filter.product, "shoes");
        assert_eq!(filter.brand.as_deref(), Some("Puma"));
        assert!(filter.keywords.is_empty());
    }

    #[tokio::test]
    async fn missing_product_falls_back() {
        let filter = parser(Ok(r#"{"keywords":["shoes"]}"#)).parse(QUERY).await;
        assert_eq!(filter, expected_fallback());
    }

    #[tokio::test]
    async fn wrong_types_fall_back() {
        let filter = parser(Ok(r#"{"product":"shoes","max_price":"2000"}"#)).parse(QUERY).await;
        assert_eq!(filter, expected_fallback());
    }

    #[tokio::test]
    async fn inverted_price_range_falls_back() {
        let reply = r#"{"product":"shoes","min_price":3000,"max_price":2000}"#;
        assert_eq!(parser(Ok(reply)).parse(QUERY).await, expected_fallback());
    }

    #[tokio::test]
    async fn negative_price_falls_back() {
        let reply = r#"{"product":"shoes","max_price":-1}"#;
        assert_eq!(parser(Ok(reply)).parse(QUERY).await, expected_fallback());
    }

    #[tokio::test]
    async fn null_keywords_keep_the_filter() {
        let reply = r#"{"product":"shoes","min_price":null,"max_price":2000,"brand":"Nike","keywords":null}"#;
        let filter = parser(Ok(reply)).parse(QUERY).await;
        assert_eq!(filter.product, "shoes");
        assert_eq!(filter.brand.as_deref(), Some("Nike"));
        assert!(filter.keywords.is_empty());
    }

    #[test]
    fn blank_brand_becomes_none() {
        let filter = validate_reply(r#"{"product":"tv","brand":"  "}"#).expect("valid");
        assert!(filter.brand.is_none());
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json {\"a\":1} ```"), "{\"a\":1}");
    }
}
