//! Price arithmetic: statistics, savings, and text parsing.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{Listing, PriceStats};

static PRICE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d{1,2})?").expect("valid price regex"));

/// Compute [`PriceStats`] over the listings that carry a price.
///
/// Listings without a price are ignored. With no priced listings every
/// statistic is `None` and `savings` is 0.
pub fn price_stats(listings: &[Listing]) -> PriceStats {
    let prices: Vec<f64> = listings.iter().filter_map(|l| l.price).collect();
    if prices.is_empty() {
        return PriceStats::default();
    }

    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = prices.iter().sum::<f64>() / prices.len() as f64;

    PriceStats {
        min: Some(min),
        max: Some(max),
        avg: Some(avg),
        savings: max - min,
    }
}

/// Percentage saved by buying at `min` instead of `max`.
///
/// Returns 0 when either bound is missing or `max` is zero.
///
/// # Examples
///
/// ```
/// use comparekart_match::price::savings_percentage;
///
/// assert!((savings_percentage(Some(100.0), Some(150.0)) - 33.33).abs() < 0.01);
/// assert_eq!(savings_percentage(None, None), 0.0);
/// ```
pub fn savings_percentage(min: Option<f64>, max: Option<f64>) -> f64 {
    match (min, max) {
        (Some(min), Some(max)) if max != 0.0 => (max - min) / max * 100.0,
        _ => 0.0,
    }
}

/// Round to two decimal places for currency display.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Extract a numeric price from display text such as `"₹1,299.00"`.
///
/// Currency symbols, thousands separators and whitespace are dropped and the
/// first numeric run is parsed. Returns `None` when no number is present.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    PRICE_NUMBER
        .find(&compact)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
