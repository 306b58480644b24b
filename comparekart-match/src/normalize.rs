//! Title normalisation for cross-source comparison.
//!
//! Sources decorate the same product with different marketing noise
//! ("Pack of 2", "Free Delivery", "Bestseller", their own brand name).
//! [`normalize`] strips that noise so titles compare on product content.

use regex::Regex;
use std::sync::LazyLock;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid bracket regex"));

/// Noise phrases, one pattern per family.
static NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // pack / quantity markers
        r"\b(pack\s+of|set\s+of|\d+\s*pack|\d+\s*pcs?)\b",
        // delivery-speed marketing
        r"\b(free\s+delivery|fast\s+delivery|same\s+day\s+delivery)\b",
        // superlatives
        r"\b(bestseller|best\s+seller|top\s+rated)\b",
        // platform names
        r"\b(amazon|flipkart|blinkit|zepto|instamart)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid noise regex"))
    .collect()
});

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

/// Normalise a product title for similarity comparison.
///
/// Applies, in order:
///
/// 1. Lower-case.
/// 2. Remove `(...)` and `[...]` spans.
/// 3. Remove noise phrases (pack sizes, delivery marketing, superlatives,
///    platform names).
/// 4. Replace everything except word characters and whitespace with a space.
/// 5. Collapse runs of whitespace and trim.
///
/// The steps repeat until the output stops changing, so stripping one phrase
/// can never expose another that a second call would remove:
/// `normalize(normalize(x)) == normalize(x)` for every input.
///
/// # Examples
///
/// ```
/// use comparekart_match::normalize::normalize;
///
/// assert_eq!(
///     normalize("Samsung Galaxy M14 (Blue, 128GB) - Amazon Bestseller"),
///     "samsung galaxy m14"
/// );
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(title: &str) -> String {
    let mut current = clean_pass(title);
    // After the first pass the text is lower-case and bracket-free, so every
    // further pass either shrinks it or leaves it unchanged.
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(title: &str) -> String {
    let mut text = title.to_lowercase();
    text = BRACKETED.replace_all(&text, " ").into_owned();
    for pattern in NOISE.iter() {
        text = pattern.replace_all(&text, " ").into_owned();
    }
    text = PUNCTUATION.replace_all(&text, " ").into_owned();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
