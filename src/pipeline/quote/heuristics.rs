//! Row-level fallbacks used when the mapping under-delivers.
//!
//! Each heuristic scans the whole row left to right and only runs when the
//! mapped column was absent or produced nothing usable.

use std::sync::LazyLock;

use regex::Regex;

use super::numeric::parse_numeric;

/// Upper plausibility bound for a fallback unit price.
const MAX_FALLBACK_PRICE: f64 = 10_000.0;

/// A fallback title must be longer than this many characters.
const MIN_TITLE_CHARS: usize = 10;

static SKU_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // PSP001, COMP002
        Regex::new(r"^[A-Z]{2,5}\d+").unwrap(),
        // general alphanumeric codes, optionally hyphenated
        Regex::new(r"^[A-Z0-9-]{4,15}$").unwrap(),
        // numeric item codes
        Regex::new(r"^\d{4,10}$").unwrap(),
    ]
});

static NOT_A_TITLE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^\d+(\.\d+)?$").unwrap(),
        Regex::new(r"(?i)^\d+(\.\d+)?\s*[x×*]\s*\d+(\.\d+)?\s*[x×*]\s*\d+").unwrap(),
        Regex::new(r"^[A-Z]{2,5}\d+$").unwrap(),
        Regex::new(r"(?i)^\d+\s*(PC|PCS|SET|KG|G|CM|MM)$").unwrap(),
    ]
});

static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^\$?\d+(\.\d{1,2})?$").unwrap(),
        Regex::new(r"^\d+[.,]\d{2}$").unwrap(),
        Regex::new(r"^USD?\s*\d+(\.\d{1,2})?").unwrap(),
    ]
});

static COMMA_DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+,\d{2}$").unwrap());

/// First cell that looks like a product code.
pub fn find_sku(row: &[String]) -> Option<String> {
    row.iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty() && SKU_PATTERNS.iter().any(|p| p.is_match(c)))
        .map(str::to_string)
}

/// Longest descriptive cell; ties go to the first occurrence.
pub fn find_title(row: &[String]) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for cell in row.iter().map(|c| c.trim()) {
        let len = cell.chars().count();
        if len <= MIN_TITLE_CHARS || NOT_A_TITLE.iter().any(|p| p.is_match(cell)) {
            continue;
        }
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((cell, len));
        }
    }
    best.map(|(cell, _)| cell.to_string())
}

/// First currency-like cell with a plausible unit price.
pub fn find_price(row: &[String]) -> Option<f64> {
    row.iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty() && PRICE_PATTERNS.iter().any(|p| p.is_match(c)))
        .filter_map(|c| {
            if COMMA_DECIMAL.is_match(c) {
                parse_numeric(&c.replace(',', "."))
            } else {
                parse_numeric(c)
            }
        })
        .find(|p| *p > 0.0 && *p < MAX_FALLBACK_PRICE)
}
