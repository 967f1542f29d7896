// Defensive parsing of free-text numeric cells ("USD 10.50", "119.9X50X180CM",
// "12PCS/CTN"). Nothing here fails: unparseable input resolves to a default.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)").unwrap());
static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.]+").unwrap());
static SINGULAR_PACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9.])1 ?(?:PC|SET)").unwrap());
static UNIT_QUALIFIED_PACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:PCS|PC|SET|PACK|PIECE)").unwrap());
static BARE_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Keep only digits, `.` and `-`.
pub fn strip_numeric(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

/// Parse the longest numeric prefix (`"12.5.3"` → 12.5, `"1-2"` → 1).
pub fn parse_leading_float(text: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Strip non-numeric characters, then parse the numeric prefix.
pub fn parse_numeric(text: &str) -> Option<f64> {
    parse_leading_float(&strip_numeric(text))
}

/// Numeric value for fields where zero is a valid answer (price, gross weight).
pub fn numeric_or_zero(text: &str) -> f64 {
    parse_numeric(text).unwrap_or(0.0)
}

/// Numeric value for optional fields; unparseable or zero means unknown.
pub fn numeric_or_none(text: &str) -> Option<f64> {
    parse_numeric(text).filter(|v| *v != 0.0)
}

/// Whole-number count (total cartons); unparseable or zero means unknown.
pub fn count_or_none(text: &str) -> Option<u32> {
    parse_numeric(text)
        .filter(|v| *v >= 1.0 && *v <= u32::MAX as f64)
        .map(|v| v.trunc() as u32)
}

/// Every digit/decimal-point token in the cell, in order.
///
/// A token with no digits (the full stop in "cm.") still counts, as 0.
pub fn numeric_tokens(text: &str) -> Vec<f64> {
    NUMERIC_TOKEN
        .find_iter(text)
        .map(|m| parse_leading_float(m.as_str()).unwrap_or(0.0))
        .collect()
}

/// Resolve a pack quantity from free text.
///
/// Order: explicit singular marker, number with unit, first bare integer, 1.
pub fn parse_pack(text: &str) -> u32 {
    let upper = text.to_uppercase();

    if SINGULAR_PACK.is_match(&upper) {
        return 1;
    }
    if let Some(n) = UNIT_QUALIFIED_PACK
        .captures(&upper)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
    {
        return n;
    }
    if let Some(n) = BARE_INTEGER
        .find(&upper)
        .and_then(|m| m.as_str().parse::<u32>().ok())
    {
        return n;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_currency_and_units() {
        assert_eq!(numeric_or_zero("USD 10.50"), 10.5);
        assert_eq!(numeric_or_zero("$1,234.50"), 1234.5);
        assert_eq!(numeric_or_zero("12.5 KGS"), 12.5);
        assert_eq!(numeric_or_zero("-3"), -3.0);
    }

    #[test]
    fn leading_prefix_wins_like_a_lenient_float_parser() {
        assert_eq!(parse_numeric("12.5.3"), Some(12.5));
        assert_eq!(parse_numeric("10-20"), Some(10.0));
        assert_eq!(parse_numeric(".5"), Some(0.5));
        assert_eq!(parse_numeric("--5"), None);
    }

    #[test]
    fn garbage_resolves_to_defaults() {
        assert_eq!(numeric_or_zero("N/A"), 0.0);
        assert_eq!(numeric_or_zero(""), 0.0);
        assert_eq!(numeric_or_none("TBD"), None);
        assert_eq!(numeric_or_none("0"), None);
        assert_eq!(numeric_or_none("0.085 CBM"), Some(0.085));
    }

    #[test]
    fn counts_truncate_and_reject_zero() {
        assert_eq!(count_or_none("120 CTNS"), Some(120));
        assert_eq!(count_or_none("12.7"), Some(12));
        assert_eq!(count_or_none("0"), None);
        assert_eq!(count_or_none("-4"), None);
        assert_eq!(count_or_none(""), None);
    }

    #[test]
    fn dimension_tokens_from_combined_cell() {
        assert_eq!(numeric_tokens("119.9X50X180CM"), vec![119.9, 50.0, 180.0]);
        assert_eq!(numeric_tokens("L60*W40"), vec![60.0, 40.0]);
        assert_eq!(numeric_tokens("56 x 10 cm."), vec![56.0, 10.0, 0.0]);
        assert_eq!(numeric_tokens("1.2.3"), vec![1.2]);
        assert!(numeric_tokens("n/a").is_empty());
    }

    #[test]
    fn pack_singular_marker_beats_unit_match() {
        assert_eq!(parse_pack("1PC/3 BROWN CARTON"), 1);
        assert_eq!(parse_pack("1 set in color box, 6 sets/ctn"), 1);
    }

    #[test]
    fn pack_unit_qualified_number() {
        assert_eq!(parse_pack("12PC"), 12);
        assert_eq!(parse_pack("11 PCS/CTN"), 11);
        assert_eq!(parse_pack("CTN OF 24 pieces"), 24);
    }

    #[test]
    fn pack_bare_number_then_default() {
        assert_eq!(parse_pack("box/6"), 6);
        assert_eq!(parse_pack("no pack info"), 1);
        assert_eq!(parse_pack(""), 1);
    }
}
