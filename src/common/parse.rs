use std::sync::LazyLock;

use regex::Regex;

static POWIAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^powiat\s+").unwrap());
static CITY_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^m\.\s*(st\.\s*)?").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());

/// Parse a numeric cell from a statistical-office export.
///
/// Empty cells and the usual "no data" markers (`-`, `x`, `.`) are `Ok(None)`.
/// Spaces (including non-breaking and thin spaces) are thousands separators;
/// with `decimal_comma` a single comma is the decimal point.
pub(crate) fn parse_number(raw: &str, decimal_comma: bool) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if matches!(trimmed, "" | "-" | "x" | "X" | "." | "NA" | "null") { return Ok(None) }

    let mut cleaned: String = trimmed.chars()
        .filter(|c| !matches!(c, ' ' | '\u{00a0}' | '\u{202f}' | '\u{2009}'))
        .collect();
    if decimal_comma {
        if cleaned.contains('.') && cleaned.contains(',') {
            return Err(format!("ambiguous number `{trimmed}`"));
        }
        cleaned = cleaned.replace(',', ".");
    }

    let value: f64 = cleaned.parse()
        .map_err(|_| format!("not a number: `{trimmed}`"))?;
    if !value.is_finite() {
        return Err(format!("non-finite number `{trimmed}`"));
    }
    Ok(Some(value))
}

/// Canonical form of a county name for matching across tables:
/// lowercase, single spaces, no "powiat" prefix, city counties as "m. <name>".
pub(crate) fn normalize_county_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lower, " ");
    let stripped = POWIAT_PREFIX.replace(&collapsed, "");
    CITY_PREFIX.replace(&stripped, "m. ").into_owned()
}

/// Last four-digit year (1900-2099) appearing in a file name, if any.
pub(crate) fn year_from_name(name: &str) -> Option<i32> {
    YEAR.find_iter(name).last().and_then(|m| m.as_str().parse().ok())
}
