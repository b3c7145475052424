//! Fixed-point amounts. All sums run on integer minor units so episode
//! totals stay cent-exact against the reference summary.

/// Parse a monetary amount (or quantity) into integer hundredths.
///
/// Accepts an optional leading `$`, thousands separators, a sign, and up
/// to two decimal places. Blank input parses to 0 — absent numeric fields
/// never poison sums. Anything else returns `None`.
pub fn parse_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',' && *c != '$').collect();
    if cleaned.is_empty() {
        return Some(0);
    }

    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };

    if frac.len() > 2 || (whole.is_empty() && frac.is_empty()) {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };

    let cents = whole.checked_mul(100)?.checked_add(frac_cents)?;
    Some(if negative { -cents } else { cents })
}

/// Render hundredths back to a two-decimal string for output tables.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
