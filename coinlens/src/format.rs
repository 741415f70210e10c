//! Number and date formatting for display
//!
//! Large market figures are shown in compact form:
//! - below 1,000: plain grouped number
//! - thousands, millions, billions: one decimal plus a K/M/B suffix
//!
//! Negative values are not special-cased and always fall in the first tier.

use chrono::DateTime;

/// Magnitude bucket of a displayed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberTier {
    /// Below 1,000 (and every negative value)
    Units,
    /// [1e3, 1e6)
    Thousands,
    /// [1e6, 1e9)
    Millions,
    /// 1e9 and up
    Billions,
}

impl NumberTier {
    /// Determine tier from a raw value
    pub fn from_value(value: f64) -> Self {
        if value < 1_000.0 {
            NumberTier::Units
        } else if value < 1_000_000.0 {
            NumberTier::Thousands
        } else if value < 1_000_000_000.0 {
            NumberTier::Millions
        } else {
            NumberTier::Billions
        }
    }

    pub fn divisor(&self) -> f64 {
        match self {
            NumberTier::Units => 1.0,
            NumberTier::Thousands => 1_000.0,
            NumberTier::Millions => 1_000_000.0,
            NumberTier::Billions => 1_000_000_000.0,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            NumberTier::Units => "",
            NumberTier::Thousands => "K",
            NumberTier::Millions => "M",
            NumberTier::Billions => "B",
        }
    }
}

/// Compact display of a market figure.
///
/// The tier is picked before rounding, so 999,999 renders as "1000.0K".
pub fn compact_number(value: f64) -> String {
    match NumberTier::from_value(value) {
        NumberTier::Units => locale_number(value),
        tier => format!("{:.1}{}", value / tier.divisor(), tier.suffix()),
    }
}

/// Grouped number with at most three fractional digits: `1234.5` -> "1,234.5"
pub fn locale_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{value:.3}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    let out = match trimmed.split_once('.') {
        Some((int, frac)) => format!("{}.{frac}", group_thousands(int)),
        None => group_thousands(trimmed),
    };
    if out == "-0" { "0".to_string() } else { out }
}

/// US-dollar amount: `-1234.5` -> "-$1,234.50"
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${}.{frac}", group_thousands(int))
}

/// 24h change as shown next to a price: `2.345` -> "2.35%"
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Label for a missing or out-of-range timestamp
pub const INVALID_DATE: &str = "Invalid Date";

/// Chart axis label `dd/mm/yyyy` for a millisecond timestamp, in UTC
pub fn date_label(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map_or_else(|| INVALID_DATE.to_string(), |dt| dt.format("%d/%m/%Y").to_string())
}

/// Insert `,` every three digits of an integer string, keeping a leading `-`
fn group_thousands(int: &str) -> String {
    let (sign, digits) = int.strip_prefix('-').map_or(("", int), |d| ("-", d));
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}
