// Utility helpers for parsing and formatting.
//
// Upstream CSVs are loosely typed: counts may be blank, carry a trailing
// ".0" or use thousands separators, and dates come in two layouts. All of
// that is normalized here so the pipeline only sees `Option<i64>` and
// `NaiveDate`.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Date column layout used by the wide time-series tables (`3/22/20`).
pub const DATE_LABEL_FORMAT: &str = "%m/%d/%y";

/// Parse a count cell.
///
/// - Blank or missing cells are `None`.
/// - Thousands separators are stripped.
/// - Float-formatted counts (`"12.0"`) are rounded to the nearest integer.
/// - Anything else that does not parse is `None`.
pub fn parse_count(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() {
        Some(f.round() as i64)
    } else {
        None
    }
}

pub fn parse_date_label(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_LABEL_FORMAT).ok()
}

/// Parse the compact `yyyymmdd` dates of the daily feed.
pub fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Some exports write the integer date as a float.
    let s = s.strip_suffix(".0").unwrap_or(s);
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

pub fn date_label(d: NaiveDate) -> String {
    d.format(DATE_LABEL_FORMAT).to_string()
}

/// Round to one decimal place, ties to even (`6.25` -> `6.2`).
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round_ties_even() / 10.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `en` thousands separators on the integer part.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Missing values render as `-`.
pub fn format_count(v: Option<i64>) -> String {
    v.map(format_int).unwrap_or_else(|| "-".to_string())
}
