// Utility helpers for parsing, summation and number formatting.
//
// Parsing is forgiving so the loader can assume clean, typed values once a
// row has been accepted.
use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64`, tolerating the formatting noise
/// common in exported spreadsheets.
///
/// - Trims whitespace, including non-breaking spaces used as thousands separators.
/// - Rejects values that contain alphabetic characters.
/// - Strips `","` thousands separators before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s: String = s
        .chars()
        .filter(|c| *c != ',' && *c != '\u{a0}' && *c != '\u{202f}' && !c.is_whitespace())
        .collect();
    s.parse::<f64>().ok()
}

pub fn parse_u32_safe(s: Option<&str>) -> Option<u32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Durations are sometimes exported as floats ("12.0").
    s.parse::<u32>()
        .ok()
        .or_else(|| parse_f64_safe(Some(s)).filter(|v| *v >= 0.0).map(|v| v.round() as u32))
}

pub fn parse_bool_safe(s: Option<&str>) -> Option<bool> {
    let s = s?.trim().to_lowercase();
    match s.as_str() {
        "true" | "vrai" | "oui" | "1" => Some(true),
        "false" | "faux" | "non" | "0" => Some(false),
        _ => None,
    }
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Timestamps are truncated to their date part.
    let day = s.split_whitespace().next().unwrap_or(s);
    ["%Y-%m-%d", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Whole calendar months elapsed between two dates, floored at zero.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Sum that does not depend on the order values were collected in.
///
/// Values are sorted by total order first, so any permutation of the same
/// inputs yields the bit-identical result.
pub fn stable_sum(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    values.iter().sum()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators (`1,234,567.89`).
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

/// Shares are presented as plain proportions with four decimals.
pub fn format_share(share: f64) -> String {
    format!("{:.4}", share)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_amounts_with_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,234.50 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("12\u{a0}000")), Some(12000.0));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parses_durations_and_flags() {
        assert_eq!(parse_u32_safe(Some("24")), Some(24));
        assert_eq!(parse_u32_safe(Some("12.0")), Some(12));
        assert_eq!(parse_u32_safe(Some("-3")), None);
        assert_eq!(parse_bool_safe(Some("True")), Some(true));
        assert_eq!(parse_bool_safe(Some("non")), Some(false));
        assert_eq!(parse_bool_safe(Some("maybe")), None);
    }

    #[test]
    fn parses_both_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2016, 3, 1);
        assert_eq!(parse_date_safe(Some("2016-03-01")), expected);
        assert_eq!(parse_date_safe(Some("01/03/2016")), expected);
        assert_eq!(parse_date_safe(Some("2016-03-01 00:00:00")), expected);
        assert_eq!(parse_date_safe(Some("soon")), None);
    }

    #[test]
    fn months_between_counts_whole_months() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(months_between(d(2015, 1, 1), d(2016, 1, 1)), 12);
        assert_eq!(months_between(d(2015, 1, 15), d(2015, 3, 14)), 1);
        assert_eq!(months_between(d(2016, 1, 1), d(2015, 1, 1)), 0);
    }

    #[test]
    fn stable_sum_ignores_input_order() {
        let mut a = vec![1e16, 1.0, -1e16, 3.5, 0.25];
        let mut b = vec![0.25, -1e16, 3.5, 1.0, 1e16];
        assert_eq!(stable_sum(&mut a).to_bits(), stable_sum(&mut b).to_bits());
    }

    #[test]
    fn formats_numbers_with_grouping() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_share(1.0 / 3.0), "0.3333");
        assert_eq!(format_int(38532usize), "38,532");
    }
}
