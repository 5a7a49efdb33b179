use crate::error::{ControllingError, Result};
use chrono::{Days, NaiveDate};
use log::info;
use std::time::Instant;

/// Characters `start..end` of a project identifier. Short identifiers yield a
/// truncated (possibly empty) segment instead of failing.
pub fn psp_segment(psp: &str, start: usize, end: usize) -> String {
    psp.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// The two digit project type ("Projektart") encoded at positions 3..5.
pub fn project_type_of(psp: &str) -> String {
    psp_segment(psp, 3, 5)
}

/// The organizational unit ("IKZ") encoded at positions 5..11.
pub fn unit_of(psp: &str) -> String {
    psp_segment(psp, 5, 11)
}

/// Parses a German formatted amount ("-1.234,56"). Blank cells count as zero.
/// SAP sometimes writes the sign at the end ("1.234,56-"), which is accepted too.
pub fn parse_amount(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let (negative, digits) = match trimmed.strip_suffix('-') {
        Some(rest) => (true, rest.trim_end()),
        None => (false, trimmed),
    };

    let normalized: String = digits
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}

pub fn parse_project_end(psp: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d.%m.%Y").map_err(|_| {
        ControllingError::DateParse {
            psp: psp.to_string(),
            value: value.to_string(),
        }
    })
}

/// Rounds to two decimals, exact half cents to the even neighbour.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Formats an amount the way the German reports show it: `1.234,56 €`.
pub fn format_euro(value: f64) -> String {
    let cents = (value * 100.0).round_ties_even() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::new();
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}{},{:02} €", sign, grouped, fraction)
}

/// June 30 of `year`, the date separating expired from ongoing projects.
pub fn mid_year_cutoff(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 6, 30)
}

pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Runs one pipeline stage and logs how long it took.
pub fn timed<T>(stage: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    info!("{}...", stage);
    let result = f();
    info!("{} OK ({:.2} s)", stage, start.elapsed().as_secs_f64());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psp_segments() {
        let psp = "123681234560001";
        assert_eq!(project_type_of(psp), "68");
        assert_eq!(unit_of(psp), "123456");
        assert_eq!(unit_of("12368"), "");
        assert_eq!(unit_of("1236812"), "12");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("-50"), Some(-50.0));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount("  "), Some(0.0));
        assert_eq!(parse_amount("1.000,00-"), Some(-1000.0));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_parse_project_end() {
        assert_eq!(
            parse_project_end("x", "31.12.2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
        assert!(matches!(
            parse_project_end("x", "2024-12-31"),
            Err(ControllingError::DateParse { .. })
        ));
    }

    #[test]
    fn test_format_euro() {
        assert_eq!(format_euro(1234.5), "1.234,50 €");
        assert_eq!(format_euro(-1234567.891), "-1.234.567,89 €");
        assert_eq!(format_euro(0.0), "0,00 €");
        assert_eq!(format_euro(999.999), "1.000,00 €");
        assert_eq!(format_euro(0.125), "0,12 €");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(170.004), 170.0);
        assert_eq!(round2(-12.345678), -12.35);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
    }

    #[test]
    fn test_cutoff_dates() {
        let cutoff = mid_year_cutoff(2024).unwrap();
        assert_eq!(cutoff, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(next_day(cutoff), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    }
}
