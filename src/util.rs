// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" cell handling (currency text,
// percent strings, mixed date/time layouts) so the rest of the code can
// assume clean, typed values. Anything that cannot be parsed comes back as
// `None`, the crate-wide missing-value marker.
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use num_format::{Locale, ToFormattedString};

/// Currency markers Amazon exports put in front of amounts.
const CURRENCY_MARKERS: [&str; 4] = ["Rs.", "INR", "₹", "$"];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a locale-formatted amount such as `"₹1,234.50"` or `"Rs. 99"`.
///
/// The currency marker and grouping separators are removed before the
/// number is handed to [`parse_f64_safe`].
pub fn parse_currency(s: Option<&str>) -> Option<f64> {
    let mut cleaned = s?.trim().to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    // Non-breaking spaces show up between the symbol and the digits.
    cleaned.retain(|c| !c.is_whitespace() && c != '\u{a0}');
    parse_f64_safe(Some(&cleaned))
}

/// Parse a ratio column. `"12.5%"` becomes `0.125`; bare numbers are taken as-is.
pub fn parse_ratio(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    match s.strip_suffix('%') {
        Some(pct) => parse_currency(Some(pct)).map(|v| v / 100.0),
        None => parse_currency(Some(s)),
    }
}

/// Parse an integer count (impressions, clicks, orders).
///
/// Spreadsheet cells often carry counts as floats (`12.0`); those are
/// accepted as long as they have no fractional part and are not negative.
pub fn parse_count(s: Option<&str>) -> Option<u64> {
    let v = parse_currency(s)?;
    if v < 0.0 || v.fract() != 0.0 || v > u64::MAX as f64 {
        return None;
    }
    Some(v as u64)
}

/// A successfully parsed date/time cell. Which variant comes back depends
/// on how much information the cell carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTime {
    Timestamp(NaiveDateTime),
    TimeOfDay(NaiveTime),
    Date(NaiveDate),
}

impl ParsedTime {
    /// Hour of day; a bare date counts as midnight.
    pub fn hour(&self) -> u32 {
        match self {
            ParsedTime::Timestamp(dt) => dt.hour(),
            ParsedTime::TimeOfDay(t) => t.hour(),
            ParsedTime::Date(_) => 0,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            ParsedTime::Timestamp(dt) => Some(dt.date()),
            ParsedTime::Date(d) => Some(*d),
            ParsedTime::TimeOfDay(_) => None,
        }
    }
}

/// One way of reading a date/time cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStrategy {
    /// Exactly `%Y-%m-%d %H:%M:%S`.
    FullTimestamp,
    /// Exactly `%H:%M`.
    HourMinute,
    /// Best effort over the layouts seen in Amazon and spreadsheet exports.
    Generic,
}

/// Precedence used by [`parse_datetime`]: first success wins.
pub const TIME_STRATEGIES: [TimeStrategy; 3] = [
    TimeStrategy::FullTimestamp,
    TimeStrategy::HourMinute,
    TimeStrategy::Generic,
];

// Ambiguous slash and dash dates read month-first; the day-first forms only
// catch dates whose first field cannot be a month.
const GENERIC_DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%b %d, %Y %H:%M:%S",
];
const GENERIC_DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%d %b %Y",
];
const GENERIC_TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

impl TimeStrategy {
    pub fn attempt(self, s: &str) -> Option<ParsedTime> {
        match self {
            TimeStrategy::FullTimestamp => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(ParsedTime::Timestamp),
            TimeStrategy::HourMinute => NaiveTime::parse_from_str(s, "%H:%M")
                .ok()
                .map(ParsedTime::TimeOfDay),
            TimeStrategy::Generic => parse_generic(s),
        }
    }
}

fn parse_generic(s: &str) -> Option<ParsedTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(ParsedTime::Timestamp(dt.naive_local()));
    }
    GENERIC_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(ParsedTime::Timestamp)
        .or_else(|| {
            GENERIC_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .map(ParsedTime::Date)
        })
        .or_else(|| {
            GENERIC_TIME_FORMATS
                .iter()
                .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
                .map(ParsedTime::TimeOfDay)
        })
}

/// Run the strategies in [`TIME_STRATEGIES`] order and return the first hit.
pub fn parse_datetime(s: Option<&str>) -> Option<ParsedTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    TIME_STRATEGIES.iter().find_map(|strategy| strategy.attempt(s))
}

/// Safe division: a zero denominator or a missing side yields `None`.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    let v = n / d;
    v.is_finite().then_some(v)
}

/// Mean of the present values; `None` when nothing is present.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Sum of the present values; missing values count as nothing.
pub fn sum_present<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().sum()
}

pub fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (v * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
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

pub fn format_currency(v: f64) -> String {
    format!("₹{}", format_number(v, 2))
}

/// Render a missing value as `"n/a"` instead of `NaN`.
pub fn format_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn format_percent(v: Option<f64>) -> String {
    v.map(|v| format!("{}%", format_number(v * 100.0, 2)))
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_text_recovers_exact_value() {
        assert_eq!(parse_currency(Some("₹1,234.50")), Some(1234.50));
        assert_eq!(parse_currency(Some("Rs. 99")), Some(99.0));
        assert_eq!(parse_currency(Some(" ₹ 12,00,000 ")), Some(1_200_000.0));
        assert_eq!(parse_currency(Some("42")), Some(42.0));
    }

    #[test]
    fn unparsable_currency_is_missing_not_an_error() {
        assert_eq!(parse_currency(Some("n/a")), None);
        assert_eq!(parse_currency(Some("")), None);
        assert_eq!(parse_currency(None), None);
        assert_eq!(parse_currency(Some("₹")), None);
    }

    #[test]
    fn percent_text_becomes_a_fraction() {
        assert_eq!(parse_ratio(Some("12.5%")), Some(0.125));
        assert_eq!(parse_ratio(Some("0.42")), Some(0.42));
        assert_eq!(parse_ratio(Some("--")), None);
    }

    #[test]
    fn counts_accept_integral_floats_only() {
        assert_eq!(parse_count(Some("1,024")), Some(1024));
        assert_eq!(parse_count(Some("12.0")), Some(12));
        assert_eq!(parse_count(Some("12.5")), None);
        assert_eq!(parse_count(Some("-3")), None);
    }

    #[test]
    fn full_timestamp_takes_precedence() {
        let parsed = parse_datetime(Some("2024-03-01 13:45:00")).unwrap();
        assert!(matches!(parsed, ParsedTime::Timestamp(_)));
        assert_eq!(parsed.hour(), 13);
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn hour_minute_is_second_strategy() {
        let parsed = parse_datetime(Some("07:30")).unwrap();
        assert_eq!(parsed, ParsedTime::TimeOfDay(NaiveTime::from_hms_opt(7, 30, 0).unwrap()));
        assert_eq!(parsed.date(), None);
    }

    #[test]
    fn generic_fallback_covers_other_layouts() {
        assert_eq!(parse_datetime(Some("11:00 PM")).unwrap().hour(), 23);
        assert_eq!(
            parse_datetime(Some("15/03/2024")).unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(parse_datetime(Some("2024-03-01T09:00:00+05:30")).unwrap().hour(), 9);
        assert_eq!(parse_datetime(Some("2024-03-02")).unwrap().hour(), 0);
    }

    #[test]
    fn ambiguous_slash_dates_read_month_first() {
        assert_eq!(
            parse_datetime(Some("03/04/2024")).unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
        assert_eq!(
            parse_datetime(Some("03/04/2024 18:30")).unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
        assert_eq!(
            parse_datetime(Some("13/04/2024 18:30")).unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 4, 13)
        );
    }

    #[test]
    fn unparseable_time_is_missing() {
        assert_eq!(parse_datetime(Some("yesterday-ish")), None);
        assert_eq!(parse_datetime(Some("  ")), None);
    }

    #[test]
    fn ratio_by_zero_is_missing() {
        assert_eq!(ratio(Some(0.0), Some(0.0)), None);
        assert_eq!(ratio(Some(5.0), Some(0.0)), None);
        assert_eq!(ratio(None, Some(2.0)), None);
        assert_eq!(ratio(Some(3.0), Some(2.0)), Some(1.5));
    }

    #[test]
    fn mean_skips_missing_values() {
        assert_eq!(mean([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean(Vec::<Option<f64>>::new()), None);
        assert_eq!(mean([None, None]), None);
    }

    #[test]
    fn formatting_uses_grouping_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_currency(-50.0), "₹-50.00");
        assert_eq!(format_percent(Some(0.1234)), "12.34%");
        assert_eq!(format_opt(None, 2), "n/a");
        assert_eq!(format_int(9855u64), "9,855");
    }
}
