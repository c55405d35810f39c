//! Numeric coercion, guarded arithmetic, date→period bucketing and stable
//! grouping. Every other metric family is built on these.

use chrono::{Datelike, Month, NaiveDate};
use core_types::SeasonCalendar;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

/// Label of the bucket that collects records whose period cannot be determined.
pub const UNKNOWN_PERIOD: &str = "Unknown";

/// Label used for records that lack the field being grouped on.
pub const UNKNOWN_GROUP: &str = "Unknown";

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Coerces a JSON value to a number, falling back to `default`.
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace and
/// thousands separators are tolerated, as in `"1,200"`). Commas anywhere else
/// (`"12,5"`) make the string non-numeric. Magnitudes below the smallest
/// representable decimal round to zero. Missing, null, boolean, non-numeric
/// and out-of-range input all yield `default`.
pub fn to_number(value: Option<&Value>, default: Decimal) -> Decimal {
    value.and_then(try_number).unwrap_or(default)
}

/// Like `to_number`, but reports failure instead of substituting a default.
pub fn try_number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if !trimmed.contains(',') {
                return parse_decimal(trimmed);
            }
            if !has_thousands_grouping(trimmed) {
                return None;
            }
            let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
            parse_decimal(&cleaned)
        }
        _ => None,
    }
}

/// True for `[+-]d{1,3}(,ddd)+` with an optional `.digits` fraction.
fn has_thousands_grouping(text: &str) -> bool {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }

    let mut groups = integer.split(',');
    let leading_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    let mut rest = groups.peekable();
    leading_ok
        && rest.peek().is_some()
        && rest.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .or_else(|| underflow_to_zero(text))
}

/// Finite values too small for a decimal's 28-digit scale read as zero.
fn underflow_to_zero(text: &str) -> Option<Decimal> {
    let value: f64 = text.parse().ok()?;
    (value.is_finite() && value.abs() < 1e-28).then_some(Decimal::ZERO)
}

/// `numerator / denominator`, or `0` when the denominator is zero or the
/// quotient does not fit.
pub fn safe_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// `numerator / denominator * 100` with the same zero guard as `safe_ratio`.
pub fn percent_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    safe_ratio(numerator, denominator)
        .checked_mul(Decimal::from(100))
        .unwrap_or(Decimal::ZERO)
}

/// Sum that saturates at the decimal range instead of panicking.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

/// Arithmetic mean, or `None` for an empty input.
pub fn mean(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, count) = values
        .into_iter()
        .fold((Decimal::ZERO, 0usize), |(sum, count), v| {
            (sum.saturating_add(v), count + 1)
        });
    if count == 0 {
        return None;
    }
    Some(safe_ratio(sum, Decimal::from(count)))
}

/// The time resolution a date is bucketed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Granularity<'a> {
    /// Calendar month, labelled `"Jan"`..`"Dec"` (year ignored).
    Month,
    /// Calendar quarter, labelled `"2024-Q1"`.
    Quarter,
    /// Year and month, labelled `"2024-01"`.
    YearMonth,
    /// Season under a caller-supplied date→season rule.
    Season(&'a SeasonCalendar),
}

/// A period label together with its chronological rank.
///
/// Ranks compare as `(is_unknown, year, index)` so that known periods sort in
/// calendar order and the unknown bucket always sorts last.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeriodKey {
    pub label: String,
    pub rank: (bool, i32, u32),
}

impl PeriodKey {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_PERIOD.to_string(),
            rank: (true, 0, 0),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.rank.0
    }

    fn known(label: String, year: i32, index: u32) -> Self {
        Self {
            label,
            rank: (false, year, index),
        }
    }
}

/// A parsed date. Bare month names and month numbers carry no year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PeriodDate {
    year: Option<i32>,
    month: u32,
}

fn parse_period_date(raw: &str) -> Option<PeriodDate> {
    let text = raw.trim();

    // Full dates, and timestamps whose first ten characters are a date.
    let date_part = text.get(..10).unwrap_or(text);
    if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        return Some(PeriodDate {
            year: Some(date.year()),
            month: date.month(),
        });
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d") {
        return Some(PeriodDate {
            year: Some(date.year()),
            month: date.month(),
        });
    }

    if let Ok(month) = text.parse::<u32>() {
        return (1..=12).contains(&month).then_some(PeriodDate { year: None, month });
    }

    Month::from_str(text).ok().map(|month| PeriodDate {
        year: None,
        month: month.number_from_month(),
    })
}

/// Maps a date string to its period key. Never fails: anything that cannot be
/// placed lands in the `"Unknown"` bucket.
pub fn period_of(date: &str, granularity: Granularity<'_>) -> PeriodKey {
    let Some(parsed) = parse_period_date(date) else {
        return PeriodKey::unknown();
    };

    let month_index = parsed.month - 1;
    match granularity {
        Granularity::Month => {
            PeriodKey::known(MONTH_LABELS[month_index as usize].to_string(), 0, parsed.month)
        }
        Granularity::Quarter => match parsed.year {
            Some(year) => {
                let quarter = month_index / 3 + 1;
                PeriodKey::known(format!("{year}-Q{quarter}"), year, quarter)
            }
            None => PeriodKey::unknown(),
        },
        Granularity::YearMonth => match parsed.year {
            Some(year) => {
                PeriodKey::known(format!("{year}-{:02}", parsed.month), year, parsed.month)
            }
            None => PeriodKey::unknown(),
        },
        Granularity::Season(calendar) => season_key(calendar, calendar.season_for_month(parsed.month)),
    }
}

/// Builds the key for a season label, provided the calendar knows it.
pub fn season_key(calendar: &SeasonCalendar, label: Option<&str>) -> PeriodKey {
    label
        .and_then(|name| {
            calendar
                .position(name)
                .map(|pos| PeriodKey::known(name.to_string(), 0, pos as u32))
        })
        .unwrap_or_else(PeriodKey::unknown)
}

/// Maps an ISO date to its period label (`"Jan"`, `"2024-Q1"`, `"Rabi"`, or `"Unknown"`).
pub fn period_key(date: &str, granularity: Granularity<'_>) -> String {
    period_of(date, granularity).label
}

/// Groups items by key, preserving the order in which keys are first seen
/// and the input order within each group.
pub fn group_by<'a, T, K, F>(items: &'a [T], key_fn: F) -> Vec<(K, Vec<&'a T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();

    for item in items {
        let key = key_fn(item);
        match index.get(&key) {
            Some(&slot) => groups[slot].1.push(item),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn to_number_coerces_numbers_and_numeric_strings() {
        assert_eq!(to_number(Some(&json!(42)), dec!(0)), dec!(42));
        assert_eq!(to_number(Some(&json!(12.5)), dec!(0)), dec!(12.5));
        assert_eq!(to_number(Some(&json!(" 1,200.75 ")), dec!(0)), dec!(1200.75));
        assert_eq!(to_number(Some(&json!("1e3")), dec!(0)), dec!(1000));
    }

    #[test]
    fn to_number_falls_back_to_default() {
        assert_eq!(to_number(None, dec!(7)), dec!(7));
        assert_eq!(to_number(Some(&Value::Null), dec!(0)), dec!(0));
        assert_eq!(to_number(Some(&json!("N/A")), dec!(-1)), dec!(-1));
        assert_eq!(to_number(Some(&json!("")), dec!(3)), dec!(3));
        assert_eq!(to_number(Some(&json!(true)), dec!(0)), dec!(0));
        assert_eq!(to_number(Some(&json!({"a": 1})), dec!(0)), dec!(0));
    }

    #[test]
    fn commas_only_count_as_thousands_separators() {
        assert_eq!(to_number(Some(&json!("1,234,567")), dec!(0)), dec!(1234567));
        assert_eq!(to_number(Some(&json!("-12,000.5")), dec!(0)), dec!(-12000.5));
        assert_eq!(to_number(Some(&json!("12,5")), dec!(-1)), dec!(-1));
        assert_eq!(to_number(Some(&json!("1,2,3")), dec!(-1)), dec!(-1));
        assert_eq!(to_number(Some(&json!("1234,567")), dec!(-1)), dec!(-1));
        assert_eq!(to_number(Some(&json!(",500")), dec!(-1)), dec!(-1));
        assert_eq!(to_number(Some(&json!("1,000.")), dec!(-1)), dec!(-1));
    }

    #[test]
    fn underflowing_values_round_to_zero() {
        assert_eq!(to_number(Some(&json!(1e-30)), dec!(-1)), dec!(0));
        assert_eq!(to_number(Some(&json!("-1e-40")), dec!(-1)), dec!(0));
        assert_eq!(to_number(Some(&json!("1e-3")), dec!(-1)), dec!(0.001));
        assert_eq!(to_number(Some(&json!("1e400")), dec!(-1)), dec!(-1));
    }

    #[test]
    fn ratios_guard_zero_denominators() {
        assert_eq!(safe_ratio(dec!(10), dec!(0)), dec!(0));
        assert_eq!(percent_of(dec!(1), dec!(0)), dec!(0));
        assert_eq!(percent_of(dec!(1), dec!(4)), dec!(25));
        assert_eq!(safe_ratio(Decimal::MAX, dec!(0.0001)), dec!(0));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(Vec::new()), None);
        assert_eq!(mean(vec![dec!(1), dec!(2), dec!(6)]), Some(dec!(3)));
    }

    #[test]
    fn period_key_by_month_and_quarter() {
        assert_eq!(period_key("2024-03-15", Granularity::Month), "Mar");
        assert_eq!(period_key("2024-03-15T08:30:00Z", Granularity::Month), "Mar");
        assert_eq!(period_key("2024-11", Granularity::Month), "Nov");
        assert_eq!(period_key("January", Granularity::Month), "Jan");
        assert_eq!(period_key("3", Granularity::Month), "Mar");
        assert_eq!(period_key("12", Granularity::Month), "Dec");
        assert_eq!(period_key("2024-05-01", Granularity::Quarter), "2024-Q2");
        assert_eq!(period_key("2023-12-31", Granularity::YearMonth), "2023-12");
    }

    #[test]
    fn invalid_dates_land_in_unknown() {
        assert_eq!(period_key("not a date", Granularity::Month), UNKNOWN_PERIOD);
        assert_eq!(period_key("2024-13-40", Granularity::Month), UNKNOWN_PERIOD);
        assert_eq!(period_key("", Granularity::Quarter), UNKNOWN_PERIOD);
        assert_eq!(period_key("13", Granularity::Month), UNKNOWN_PERIOD);
        assert_eq!(period_key("0", Granularity::Month), UNKNOWN_PERIOD);
        // A bare month name has no year to build a quarter from.
        assert_eq!(period_key("Feb", Granularity::Quarter), UNKNOWN_PERIOD);
    }

    #[test]
    fn period_key_by_season_uses_calendar() {
        let calendar = SeasonCalendar::default();
        let season = Granularity::Season(&calendar);
        assert_eq!(period_key("2024-01-10", season), "Rabi");
        assert_eq!(period_key("2024-04-10", season), "Kharif-1");
        assert_eq!(period_key("2024-08-10", season), "Kharif-2");

        let partial = SeasonCalendar::new(vec![core_types::Season {
            name: "Boro".to_string(),
            months: vec![1, 2, 3],
        }]);
        assert_eq!(period_key("2024-06-01", Granularity::Season(&partial)), UNKNOWN_PERIOD);
    }

    #[test]
    fn unknown_sorts_after_every_known_period() {
        let dec_key = period_of("2024-12-01", Granularity::Month);
        assert!(dec_key.rank < PeriodKey::unknown().rank);
        let early = period_of("2023-12-01", Granularity::Quarter);
        let late = period_of("2024-01-01", Granularity::Quarter);
        assert!(early.rank < late.rank);
    }

    #[test]
    fn group_by_preserves_first_seen_order() {
        let items = ["Dhaka", "Khulna", "Dhaka", "Sylhet", "Khulna"];
        let groups = group_by(&items, |s| s.to_string());
        let keys: Vec<_> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Dhaka", "Khulna", "Sylhet"]);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[2].1.len(), 1);
    }
}
