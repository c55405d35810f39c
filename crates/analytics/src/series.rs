//! Generic time-bucketed aggregation shared by every metric family.

use crate::error::AnalyticsError;
use crate::normalize::{percent_of, period_of, safe_ratio, season_key, Granularity, PeriodKey};
use core_types::{fields, AggregationPolicy, ObservationRecord, PeriodBucket};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// A numeric field to aggregate and how to fold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesField {
    pub name: String,
    pub policy: AggregationPolicy,
}

impl SeriesField {
    pub fn sum(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: AggregationPolicy::Sum,
        }
    }

    pub fn average(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: AggregationPolicy::Average,
        }
    }
}

impl FromStr for SeriesField {
    type Err = AnalyticsError;

    /// Parses `name:sum` or `name:avg` (also `name:average`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, policy) = s.rsplit_once(':').ok_or_else(|| {
            AnalyticsError::InvalidArgument(
                "series field".to_string(),
                format!("'{s}' must look like NAME:sum or NAME:avg"),
            )
        })?;
        let policy = match policy.trim().to_ascii_lowercase().as_str() {
            "sum" => AggregationPolicy::Sum,
            "avg" | "average" | "mean" => AggregationPolicy::Average,
            other => {
                return Err(AnalyticsError::InvalidArgument(
                    "series field".to_string(),
                    format!("unknown aggregation policy '{other}'"),
                ));
            }
        };
        Ok(Self {
            name: name.trim().to_string(),
            policy,
        })
    }
}

/// How buckets are ordered in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarOrder<'a> {
    /// Chronological order of the granularity.
    #[default]
    Natural,
    /// Listed labels first, in list order; unlisted labels follow in natural
    /// order. `"Unknown"` is always last.
    Explicit(&'a [String]),
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    totals: BTreeMap<String, (Decimal, usize)>,
}

/// Aggregates records into one bucket per distinct period.
///
/// The period of each record is read from `date_field` (any key-field alias
/// or label name). Records with a missing or unparseable date go to the
/// `"Unknown"` bucket, except under `Season` granularity where a record's own
/// `season` is used when the calendar knows it. A record missing a value
/// field does not contribute to that field; a bucket in which no record
/// carries a field omits it.
///
/// Fails only on malformed arguments: no fields, an empty name, a duplicated
/// field, or an empty `date_field`.
pub fn build_series(
    records: &[ObservationRecord],
    date_field: &str,
    value_fields: &[SeriesField],
    granularity: Granularity<'_>,
    order: CalendarOrder<'_>,
) -> Result<Vec<PeriodBucket>, AnalyticsError> {
    validate_fields(date_field, value_fields)?;

    let mut buckets: HashMap<PeriodKey, Accumulator> = HashMap::new();
    for record in records {
        let key = record_period(record, date_field, granularity);
        let acc = buckets.entry(key).or_default();
        acc.count += 1;
        for field in value_fields {
            if let Some(value) = record.field(&field.name) {
                let slot = acc
                    .totals
                    .entry(field.name.clone())
                    .or_insert((Decimal::ZERO, 0));
                slot.0 = slot.0.saturating_add(value);
                slot.1 += 1;
            }
        }
    }

    let mut keyed: Vec<(PeriodKey, Accumulator)> = buckets.into_iter().collect();
    keyed.sort_by(|(a, _), (b, _)| sort_rank(a, order).cmp(&sort_rank(b, order)));

    let series: Vec<PeriodBucket> = keyed
        .into_iter()
        .map(|(key, acc)| PeriodBucket {
            aggregated_fields: fold_fields(&acc, value_fields),
            period_label: key.label,
            count: acc.count,
        })
        .collect();

    tracing::debug!(
        records = records.len(),
        buckets = series.len(),
        "Built period series."
    );
    Ok(series)
}

/// Percentage change of `field` between consecutive buckets.
///
/// The first bucket reports `0`. A bucket where either side lacks the field,
/// or the previous value is zero, also reports `0`.
pub fn period_over_period_change(buckets: &[PeriodBucket], field: &str) -> Vec<PeriodChange> {
    let mut previous: Option<Decimal> = None;
    buckets
        .iter()
        .map(|bucket| {
            let current = bucket.value(field);
            let change_pct = match (previous, current) {
                (Some(prev), Some(curr)) => percent_of(curr.saturating_sub(prev), prev),
                _ => Decimal::ZERO,
            };
            previous = current;
            PeriodChange {
                period_label: bucket.period_label.clone(),
                change_pct,
            }
        })
        .collect()
}

/// Change of one field relative to the preceding period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodChange {
    pub period_label: String,
    pub change_pct: Decimal,
}

/// Rainfall summed, temperature and humidity averaged per period.
pub fn weather_series(
    records: &[ObservationRecord],
    granularity: Granularity<'_>,
    order: CalendarOrder<'_>,
) -> Result<Vec<PeriodBucket>, AnalyticsError> {
    build_series(
        records,
        fields::DATE,
        &[
            SeriesField::sum(fields::RAINFALL),
            SeriesField::average(fields::TEMPERATURE),
            SeriesField::average(fields::HUMIDITY),
        ],
        granularity,
        order,
    )
}

fn validate_fields(date_field: &str, value_fields: &[SeriesField]) -> Result<(), AnalyticsError> {
    if date_field.trim().is_empty() {
        return Err(AnalyticsError::InvalidArgument(
            "date_field".to_string(),
            "must name a field".to_string(),
        ));
    }
    if value_fields.is_empty() {
        return Err(AnalyticsError::InvalidArgument(
            "value_fields".to_string(),
            "at least one field is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for field in value_fields {
        if field.name.trim().is_empty() {
            return Err(AnalyticsError::InvalidArgument(
                "value_fields".to_string(),
                "field names must not be empty".to_string(),
            ));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(AnalyticsError::InvalidArgument(
                "value_fields".to_string(),
                format!("'{}' is listed more than once", field.name),
            ));
        }
    }
    Ok(())
}

fn record_period(
    record: &ObservationRecord,
    date_field: &str,
    granularity: Granularity<'_>,
) -> PeriodKey {
    let key = record
        .text(date_field)
        .map(|date| period_of(&date, granularity))
        .unwrap_or_else(PeriodKey::unknown);

    match granularity {
        Granularity::Season(calendar) if key.is_unknown() => {
            season_key(calendar, record.season.as_deref())
        }
        _ => key,
    }
}

fn sort_rank(key: &PeriodKey, order: CalendarOrder<'_>) -> (bool, usize, (bool, i32, u32)) {
    let listed = match order {
        CalendarOrder::Natural => None,
        CalendarOrder::Explicit(labels) => labels.iter().position(|label| *label == key.label),
    };
    match listed {
        Some(position) if !key.is_unknown() => (false, position, key.rank),
        _ => (true, 0, key.rank),
    }
}

fn fold_fields(acc: &Accumulator, value_fields: &[SeriesField]) -> BTreeMap<String, Decimal> {
    value_fields
        .iter()
        .filter_map(|field| {
            let &(total, n) = acc.totals.get(&field.name)?;
            let value = match field.policy {
                AggregationPolicy::Sum => total,
                AggregationPolicy::Average => safe_ratio(total, Decimal::from(n)),
            };
            Some((field.name.clone(), value))
        })
        .collect()
}
