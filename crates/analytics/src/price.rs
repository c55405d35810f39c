use crate::error::AnalyticsError;
use crate::normalize::{mean, percent_of, Granularity};
use crate::series::{build_series, CalendarOrder, SeriesField};
use core_types::{fields, DerivedMetric, ObservationRecord, PeriodBucket};
use rust_decimal::Decimal;

/// Retail markup over wholesale, in percent. Zero wholesale yields `0`.
pub fn retail_margin(retail: Decimal, wholesale: Decimal) -> Decimal {
    percent_of(retail.saturating_sub(wholesale), wholesale)
}

/// Current price relative to the harvest-time price, in percent. Zero harvest price yields `0`.
pub fn seasonal_variation(current: Decimal, harvest_price: Decimal) -> Decimal {
    percent_of(current.saturating_sub(harvest_price), harvest_price)
}

/// Absolute difference between retail and wholesale price.
pub fn price_spread(retail: Decimal, wholesale: Decimal) -> Decimal {
    retail.saturating_sub(wholesale)
}

/// Averages `value_field` per period. Records without the field are skipped
/// entirely, so they neither create buckets nor count towards them.
pub fn average_by_period(
    records: &[ObservationRecord],
    value_field: &str,
    granularity: Granularity<'_>,
) -> Result<Vec<PeriodBucket>, AnalyticsError> {
    let priced: Vec<ObservationRecord> = records
        .iter()
        .filter(|record| record.field(value_field).is_some())
        .cloned()
        .collect();

    build_series(
        &priced,
        fields::DATE,
        &[SeriesField::average(value_field)],
        granularity,
        CalendarOrder::Natural,
    )
}

/// Mean retail margin over the records that carry both prices.
/// Returns `None` when no record does.
pub fn average_margin(records: &[ObservationRecord]) -> Option<Decimal> {
    mean(records.iter().filter_map(|record| {
        let wholesale = record.field_any(fields::WHOLESALE_ALIASES)?;
        let retail = record.field_any(fields::RETAIL_ALIASES)?;
        Some(retail_margin(retail, wholesale))
    }))
}

/// One derived row per price record.
///
/// Missing prices count as `0`, which the zero guard turns into a `0` margin.
/// `seasonal_variation_pct` is only present when the record has a
/// `harvest_price`; the current price is `current_price` when given and the
/// wholesale price otherwise.
pub fn price_rows(records: &[ObservationRecord]) -> Vec<DerivedMetric> {
    records
        .iter()
        .map(|record| {
            let wholesale = record.field_any(fields::WHOLESALE_ALIASES).unwrap_or_default();
            let retail = record.field_any(fields::RETAIL_ALIASES).unwrap_or_default();

            let mut metric = DerivedMetric::new(record.key());
            metric.computed_fields.extend([
                (fields::RETAIL_MARGIN_PCT.to_string(), retail_margin(retail, wholesale)),
                (fields::PRICE_SPREAD.to_string(), price_spread(retail, wholesale)),
            ]);

            if let Some(harvest) = record.field(fields::HARVEST_PRICE) {
                let current = record.field(fields::CURRENT_PRICE).unwrap_or(wholesale);
                metric.computed_fields.insert(
                    fields::SEASONAL_VARIATION_PCT.to_string(),
                    seasonal_variation(current, harvest),
                );
            }
            metric
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn margin_and_variation_guard_zero() {
        assert_eq!(retail_margin(dec!(45), dec!(40)), dec!(12.5));
        assert_eq!(retail_margin(dec!(100), dec!(0)), dec!(0));
        assert_eq!(seasonal_variation(dec!(55), dec!(50)), dec!(10));
        assert_eq!(seasonal_variation(dec!(55), dec!(0)), dec!(0));
    }

    #[test]
    fn retail_below_wholesale_propagates_negative_margin() {
        assert_eq!(retail_margin(dec!(30), dec!(40)), dec!(-25));
    }

    #[test]
    fn average_margin_skips_incomplete_records() {
        let records = vec![
            ObservationRecord::new()
                .with_field("wholesale", dec!(40))
                .with_field("retail", dec!(45)),
            ObservationRecord::new().with_field("wholesale_price", dec!(10)),
            ObservationRecord::new()
                .with_field("wholesale_price", dec!(20))
                .with_field("retail_price", dec!(25)),
        ];
        // (12.5 + 25) / 2
        assert_eq!(average_margin(&records), Some(dec!(18.75)));
        assert_eq!(average_margin(&[]), None);
    }

    #[test]
    fn average_by_period_ignores_records_without_field() {
        let records = vec![
            ObservationRecord::new()
                .with_date("2024-02-10")
                .with_field("wholesale_price", dec!(40)),
            ObservationRecord::new()
                .with_date("2024-02-20")
                .with_field("wholesale_price", dec!(50)),
            ObservationRecord::new().with_date("2024-03-01"),
        ];
        let buckets =
            average_by_period(&records, "wholesale_price", Granularity::Month).expect("valid");
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].period_label, "Feb");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].value("wholesale_price"), Some(dec!(45)));
    }

    #[test]
    fn price_rows_include_variation_only_with_harvest_price() {
        let records = vec![
            ObservationRecord::new()
                .with_subject("1", "Rice")
                .with_field("wholesale_price", dec!(40))
                .with_field("retail_price", dec!(45))
                .with_field("harvest_price", dec!(32)),
            ObservationRecord::new()
                .with_subject("2", "Lentil")
                .with_field("retail_price", dec!(110)),
        ];
        let rows = price_rows(&records);

        assert_eq!(rows[0].computed("retail_margin_pct"), Some(dec!(12.5)));
        assert_eq!(rows[0].computed("price_spread"), Some(dec!(5)));
        assert_eq!(rows[0].computed("seasonal_variation_pct"), Some(dec!(25)));

        assert_eq!(rows[1].computed("retail_margin_pct"), Some(dec!(0)));
        assert_eq!(rows[1].computed("seasonal_variation_pct"), None);
    }
}
