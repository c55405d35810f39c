use crate::error::AnalyticsError;
use crate::normalize::{group_by, safe_ratio, saturating_sum, UNKNOWN_GROUP};
use core_types::{fields, DerivedMetric, GroupTotals, ObservationRecord};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Output per unit of cultivated area. Zero area yields `0`.
pub fn yield_per_area(quantity_produced: Decimal, area: Decimal) -> Decimal {
    safe_ratio(quantity_produced, area)
}

/// Signed difference between production and its target. Positive is a surplus.
pub fn surplus_deficit(production: Decimal, target: Decimal) -> Decimal {
    production.saturating_sub(target)
}

/// A record's own surplus/deficit: the explicit `surplus_deficit` field when
/// present, otherwise production minus `target_production` when both exist.
fn record_surplus_deficit(record: &ObservationRecord) -> Option<Decimal> {
    record.field(fields::SURPLUS_DEFICIT).or_else(|| {
        let produced = record.field(fields::QUANTITY_PRODUCED)?;
        let target = record.field(fields::TARGET_PRODUCTION)?;
        Some(surplus_deficit(produced, target))
    })
}

/// Sums `sum_fields` per value of `group_field`, in first-seen group order.
///
/// Each group also carries `net_surplus_deficit` (the sum of per-record
/// surplus/deficit) and `yield_per_area` computed from the group's total
/// `quantity_produced` over its total area, whether or not those fields were
/// requested. Records lacking the group field are collected under `"Unknown"`.
/// A requested field no record carries totals to `0`.
pub fn regional_aggregate(
    records: &[ObservationRecord],
    group_field: &str,
    sum_fields: &[&str],
) -> Result<Vec<GroupTotals>, AnalyticsError> {
    if group_field.trim().is_empty() {
        return Err(AnalyticsError::InvalidArgument(
            "group_field".to_string(),
            "must name a field".to_string(),
        ));
    }

    let groups = group_by(records, |record| {
        record
            .text(group_field)
            .map_or_else(|| UNKNOWN_GROUP.to_string(), |text| text.into_owned())
    });

    let totals = groups
        .into_iter()
        .map(|(group, members)| {
            let totals: BTreeMap<String, Decimal> = sum_fields
                .iter()
                .map(|name| {
                    let total = saturating_sum(members.iter().filter_map(|r| r.field(name)));
                    (name.to_string(), total)
                })
                .collect();

            let produced =
                saturating_sum(members.iter().filter_map(|r| r.field(fields::QUANTITY_PRODUCED)));
            let area = saturating_sum(members.iter().filter_map(|r| r.field_any(fields::AREA_ALIASES)));

            GroupTotals {
                group,
                totals,
                net_surplus_deficit: saturating_sum(
                    members.iter().filter_map(|r| record_surplus_deficit(r)),
                ),
                yield_per_area: yield_per_area(produced, area),
                count: members.len(),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(group_field, groups = totals.len(), "Aggregated production by group.");
    Ok(totals)
}

/// Total `quantity_produced` across records.
pub fn total_production(records: &[ObservationRecord]) -> Decimal {
    saturating_sum(records.iter().filter_map(|r| r.field(fields::QUANTITY_PRODUCED)))
}

/// Total cultivated area across records.
pub fn total_area(records: &[ObservationRecord]) -> Decimal {
    saturating_sum(records.iter().filter_map(|r| r.field_any(fields::AREA_ALIASES)))
}

/// Net surplus/deficit across records.
pub fn net_surplus_deficit(records: &[ObservationRecord]) -> Decimal {
    saturating_sum(records.iter().filter_map(record_surplus_deficit))
}

/// One derived row per production record with its yield and surplus/deficit.
pub fn production_rows(records: &[ObservationRecord]) -> Vec<DerivedMetric> {
    records
        .iter()
        .map(|record| {
            let produced = record.field(fields::QUANTITY_PRODUCED).unwrap_or_default();
            let area = record.field_any(fields::AREA_ALIASES).unwrap_or_default();

            let mut metric = DerivedMetric::new(record.key());
            metric.computed_fields.extend([
                (fields::YIELD_PER_AREA.to_string(), yield_per_area(produced, area)),
                (
                    fields::SURPLUS_DEFICIT.to_string(),
                    record_surplus_deficit(record).unwrap_or_default(),
                ),
            ]);
            metric
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn district(name: &str, produced: Decimal, acreage: Decimal) -> ObservationRecord {
        ObservationRecord::new()
            .with_location(name)
            .with_field("quantity_produced", produced)
            .with_field("acreage", acreage)
    }

    #[test]
    fn yield_guards_zero_area() {
        assert_eq!(yield_per_area(dec!(5000), dec!(1200)).round_dp(4), dec!(4.1667));
        assert_eq!(yield_per_area(dec!(5000), dec!(0)), dec!(0));
    }

    #[test]
    fn groups_sum_requested_fields_in_first_seen_order() {
        let records = vec![
            district("Rajshahi", dec!(100), dec!(50)).with_field("surplus_deficit", dec!(-20)),
            district("Bogura", dec!(300), dec!(100)).with_field("surplus_deficit", dec!(40)),
            district("Rajshahi", dec!(200), dec!(50)).with_field("surplus_deficit", dec!(5)),
        ];
        let totals = regional_aggregate(&records, "district", &["quantity_produced", "fertilizer"])
            .expect("valid group field");

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].group, "Rajshahi");
        assert_eq!(totals[0].count, 2);
        assert_eq!(totals[0].total("quantity_produced"), Some(dec!(300)));
        assert_eq!(totals[0].total("fertilizer"), Some(dec!(0)));
        assert_eq!(totals[0].net_surplus_deficit, dec!(-15));
        assert_eq!(totals[0].yield_per_area, dec!(3));
        assert_eq!(totals[1].group, "Bogura");
        assert_eq!(totals[1].net_surplus_deficit, dec!(40));
    }

    #[test]
    fn numeric_group_values_form_distinct_groups() {
        let records = crate::ingest::records_from_json(
            &serde_json::json!([
                {"district": "Dhaka", "year": 2023, "quantity_produced": 100},
                {"district": "Dhaka", "year": 2024, "quantity_produced": 150},
                {"district": "Sylhet", "year": "2023", "quantity_produced": 40}
            ]),
            "production",
        )
        .expect("array of objects");
        let totals = regional_aggregate(&records, "year", &["quantity_produced"])
            .expect("valid group field");

        let groups: Vec<&str> = totals.iter().map(|t| t.group.as_str()).collect();
        assert_eq!(groups, vec!["2023", "2024"]);
        assert_eq!(totals[0].total("quantity_produced"), Some(dec!(140)));
        assert_eq!(totals[1].count, 1);
    }

    #[test]
    fn surplus_deficit_falls_back_to_target() {
        let records = vec![
            district("Khulna", dec!(900), dec!(10)).with_field("target_production", dec!(1000)),
            ObservationRecord::new().with_field("quantity_produced", dec!(50)),
        ];
        let totals = regional_aggregate(&records, "district", &[]).expect("valid group field");
        assert_eq!(totals[0].net_surplus_deficit, dec!(-100));
        assert_eq!(totals[1].group, "Unknown");
        assert_eq!(totals[1].yield_per_area, dec!(0));
        assert_eq!(net_surplus_deficit(&records), dec!(-100));
    }

    #[test]
    fn empty_group_field_is_a_contract_violation() {
        assert!(regional_aggregate(&[], "", &["quantity_produced"]).is_err());
        assert_eq!(regional_aggregate(&[], "district", &[]), Ok(vec![]));
    }

    #[test]
    fn production_rows_report_yield_and_surplus() {
        let rows = production_rows(&[
            district("Dhaka", dec!(5000), dec!(1200)).with_field("target_production", dec!(4500)),
            district("Sylhet", dec!(10), dec!(0)),
        ]);
        assert_eq!(rows[0].computed("yield_per_area").map(|v| v.round_dp(4)), Some(dec!(4.1667)));
        assert_eq!(rows[0].computed("surplus_deficit"), Some(dec!(500)));
        assert_eq!(rows[1].computed("yield_per_area"), Some(dec!(0)));
        assert_eq!(rows[1].computed("surplus_deficit"), Some(dec!(0)));
    }
}
