use crate::error::AnalyticsError;
use crate::normalize::{group_by, mean, percent_of, UNKNOWN_GROUP};
use core_types::{fields, Classification, DerivedMetric, GroupAverage, IntakeStatus, ObservationRecord};
use rust_decimal::Decimal;

/// Actual intake as a percentage of the recommended intake. Zero recommendation yields `0`.
pub fn compliance_rate(actual_intake: Decimal, recommended_intake: Decimal) -> Decimal {
    percent_of(actual_intake, recommended_intake)
}

/// Shortfall against the recommendation. Positive means a deficit.
pub fn nutrition_gap(recommended_intake: Decimal, actual_intake: Decimal) -> Decimal {
    recommended_intake.saturating_sub(actual_intake)
}

/// Classifies a compliance percentage against a `100 ± band_pct` adequacy band.
pub fn classify_intake(compliance_pct: Decimal, band_pct: Decimal) -> IntakeStatus {
    let hundred = Decimal::from(100);
    if compliance_pct < hundred.saturating_sub(band_pct) {
        IntakeStatus::Deficient
    } else if compliance_pct > hundred.saturating_add(band_pct) {
        IntakeStatus::Excessive
    } else {
        IntakeStatus::Adequate
    }
}

/// Mean of `value_field` per value of `group_field`, in first-seen group order.
///
/// Records without `value_field` are skipped, so a group whose records all
/// lack it does not appear. Records lacking the group field are collected
/// under `"Unknown"`.
pub fn demographic_aggregate(
    records: &[ObservationRecord],
    group_field: &str,
    value_field: &str,
) -> Result<Vec<GroupAverage>, AnalyticsError> {
    for (argument, value) in [("group_field", group_field), ("value_field", value_field)] {
        if value.trim().is_empty() {
            return Err(AnalyticsError::InvalidArgument(
                argument.to_string(),
                "must name a field".to_string(),
            ));
        }
    }

    let with_value: Vec<&ObservationRecord> = records
        .iter()
        .filter(|record| record.field(value_field).is_some())
        .collect();

    let averages = group_by(&with_value, |record| {
        record
            .text(group_field)
            .map_or_else(|| UNKNOWN_GROUP.to_string(), |text| text.into_owned())
    })
    .into_iter()
    .filter_map(|(group, members)| {
        let average = mean(members.iter().filter_map(|r| r.field(value_field)))?;
        Some(GroupAverage {
            group,
            average,
            count: members.len(),
        })
    })
    .collect();

    Ok(averages)
}

/// One derived row per nutrition record.
///
/// Missing intakes count as `0`. The intake classification is only attached
/// when the record has a non-zero recommendation to compare against.
pub fn nutrition_rows(records: &[ObservationRecord], band_pct: Decimal) -> Vec<DerivedMetric> {
    records
        .iter()
        .map(|record| {
            let actual = record.field_any(fields::ACTUAL_INTAKE_ALIASES).unwrap_or_default();
            let recommended = record
                .field_any(fields::RECOMMENDED_INTAKE_ALIASES)
                .unwrap_or_default();
            let compliance = compliance_rate(actual, recommended);

            let mut metric = DerivedMetric::new(record.key());
            metric.computed_fields.extend([
                (fields::COMPLIANCE_RATE_PCT.to_string(), compliance),
                (fields::NUTRITION_GAP.to_string(), nutrition_gap(recommended, actual)),
            ]);
            if !recommended.is_zero() {
                metric.classification =
                    Some(Classification::Intake(classify_intake(compliance, band_pct)));
            }
            metric
        })
        .collect()
}
