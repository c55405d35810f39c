use crate::enums::{Classification, Family};
use crate::fields;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// One raw fact from a production, price, weather, consumption, nutrition or
/// demand-forecast table.
///
/// Key fields are optional because the source tables are inconsistent about
/// which ones they carry. Numeric measurements live in `numeric_fields`; any
/// other textual attribute (e.g. `demographic_group`, `crop_type`) is kept in
/// `labels` so it can still be grouped on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default)]
    pub numeric_fields: BTreeMap<String, Decimal>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObservationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.subject_id = Some(id.into());
        self.subject_name = Some(name.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Decimal) -> Self {
        self.numeric_fields.insert(name.into(), value);
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    /// Returns a numeric field, or `None` if the record does not carry it.
    pub fn field(&self, name: &str) -> Option<Decimal> {
        self.numeric_fields.get(name).copied()
    }

    /// Returns the first numeric field present among `names`.
    pub fn field_any(&self, names: &[&str]) -> Option<Decimal> {
        names.iter().find_map(|name| self.field(name))
    }

    /// Looks up a textual attribute by name.
    ///
    /// Key fields answer to their canonical name and to every alias the
    /// ingestion layer accepts (so grouping on `"district"` finds `location`).
    /// Anything else is looked up in `labels`, then in `numeric_fields`, so a
    /// numeric code such as a `year` or an age group still reads as text.
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        let key_field = if fields::SUBJECT_ID_ALIASES.contains(&name) {
            Some(&self.subject_id)
        } else if fields::SUBJECT_NAME_ALIASES.contains(&name) {
            Some(&self.subject_name)
        } else if fields::LOCATION_ALIASES.contains(&name) {
            Some(&self.location)
        } else if fields::DATE_ALIASES.contains(&name) {
            Some(&self.date)
        } else if fields::SEASON_ALIASES.contains(&name) {
            Some(&self.season)
        } else {
            None
        };

        match key_field {
            Some(value) => value.as_deref().map(Cow::Borrowed),
            None => match self.labels.get(name) {
                Some(label) => Some(Cow::Borrowed(label.as_str())),
                None => self
                    .field(name)
                    .map(|value| Cow::Owned(value.normalize().to_string())),
            },
        }
    }

    /// The key fields echoed onto every derived record.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            subject_id: self.subject_id.clone(),
            subject_name: self.subject_name.clone(),
            location: self.location.clone(),
            date: self.date.clone(),
            season: self.season.clone(),
        }
    }
}

/// Identifying fields of an input record, echoed unchanged onto its output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

impl RecordKey {
    fn write_into(&self, row: &mut Map<String, Value>) {
        let pairs = [
            (fields::SUBJECT_ID, &self.subject_id),
            (fields::SUBJECT_NAME, &self.subject_name),
            (fields::LOCATION, &self.location),
            (fields::DATE, &self.date),
            (fields::SEASON, &self.season),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                row.insert(name.to_string(), Value::String(value.clone()));
            }
        }
    }
}

/// One derived record per input record (row-wise transforms) or per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetric {
    #[serde(flatten)]
    pub key: RecordKey,
    pub computed_fields: BTreeMap<String, Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl DerivedMetric {
    pub fn new(key: RecordKey) -> Self {
        Self {
            key,
            computed_fields: BTreeMap::new(),
            classification: None,
        }
    }

    pub fn computed(&self, name: &str) -> Option<Decimal> {
        self.computed_fields.get(name).copied()
    }

    /// Flattens the record into a single key/value row for report exports.
    pub fn to_flat_row(&self) -> Map<String, Value> {
        let mut row = Map::new();
        self.key.write_into(&mut row);
        for (name, value) in &self.computed_fields {
            row.insert(name.clone(), decimal_value(*value));
        }
        if let Some(classification) = &self.classification {
            row.insert(
                "classification".to_string(),
                Value::String(classification.to_string()),
            );
        }
        row
    }
}

/// Output of the series builder: one bucket per distinct period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub period_label: String,
    pub aggregated_fields: BTreeMap<String, Decimal>,
    /// Number of input records that fell into this period.
    pub count: usize,
}

impl PeriodBucket {
    pub fn value(&self, name: &str) -> Option<Decimal> {
        self.aggregated_fields.get(name).copied()
    }

    pub fn to_flat_row(&self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("period".to_string(), Value::String(self.period_label.clone()));
        row.insert("count".to_string(), Value::from(self.count));
        for (name, value) in &self.aggregated_fields {
            row.insert(name.clone(), decimal_value(*value));
        }
        row
    }
}

/// Per-group totals produced by the regional aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotals {
    pub group: String,
    pub totals: BTreeMap<String, Decimal>,
    pub net_surplus_deficit: Decimal,
    pub yield_per_area: Decimal,
    pub count: usize,
}

impl GroupTotals {
    pub fn total(&self, name: &str) -> Option<Decimal> {
        self.totals.get(name).copied()
    }
}

/// Per-group mean of one field, e.g. intake per demographic group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAverage {
    pub group: String,
    pub average: Decimal,
    /// Number of records that contributed a value.
    pub count: usize,
}

/// A named season and the calendar months (1..=12) it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub months: Vec<u32>,
}

/// A caller-supplied date→season rule. Seasons are ordered as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    pub seasons: Vec<Season>,
}

impl SeasonCalendar {
    pub fn new(seasons: Vec<Season>) -> Self {
        Self { seasons }
    }

    /// The season covering `month`, if any season claims it.
    pub fn season_for_month(&self, month: u32) -> Option<&str> {
        self.seasons
            .iter()
            .find(|season| season.months.contains(&month))
            .map(|season| season.name.as_str())
    }

    /// Declared position of a season label, used for chronological ordering.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.seasons.iter().position(|season| season.name == label)
    }
}

impl Default for SeasonCalendar {
    /// The Bangladesh cropping calendar: Rabi (winter), Kharif-1 (pre-monsoon),
    /// Kharif-2 (monsoon), in agricultural-year order.
    fn default() -> Self {
        Self::new(vec![
            Season {
                name: "Rabi".to_string(),
                months: vec![11, 12, 1, 2],
            },
            Season {
                name: "Kharif-1".to_string(),
                months: vec![3, 4, 5, 6],
            },
            Season {
                name: "Kharif-2".to_string(),
                months: vec![7, 8, 9, 10],
            },
        ])
    }
}

/// All fact tables supplied for one dashboard view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub production: Vec<ObservationRecord>,
    #[serde(default)]
    pub prices: Vec<ObservationRecord>,
    #[serde(default)]
    pub weather: Vec<ObservationRecord>,
    #[serde(default)]
    pub consumption: Vec<ObservationRecord>,
    #[serde(default)]
    pub nutrition: Vec<ObservationRecord>,
    #[serde(default)]
    pub demand_forecasts: Vec<ObservationRecord>,
}

impl Dataset {
    pub fn records(&self, family: Family) -> &[ObservationRecord] {
        match family {
            Family::Production => &self.production,
            Family::Prices => &self.prices,
            Family::Weather => &self.weather,
            Family::Consumption => &self.consumption,
            Family::Nutrition => &self.nutrition,
            Family::DemandForecasts => &self.demand_forecasts,
        }
    }

    pub fn records_mut(&mut self, family: Family) -> &mut Vec<ObservationRecord> {
        match family {
            Family::Production => &mut self.production,
            Family::Prices => &mut self.prices,
            Family::Weather => &mut self.weather,
            Family::Consumption => &mut self.consumption,
            Family::Nutrition => &mut self.nutrition,
            Family::DemandForecasts => &mut self.demand_forecasts,
        }
    }
}

/// Renders a decimal as a JSON number, or `null` if it cannot be represented.
pub fn decimal_value(value: Decimal) -> Value {
    value
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EquilibriumState;
    use rust_decimal_macros::dec;

    #[test]
    fn text_resolves_key_field_aliases_and_labels() {
        let record = ObservationRecord::new()
            .with_location("Dhaka")
            .with_label("demographic_group", "Urban");

        assert_eq!(record.text("district").as_deref(), Some("Dhaka"));
        assert_eq!(record.text("location").as_deref(), Some("Dhaka"));
        assert_eq!(record.text("demographic_group").as_deref(), Some("Urban"));
        assert_eq!(record.text("season"), None);
        assert_eq!(record.text("crop_type"), None);
    }

    #[test]
    fn text_renders_numeric_fields_without_trailing_zeros() {
        let record = ObservationRecord::new()
            .with_field("year", dec!(2024))
            .with_field("age_group", dec!(18.0))
            .with_label("zone", "7");

        assert_eq!(record.text("year").as_deref(), Some("2024"));
        assert_eq!(record.text("age_group").as_deref(), Some("18"));
        assert_eq!(record.text("zone").as_deref(), Some("7"));
    }

    #[test]
    fn flat_row_carries_key_computed_and_classification() {
        let mut metric = DerivedMetric::new(
            ObservationRecord::new()
                .with_subject("p1", "Rice")
                .with_location("Dhaka")
                .key(),
        );
        metric
            .computed_fields
            .insert(fields::SUPPLY_DEMAND_GAP.to_string(), dec!(-250));
        metric.classification = Some(Classification::Equilibrium(EquilibriumState::Deficit));

        let row = metric.to_flat_row();
        assert_eq!(row["subject_name"], Value::from("Rice"));
        assert_eq!(row["location"], Value::from("Dhaka"));
        assert_eq!(row["supply_demand_gap"].as_f64(), Some(-250.0));
        assert_eq!(row["classification"], Value::from("Deficit"));
        assert!(!row.contains_key("date"));
    }

    #[test]
    fn bucket_flat_row_leads_with_period_and_count() {
        let bucket = PeriodBucket {
            period_label: "Q1 2024".to_string(),
            aggregated_fields: BTreeMap::from([
                (fields::RETAIL_PRICE.to_string(), dec!(52.5)),
                (fields::QUANTITY_PRODUCED.to_string(), dec!(1200)),
            ]),
            count: 3,
        };

        let row = bucket.to_flat_row();
        assert_eq!(row.len(), 4);
        assert_eq!(row["period"], Value::from("Q1 2024"));
        assert_eq!(row["count"], Value::from(3));
        assert_eq!(row["retail_price"].as_f64(), Some(52.5));
        assert_eq!(row["quantity_produced"].as_f64(), Some(1200.0));
    }

    #[test]
    fn default_season_calendar_covers_every_month_once() {
        let calendar = SeasonCalendar::default();
        for month in 1..=12 {
            assert!(calendar.season_for_month(month).is_some(), "month {month}");
        }
        assert_eq!(calendar.season_for_month(1), Some("Rabi"));
        assert_eq!(calendar.season_for_month(7), Some("Kharif-2"));
        assert_eq!(calendar.position("Kharif-1"), Some(1));
    }
}
