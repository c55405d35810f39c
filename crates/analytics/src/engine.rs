use crate::error::AnalyticsError;
use crate::normalize::{mean, saturating_sum, Granularity};
use crate::report::MarketSnapshot;
use crate::series::{build_series, weather_series, CalendarOrder, SeriesField};
use crate::supply_demand::EquilibriumCounts;
use crate::{nutrition, price, production, supply_demand};
use configuration::{GranularityKind, Settings};
use rust_decimal::Decimal;
use core_types::{
    fields, Classification, Dataset, DerivedMetric, EquilibriumState, Family, GroupAverage,
    GroupTotals, IntakeStatus, ObservationRecord, PeriodBucket,
};

/// A stateless calculator that applies configured thresholds to the metric
/// functions.
///
/// The engine only holds read-only settings. Every call derives its output
/// from the records passed in and nothing else, so one engine can serve any
/// number of callers.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    settings: Settings,
}

impl MetricsEngine {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolves a configured granularity against the engine's season calendar.
    pub fn granularity(&self, kind: GranularityKind) -> Granularity<'_> {
        match kind {
            GranularityKind::Month => Granularity::Month,
            GranularityKind::Quarter => Granularity::Quarter,
            GranularityKind::YearMonth => Granularity::YearMonth,
            GranularityKind::Season => Granularity::Season(&self.settings.seasons),
        }
    }

    /// The configured label order, or natural order when none is set.
    pub fn calendar_order(&self) -> CalendarOrder<'_> {
        if self.settings.series.calendar_order.is_empty() {
            CalendarOrder::Natural
        } else {
            CalendarOrder::Explicit(&self.settings.series.calendar_order)
        }
    }

    /// Classifies a supply/demand pair with the configured tolerance.
    pub fn classify(&self, supply: Decimal, demand: Decimal) -> EquilibriumState {
        supply_demand::classify_equilibrium(
            supply,
            demand,
            self.settings.equilibrium.balance_tolerance_pct,
        )
    }

    pub fn supply_demand_rows(&self, records: &[ObservationRecord]) -> Vec<DerivedMetric> {
        supply_demand::supply_demand_rows(
            records,
            self.settings.equilibrium.balance_tolerance_pct,
            self.settings.equilibrium.default_elasticity,
        )
    }

    pub fn price_rows(&self, records: &[ObservationRecord]) -> Vec<DerivedMetric> {
        price::price_rows(records)
    }

    pub fn production_rows(&self, records: &[ObservationRecord]) -> Vec<DerivedMetric> {
        production::production_rows(records)
    }

    pub fn nutrition_rows(&self, records: &[ObservationRecord]) -> Vec<DerivedMetric> {
        nutrition::nutrition_rows(records, self.settings.nutrition.adequacy_band_pct)
    }

    pub fn regional(
        &self,
        records: &[ObservationRecord],
        group_field: &str,
        sum_fields: &[&str],
    ) -> Result<Vec<GroupTotals>, AnalyticsError> {
        production::regional_aggregate(records, group_field, sum_fields)
    }

    pub fn demographic(
        &self,
        records: &[ObservationRecord],
        group_field: &str,
        value_field: &str,
    ) -> Result<Vec<GroupAverage>, AnalyticsError> {
        nutrition::demographic_aggregate(records, group_field, value_field)
    }

    /// Builds a series dated by each record's `date` key field.
    pub fn series(
        &self,
        records: &[ObservationRecord],
        value_fields: &[SeriesField],
        kind: GranularityKind,
    ) -> Result<Vec<PeriodBucket>, AnalyticsError> {
        build_series(
            records,
            fields::DATE,
            value_fields,
            self.granularity(kind),
            self.calendar_order(),
        )
    }

    pub fn weather(
        &self,
        records: &[ObservationRecord],
        kind: GranularityKind,
    ) -> Result<Vec<PeriodBucket>, AnalyticsError> {
        weather_series(records, self.granularity(kind), self.calendar_order())
    }

    /// Summarises every fact table in the dataset.
    pub fn snapshot(&self, dataset: &Dataset) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new();
        snapshot.record_counts = Family::ALL
            .iter()
            .map(|family| (family.key().to_string(), dataset.records(*family).len()))
            .collect();

        if snapshot.record_counts.values().all(|count| *count == 0) {
            // Nothing to summarise; the zeroed report is the answer.
            return snapshot;
        }

        self.summarise_production(&dataset.production, &mut snapshot);
        snapshot.average_retail_margin_pct = price::average_margin(&dataset.prices);
        self.summarise_supply_demand(&dataset.demand_forecasts, &mut snapshot);
        self.summarise_nutrition(&dataset.nutrition, &mut snapshot);

        tracing::debug!(
            production = dataset.production.len(),
            prices = dataset.prices.len(),
            forecasts = dataset.demand_forecasts.len(),
            nutrition = dataset.nutrition.len(),
            "Computed market snapshot."
        );
        snapshot
    }

    fn summarise_production(&self, records: &[ObservationRecord], snapshot: &mut MarketSnapshot) {
        snapshot.total_production = production::total_production(records);
        snapshot.total_area = production::total_area(records);
        snapshot.overall_yield_per_area =
            production::yield_per_area(snapshot.total_production, snapshot.total_area);
        snapshot.net_surplus_deficit = production::net_surplus_deficit(records);
    }

    fn summarise_supply_demand(&self, records: &[ObservationRecord], snapshot: &mut MarketSnapshot) {
        let rows = self.supply_demand_rows(records);
        let counts = EquilibriumCounts::tally(&rows);
        snapshot.surplus_count = counts.surplus;
        snapshot.deficit_count = counts.deficit;
        snapshot.balanced_count = counts.balanced;
        snapshot.total_supply_demand_gap = saturating_sum(
            rows.iter()
                .filter_map(|row| row.computed(fields::SUPPLY_DEMAND_GAP)),
        );
    }

    fn summarise_nutrition(&self, records: &[ObservationRecord], snapshot: &mut MarketSnapshot) {
        let rows = self.nutrition_rows(records);
        // Rows without a recommendation carry no classification and a sentinel
        // compliance of 0; they are left out of the average.
        let classified: Vec<&DerivedMetric> =
            rows.iter().filter(|row| row.classification.is_some()).collect();

        snapshot.average_compliance_pct = mean(
            classified
                .iter()
                .filter_map(|row| row.computed(fields::COMPLIANCE_RATE_PCT)),
        );
        snapshot.deficient_count = classified
            .iter()
            .filter(|row| row.classification == Some(Classification::Intake(IntakeStatus::Deficient)))
            .count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::settings_from_toml;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_dataset_yields_zeroed_snapshot() {
        let engine = MetricsEngine::default();
        let snapshot = engine.snapshot(&Dataset::default());

        assert_eq!(snapshot.total_production, dec!(0));
        assert_eq!(snapshot.average_retail_margin_pct, None);
        assert_eq!(snapshot.average_compliance_pct, None);
        assert_eq!(snapshot.surplus_count, 0);
        assert_eq!(snapshot.record_counts.len(), Family::ALL.len());
        assert!(snapshot.record_counts.values().all(|count| *count == 0));
        assert_eq!(snapshot.record_counts.get("demand_forecasts"), Some(&0));
    }

    #[test]
    fn configured_tolerance_widens_balanced_band() {
        let strict = MetricsEngine::default();
        let loose = MetricsEngine::new(
            settings_from_toml("[equilibrium]\nbalance_tolerance_pct = 0.10").expect("valid"),
        );
        assert_eq!(strict.classify(dec!(105), dec!(100)), EquilibriumState::Surplus);
        assert_eq!(loose.classify(dec!(105), dec!(100)), EquilibriumState::Balanced);
    }

    #[test]
    fn season_granularity_uses_configured_calendar() {
        let engine = MetricsEngine::default();
        let records = vec![
            ObservationRecord::new().with_date("2024-08-01").with_field("rainfall", dec!(300)),
            ObservationRecord::new().with_date("2024-01-01").with_field("rainfall", dec!(10)),
        ];
        let series = engine.weather(&records, GranularityKind::Season).expect("valid");
        let labels: Vec<_> = series.iter().map(|b| b.period_label.as_str()).collect();
        assert_eq!(labels, vec!["Rabi", "Kharif-2"]);
    }

    #[test]
    fn snapshot_summarises_each_family() {
        let dataset = Dataset {
            production: vec![
                ObservationRecord::new()
                    .with_location("Dhaka")
                    .with_field("quantity_produced", dec!(5000))
                    .with_field("acreage", dec!(1200))
                    .with_field("surplus_deficit", dec!(300)),
                ObservationRecord::new()
                    .with_location("Chittagong")
                    .with_field("quantity_produced", dec!(3000))
                    .with_field("acreage", dec!(800))
                    .with_field("surplus_deficit", dec!(-500)),
            ],
            prices: vec![
                ObservationRecord::new()
                    .with_field("wholesale_price", dec!(40))
                    .with_field("retail_price", dec!(45)),
            ],
            demand_forecasts: vec![
                ObservationRecord::new()
                    .with_field("supply", dec!(100))
                    .with_field("demand", dec!(150)),
                ObservationRecord::new()
                    .with_field("supply", dec!(100))
                    .with_field("demand", dec!(100)),
            ],
            nutrition: vec![
                ObservationRecord::new()
                    .with_field("actual_intake", dec!(60))
                    .with_field("recommended_intake", dec!(100)),
                ObservationRecord::new()
                    .with_field("actual_intake", dec!(100))
                    .with_field("recommended_intake", dec!(100)),
                ObservationRecord::new().with_field("actual_intake", dec!(10)),
            ],
            ..Dataset::default()
        };

        let snapshot = MetricsEngine::default().snapshot(&dataset);
        assert_eq!(snapshot.total_production, dec!(8000));
        assert_eq!(snapshot.total_area, dec!(2000));
        assert_eq!(snapshot.overall_yield_per_area, dec!(4));
        assert_eq!(snapshot.net_surplus_deficit, dec!(-200));
        assert_eq!(snapshot.average_retail_margin_pct, Some(dec!(12.5)));
        assert_eq!(snapshot.deficit_count, 1);
        assert_eq!(snapshot.balanced_count, 1);
        assert_eq!(snapshot.total_supply_demand_gap, dec!(-50));
        assert_eq!(snapshot.average_compliance_pct, Some(dec!(80)));
        assert_eq!(snapshot.deficient_count, 1);
        assert_eq!(snapshot.record_counts["nutrition"], 3);
        assert_eq!(snapshot.record_counts["weather"], 0);
    }
}
