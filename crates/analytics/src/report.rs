use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// A one-screen summary of every fact table in a dataset.
///
/// This struct is the output of `MetricsEngine::snapshot` and is what the
/// overview dashboard and the report export render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    // I. Production
    pub total_production: Decimal,
    pub total_area: Decimal,
    pub overall_yield_per_area: Decimal,
    pub net_surplus_deficit: Decimal,

    // II. Prices
    pub average_retail_margin_pct: Option<Decimal>, // Option<> because no record may carry both prices

    // III. Supply and demand
    pub surplus_count: usize,
    pub deficit_count: usize,
    pub balanced_count: usize,
    pub total_supply_demand_gap: Decimal,

    // IV. Nutrition
    pub average_compliance_pct: Option<Decimal>, // Option<> for cases with no recommendation to compare against
    pub deficient_count: usize,

    // V. Coverage
    pub record_counts: BTreeMap<String, usize>,
}

impl MarketSnapshot {
    /// Creates a zeroed-out snapshot, the result for an empty dataset.
    pub fn new() -> Self {
        Self {
            total_production: Decimal::ZERO,
            total_area: Decimal::ZERO,
            overall_yield_per_area: Decimal::ZERO,
            net_surplus_deficit: Decimal::ZERO,
            average_retail_margin_pct: None,
            surplus_count: 0,
            deficit_count: 0,
            balanced_count: 0,
            total_supply_demand_gap: Decimal::ZERO,
            average_compliance_pct: None,
            deficient_count: 0,
            record_counts: BTreeMap::new(),
        }
    }
}

impl Default for MarketSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
