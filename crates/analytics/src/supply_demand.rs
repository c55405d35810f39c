use crate::normalize::safe_ratio;
use core_types::{fields, Classification, DerivedMetric, EquilibriumState, ObservationRecord};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Default half-width of the `Balanced` band: a gap within ±2% of demand.
pub const DEFAULT_BALANCE_TOLERANCE: Decimal = dec!(0.02);

/// Signed gap between supply and demand. Positive is a surplus, negative a deficit.
pub fn supply_demand_gap(supply: Decimal, demand: Decimal) -> Decimal {
    supply.saturating_sub(demand)
}

/// The gap as a fraction of demand (`0.1` = 10% surplus). Zero demand yields `0`.
pub fn gap_pct(supply: Decimal, demand: Decimal) -> Decimal {
    safe_ratio(supply_demand_gap(supply, demand), demand)
}

/// Classifies a supply/demand pair.
///
/// Zero demand is `Balanced`. Otherwise the pair is `Balanced` when
/// `|supply - demand| / demand <= tolerance`, and `Surplus` or `Deficit` by
/// the sign of that ratio (`gap_pct`), which differs from the sign of the gap
/// when demand is negative. Negative inputs are not rejected; they flow
/// through the same arithmetic.
pub fn classify_equilibrium(
    supply: Decimal,
    demand: Decimal,
    tolerance: Decimal,
) -> EquilibriumState {
    if demand.is_zero() {
        return EquilibriumState::Balanced;
    }

    let gap = supply_demand_gap(supply, demand);
    // An overflowing ratio is far outside any tolerance; fall back to the raw sign.
    let ratio = gap.checked_div(demand).unwrap_or(gap);

    if ratio.abs() <= tolerance {
        EquilibriumState::Balanced
    } else if ratio.is_sign_positive() {
        EquilibriumState::Surplus
    } else {
        EquilibriumState::Deficit
    }
}

/// Estimated percentage price movement for a supply gap: `-elasticity * gap_pct * 100`.
///
/// `gap_pct` is a fraction as returned by [`gap_pct`]. With elasticity given as
/// a positive magnitude, a deficit (negative gap) yields a positive price move.
pub fn price_impact(elasticity: Decimal, gap_pct: Decimal) -> Decimal {
    elasticity
        .checked_mul(gap_pct)
        .and_then(|v| v.checked_mul(Decimal::from(100)))
        .map(|v| -v)
        .unwrap_or(Decimal::ZERO)
}

/// One derived row per demand-forecast record.
///
/// Missing supply or demand counts as `0`, so a row without demand is
/// `Balanced` with a zero gap percentage. Rows without their own `elasticity`
/// use `default_elasticity`.
pub fn supply_demand_rows(
    records: &[ObservationRecord],
    tolerance: Decimal,
    default_elasticity: Decimal,
) -> Vec<DerivedMetric> {
    records
        .iter()
        .map(|record| {
            let supply = record.field_any(fields::SUPPLY_ALIASES).unwrap_or_default();
            let demand = record.field_any(fields::DEMAND_ALIASES).unwrap_or_default();
            let elasticity = record.field(fields::ELASTICITY).unwrap_or(default_elasticity);
            let pct = gap_pct(supply, demand);

            let mut metric = DerivedMetric::new(record.key());
            metric.computed_fields.extend([
                (fields::SUPPLY_DEMAND_GAP.to_string(), supply_demand_gap(supply, demand)),
                (fields::GAP_PCT.to_string(), pct),
                (fields::PRICE_IMPACT_PCT.to_string(), price_impact(elasticity, pct)),
            ]);
            metric.classification = Some(Classification::Equilibrium(classify_equilibrium(
                supply, demand, tolerance,
            )));
            metric
        })
        .collect()
}

/// How many rows fell into each equilibrium state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EquilibriumCounts {
    pub surplus: usize,
    pub deficit: usize,
    pub balanced: usize,
}

impl EquilibriumCounts {
    pub fn tally(rows: &[DerivedMetric]) -> Self {
        rows.iter().fold(Self::default(), |mut counts, row| {
            match row.classification {
                Some(Classification::Equilibrium(EquilibriumState::Surplus)) => counts.surplus += 1,
                Some(Classification::Equilibrium(EquilibriumState::Deficit)) => counts.deficit += 1,
                Some(Classification::Equilibrium(EquilibriumState::Balanced)) => {
                    counts.balanced += 1
                }
                _ => {}
            }
            counts
        })
    }
}
