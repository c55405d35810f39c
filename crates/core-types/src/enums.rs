use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a supply/demand pair under a tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquilibriumState {
    Surplus,
    Deficit,
    Balanced,
}

impl EquilibriumState {
    /// Returns the state seen from the other side of the market.
    pub fn opposite(&self) -> Self {
        match self {
            EquilibriumState::Surplus => EquilibriumState::Deficit,
            EquilibriumState::Deficit => EquilibriumState::Surplus,
            EquilibriumState::Balanced => EquilibriumState::Balanced,
        }
    }
}

impl fmt::Display for EquilibriumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EquilibriumState::Surplus => "Surplus",
            EquilibriumState::Deficit => "Deficit",
            EquilibriumState::Balanced => "Balanced",
        };
        f.write_str(label)
    }
}

/// Where an actual nutrient intake sits relative to the recommended intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntakeStatus {
    Deficient,
    Adequate,
    Excessive,
}

impl fmt::Display for IntakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IntakeStatus::Deficient => "Deficient",
            IntakeStatus::Adequate => "Adequate",
            IntakeStatus::Excessive => "Excessive",
        };
        f.write_str(label)
    }
}

/// The optional classification attached to a `DerivedMetric`.
///
/// Serialized as `{"kind": "Equilibrium", "state": "Surplus"}` so the
/// presentation layer can switch on `kind` without guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state")]
pub enum Classification {
    Equilibrium(EquilibriumState),
    Intake(IntakeStatus),
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Equilibrium(state) => state.fmt(f),
            Classification::Intake(status) => status.fmt(f),
        }
    }
}

/// How a numeric field is folded into a period bucket.
///
/// Volumes are summed, prices and rates are averaged. Callers always state
/// the policy; it is never inferred from the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    Sum,
    Average,
}

/// The raw fact tables a dashboard can hand to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Production,
    Prices,
    Weather,
    Consumption,
    Nutrition,
    DemandForecasts,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::Production,
        Family::Prices,
        Family::Weather,
        Family::Consumption,
        Family::Nutrition,
        Family::DemandForecasts,
    ];

    /// The key used for this family in a dataset document.
    pub fn key(&self) -> &'static str {
        match self {
            Family::Production => "production",
            Family::Prices => "prices",
            Family::Weather => "weather",
            Family::Consumption => "consumption",
            Family::Nutrition => "nutrition",
            Family::DemandForecasts => "demand_forecasts",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Family {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.key() == s.trim())
            .ok_or_else(|| crate::CoreError::InvalidInput("family".to_string(), s.to_string()))
    }
}
