use crate::error::ConfigError;
use core_types::SeasonCalendar;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashSet;

/// The root configuration structure for the metrics engine and its CLI.
///
/// Every section has a default, so an absent `agrimetrics.toml` is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub equilibrium: EquilibriumSettings,
    pub nutrition: NutritionSettings,
    pub series: SeriesSettings,
    /// Date→season rule used for `Season` granularity.
    pub seasons: SeasonCalendar,
    /// Decimal places used when rendering tables. The engine never rounds.
    pub display_decimals: u32,
}

/// Parameters for supply/demand classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EquilibriumSettings {
    /// Half-width of the `Balanced` band as a fraction of demand.
    /// 0.02 means a gap within ±2% of demand is balanced.
    pub balance_tolerance_pct: Decimal,
    /// Elasticity applied when a forecast row does not carry its own.
    pub default_elasticity: Decimal,
}

/// Parameters for classifying nutrient intake.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NutritionSettings {
    /// Compliance within `100 ± band` percent counts as adequate.
    pub adequacy_band_pct: Decimal,
}

/// Defaults for time-bucketed series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeriesSettings {
    pub granularity: GranularityKind,
    /// Explicit label order overriding calendar order (e.g. a July fiscal year).
    pub calendar_order: Vec<String>,
}

/// Period granularity as named in config files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum GranularityKind {
    Month,
    Quarter,
    YearMonth,
    Season,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            equilibrium: EquilibriumSettings::default(),
            nutrition: NutritionSettings::default(),
            series: SeriesSettings::default(),
            seasons: SeasonCalendar::default(),
            display_decimals: 2,
        }
    }
}

impl Default for EquilibriumSettings {
    fn default() -> Self {
        Self {
            balance_tolerance_pct: dec!(0.02),
            default_elasticity: dec!(-0.3),
        }
    }
}

impl Default for NutritionSettings {
    fn default() -> Self {
        Self {
            adequacy_band_pct: dec!(10),
        }
    }
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            granularity: GranularityKind::Month,
            calendar_order: Vec::new(),
        }
    }
}

impl Settings {
    /// Rejects settings the engine cannot apply consistently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.equilibrium.balance_tolerance_pct;
        if tolerance < Decimal::ZERO || tolerance >= Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "equilibrium.balance_tolerance_pct must be in [0, 1), got {tolerance}"
            )));
        }

        if self.nutrition.adequacy_band_pct < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "nutrition.adequacy_band_pct must not be negative, got {}",
                self.nutrition.adequacy_band_pct
            )));
        }

        let mut names = HashSet::new();
        let mut claimed_months = HashSet::new();
        for season in &self.seasons.seasons {
            if season.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "season names must not be empty".to_string(),
                ));
            }
            if !names.insert(season.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "season '{}' is declared more than once",
                    season.name
                )));
            }
            for &month in &season.months {
                if !(1..=12).contains(&month) {
                    return Err(ConfigError::ValidationError(format!(
                        "season '{}' lists month {month}, expected 1..=12",
                        season.name
                    )));
                }
                if !claimed_months.insert(month) {
                    return Err(ConfigError::ValidationError(format!(
                        "month {month} is assigned to more than one season"
                    )));
                }
            }
        }

        Ok(())
    }
}
