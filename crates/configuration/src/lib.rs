use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    EquilibriumSettings, GranularityKind, NutritionSettings, SeriesSettings, Settings,
};

/// Prefix for environment overrides, e.g. `AGRIMETRICS__DISPLAY_DECIMALS=3`.
const ENV_PREFIX: &str = "AGRIMETRICS";

/// Loads settings from an optional `agrimetrics.toml` in the working directory.
///
/// A missing file is not an error: every value falls back to its default.
/// Environment variables prefixed with `AGRIMETRICS__` override file values.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("agrimetrics").required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
    finish(builder)
}

/// Loads settings from an explicit file. Unlike `load_settings`, the file must exist.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
    finish(builder)
}

/// Parses settings from an in-memory TOML document.
pub fn settings_from_toml(contents: &str) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(contents, config::FileFormat::Toml));
    finish(builder)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings, ConfigError> {
    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;
    tracing::debug!(
        tolerance = %settings.equilibrium.balance_tolerance_pct,
        seasons = settings.seasons.seasons.len(),
        "Loaded engine settings."
    );
    Ok(settings)
}
