use analytics::ingest::dataset_from_json;
use analytics::series::SeriesField;
use analytics::MetricsEngine;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use configuration::{load_settings, load_settings_from, GranularityKind};
use core_types::{Dataset, Family};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod render;

/// The main entry point for the agrimetrics command-line tool.
fn main() -> Result<()> {
    // A missing .env file is fine; it only supplies optional overrides.
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    }
    .context("Failed to load settings")?;
    let decimals = settings.display_decimals;
    let engine = MetricsEngine::new(settings);

    // Execute the appropriate command
    let output = match cli.command {
        Commands::Snapshot(args) => {
            let dataset = load_dataset(&args.input)?;
            let snapshot = engine.snapshot(&dataset);
            Output {
                json: serde_json::to_value(&snapshot)?,
                table: render::snapshot_table(&snapshot, decimals),
            }
        }
        Commands::Equilibrium(args) => {
            let dataset = load_dataset(&args.input)?;
            let rows = engine.supply_demand_rows(&dataset.demand_forecasts);
            Output {
                json: flat_rows(rows.iter().map(|r| r.to_flat_row())),
                table: render::metric_table(&rows, decimals),
            }
        }
        Commands::Prices(args) => {
            let dataset = load_dataset(&args.input)?;
            let rows = engine.price_rows(&dataset.prices);
            Output {
                json: flat_rows(rows.iter().map(|r| r.to_flat_row())),
                table: render::metric_table(&rows, decimals),
            }
        }
        Commands::Production(args) => {
            let dataset = load_dataset(&args.input)?;
            let rows = engine.production_rows(&dataset.production);
            Output {
                json: flat_rows(rows.iter().map(|r| r.to_flat_row())),
                table: render::metric_table(&rows, decimals),
            }
        }
        Commands::Regional(args) => {
            let dataset = load_dataset(&args.input.input)?;
            let sums: Vec<&str> = args.sums.iter().map(String::as_str).collect();
            let totals = engine.regional(&dataset.production, &args.group, &sums)?;
            Output {
                json: serde_json::to_value(&totals)?,
                table: render::group_totals_table(&totals, &sums, decimals),
            }
        }
        Commands::Nutrition(args) => {
            let dataset = load_dataset(&args.input.input)?;
            match &args.group {
                Some(group) => {
                    let averages = engine.demographic(&dataset.nutrition, group, &args.value)?;
                    Output {
                        json: serde_json::to_value(&averages)?,
                        table: render::group_average_table(&averages, &args.value, decimals),
                    }
                }
                None => {
                    let rows = engine.nutrition_rows(&dataset.nutrition);
                    Output {
                        json: flat_rows(rows.iter().map(|r| r.to_flat_row())),
                        table: render::metric_table(&rows, decimals),
                    }
                }
            }
        }
        Commands::Series(args) => {
            let dataset = load_dataset(&args.input.input)?;
            let kind = args
                .granularity
                .unwrap_or(engine.settings().series.granularity);
            let buckets = engine.series(dataset.records(args.family), &args.fields, kind)?;
            Output {
                json: flat_rows(buckets.iter().map(|b| b.to_flat_row())),
                table: render::bucket_table(&buckets, &args.fields, decimals),
            }
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output.json)?);
    } else {
        println!("{}", output.table);
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Derived agricultural market indicators from raw dashboard fact tables.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file to use instead of ./agrimetrics.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print flat JSON rows instead of a table.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise every fact table in the dataset.
    Snapshot(InputArgs),
    /// Supply/demand gap, equilibrium and price impact per forecast row.
    Equilibrium(InputArgs),
    /// Retail margin, spread and seasonal variation per price row.
    Prices(InputArgs),
    /// Yield per area and surplus/deficit per production row.
    Production(InputArgs),
    /// Production totals per region.
    Regional(RegionalArgs),
    /// Compliance per nutrition row, or averages per group with --group.
    Nutrition(NutritionArgs),
    /// Time-bucketed series over one fact table.
    Series(SeriesArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Dataset JSON file: {"production": [...], "prices": [...], ...}.
    #[arg(long)]
    input: PathBuf,
}

#[derive(Args)]
struct RegionalArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Field to group production rows by.
    #[arg(long, default_value = "district")]
    group: String,

    /// Field to total per group. Repeatable.
    #[arg(long = "sum", default_values_t = ["quantity_produced".to_string(), "acreage".to_string()])]
    sums: Vec<String>,
}

#[derive(Args)]
struct NutritionArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Group field (e.g. demographic_group) to average over.
    #[arg(long)]
    group: Option<String>,

    /// Field to average when grouping.
    #[arg(long, default_value = "actual_intake")]
    value: String,
}

#[derive(Args)]
struct SeriesArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Fact table to build the series from (e.g. prices, weather).
    #[arg(long)]
    family: Family,

    /// Field and policy as NAME:sum or NAME:avg. Repeatable.
    #[arg(long = "field", required = true)]
    fields: Vec<SeriesField>,

    /// Period granularity. Defaults to the configured one.
    #[arg(long, value_enum)]
    granularity: Option<GranularityKind>,
}

// ==============================================================================
// Helpers
// ==============================================================================

struct Output {
    json: Value,
    table: comfy_table::Table,
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Dataset {} is not valid JSON", path.display()))?;
    let dataset = dataset_from_json(&value)?;
    tracing::info!(path = %path.display(), "Loaded dataset.");
    Ok(dataset)
}

fn flat_rows(rows: impl Iterator<Item = Map<String, Value>>) -> Value {
    Value::Array(rows.map(Value::Object).collect())
}

/// Logs go to stderr so stdout stays clean for tables and JSON.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();
    guard
}
