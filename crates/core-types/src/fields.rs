//! Canonical field names shared by the ingestion layer, the engine and the
//! renderers. Output field names are part of the presentation contract and
//! must stay stable.

// --- Key field aliases, in lookup priority order ---
pub const SUBJECT_ID_ALIASES: &[&str] = &["subject_id", "product_id", "id"];
pub const SUBJECT_NAME_ALIASES: &[&str] = &["subject_name", "product_name", "name"];
pub const LOCATION_ALIASES: &[&str] = &["location", "district", "region", "division"];
pub const DATE_ALIASES: &[&str] = &["date", "record_date", "price_date", "production_date", "month"];
pub const SEASON_ALIASES: &[&str] = &["season"];

/// Canonical names the key fields are exposed under for grouping and dating.
pub const SUBJECT_ID: &str = "subject_id";
pub const SUBJECT_NAME: &str = "subject_name";
pub const LOCATION: &str = "location";
pub const DATE: &str = "date";
pub const SEASON: &str = "season";

// --- Raw numeric inputs ---
pub const SUPPLY: &str = "supply";
pub const DEMAND: &str = "demand";
pub const ELASTICITY: &str = "elasticity";
pub const WHOLESALE_PRICE: &str = "wholesale_price";
pub const RETAIL_PRICE: &str = "retail_price";
pub const HARVEST_PRICE: &str = "harvest_price";
pub const CURRENT_PRICE: &str = "current_price";
pub const QUANTITY_PRODUCED: &str = "quantity_produced";
pub const ACREAGE: &str = "acreage";
pub const TARGET_PRODUCTION: &str = "target_production";
pub const SURPLUS_DEFICIT: &str = "surplus_deficit";
pub const ACTUAL_INTAKE: &str = "actual_intake";
pub const RECOMMENDED_INTAKE: &str = "recommended_intake";
pub const PER_CAPITA_INTAKE: &str = "per_capita_intake";
pub const RAINFALL: &str = "rainfall";
pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";

/// Alternative spellings accepted for some numeric inputs.
pub const WHOLESALE_ALIASES: &[&str] = &[WHOLESALE_PRICE, "wholesale"];
pub const RETAIL_ALIASES: &[&str] = &[RETAIL_PRICE, "retail"];
pub const SUPPLY_ALIASES: &[&str] = &[SUPPLY, "supply_quantity", "projected_supply"];
pub const DEMAND_ALIASES: &[&str] = &[DEMAND, "demand_quantity", "projected_demand"];
pub const AREA_ALIASES: &[&str] = &[ACREAGE, "area", "cultivated_area"];
pub const ACTUAL_INTAKE_ALIASES: &[&str] = &[ACTUAL_INTAKE, PER_CAPITA_INTAKE, "intake"];
pub const RECOMMENDED_INTAKE_ALIASES: &[&str] = &[RECOMMENDED_INTAKE, "recommended_amount", "rda"];

// --- Derived outputs ---
pub const SUPPLY_DEMAND_GAP: &str = "supply_demand_gap";
pub const GAP_PCT: &str = "gap_pct";
pub const PRICE_IMPACT_PCT: &str = "price_impact_pct";
pub const RETAIL_MARGIN_PCT: &str = "retail_margin_pct";
pub const PRICE_SPREAD: &str = "price_spread";
pub const SEASONAL_VARIATION_PCT: &str = "seasonal_variation_pct";
pub const YIELD_PER_AREA: &str = "yield_per_area";
pub const NET_SURPLUS_DEFICIT: &str = "net_surplus_deficit";
pub const COMPLIANCE_RATE_PCT: &str = "compliance_rate_pct";
pub const NUTRITION_GAP: &str = "nutrition_gap";
