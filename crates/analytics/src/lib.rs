//! # Agricultural Metrics Aggregation Engine
//!
//! This crate turns raw per-record observations (production, price, weather,
//! consumption, nutrition, demand forecasts) into derived, comparable
//! indicators: supply/demand gaps and equilibrium, price margins and seasonal
//! variation, yield per area, nutrition compliance, and time-bucketed series.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** No storage, transport or rendering. Callers hand in
//!   slices of records and get fresh derived records back.
//! - **Sentinels, not failures:** A missing field, a zero denominator or an
//!   unparseable date resolves to a documented value (`0`, `None`, `"Unknown"`).
//!   Only malformed arguments, such as a non-array table or an empty field
//!   name, return an error.
//! - **Explicit conventions:** Gaps are `supply - demand` (surplus positive),
//!   nutrition gaps are `recommended - actual` (deficit positive), and the
//!   balanced band is a configured tolerance (±2% by default).
//!
//! ## Public API
//!
//! - The metric families: `normalize`, `supply_demand`, `price`, `production`,
//!   `nutrition`, `series`.
//! - `ingest`: conversion of raw JSON rows into `ObservationRecord`s.
//! - `MetricsEngine`: applies configured thresholds and produces a `MarketSnapshot`.
//! - `AnalyticsError`: the contract violations this crate can return.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod nutrition;
pub mod price;
pub mod production;
pub mod report;
pub mod series;
pub mod supply_demand;

// Re-export the key components to create a clean, public-facing API.
pub use engine::MetricsEngine;
pub use error::AnalyticsError;
pub use normalize::{group_by, period_key, to_number, Granularity};
pub use report::MarketSnapshot;
pub use series::{build_series, CalendarOrder, SeriesField};
