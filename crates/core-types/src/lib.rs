pub mod enums;
pub mod error;
pub mod fields;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{AggregationPolicy, Classification, EquilibriumState, Family, IntakeStatus};
pub use error::CoreError;
pub use structs::{
    DerivedMetric, Dataset, GroupAverage, GroupTotals, ObservationRecord, PeriodBucket, RecordKey,
    Season, SeasonCalendar,
};
