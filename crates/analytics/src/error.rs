use core_types::CoreError;
use thiserror::Error;

/// Contract violations raised by the engine.
///
/// Missing fields, zero denominators and unparseable dates are data-quality
/// conditions and never surface here; they resolve to documented sentinels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Invalid argument '{0}': {1}")]
    InvalidArgument(String, String),

    #[error("Record contract violation: {0}")]
    Contract(#[from] CoreError),
}
