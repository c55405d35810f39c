use thiserror::Error;

/// Contract violations at the record boundary.
///
/// These are programmer errors (wrong shapes handed to the engine), never
/// data-quality conditions. Missing or malformed values inside a well-shaped
/// record are absorbed by the engine's sentinels instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Expected a JSON array of records for '{0}', found {1}")]
    NotAnArray(String, String),

    #[error("Record {index} in '{source_name}' is not a JSON object (found {found})")]
    NotAnObject {
        source_name: String,
        index: usize,
        found: String,
    },

    #[error("Expected a JSON object for the dataset, found {0}")]
    InvalidDataset(String),

    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),
}
