//! Error types for nicheprep

use thiserror::Error;

/// Main error type for nicheprep operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid grid dimensions: {bands} bands of {rows}x{cols}")]
    InvalidDimensions {
        bands: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Index out of bounds: ({row}, {col}) in grid of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Operands of a grid operation disagree on shape, georeferencing or band count
    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    #[error("Band not found: {0}")]
    BandNotFound(String),

    #[error("Duplicate band name: {0}")]
    DuplicateBand(String),

    /// Too few samples for the requested statistic
    #[error("Insufficient data for {context}: need at least {needed}, found {found}")]
    InsufficientData {
        needed: usize,
        found: usize,
        context: String,
    },

    /// A region reduction would touch more pixels than the configured budget
    #[error("Resource exceeded: reduction needs {required} pixels, budget is {budget}")]
    ResourceExceeded { required: u64, budget: u64 },

    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Other(e.to_string())
    }
}

/// Result type alias for nicheprep operations
pub type Result<T> = std::result::Result<T, Error>;
