use thiserror::Error;

/// Errors raised by the light-curve pipeline.
///
/// Malformed or flagged rows are not errors; the cleaning filters drop them
/// silently. Everything here aborts the current stage, except
/// [`PipelineError::NoFactorAvailable`] which the weather corrector handles
/// per record.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("line {line}: field '{field}' has unparseable value '{value}'")]
    MalformedInput {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error(
        "day transition detected at record {index} ({previous} -> {current}); \
         repair day transitions before normalising"
    )]
    DayTransition {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("{context}: need at least {needed} points, found {found}")]
    InsufficientData {
        needed: usize,
        found: usize,
        context: &'static str,
    },

    #[error("no alternate source provides a weather factor at t = {time}")]
    NoFactorAvailable { time: f64 },

    #[error("alternate source {series} is not chronological at point {index}")]
    UnsortedAlternate { series: usize, index: usize },

    #[error("alternate point at t = {time} has flux {flux}, factor is undefined")]
    InvalidFactor { time: f64, flux: f64 },

    #[error("unsupported export format: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
