use std::path::PathBuf;

use thiserror::Error;

/// Possible reconstruction errors.
#[derive(Debug, Error)]
pub enum ReconstructError {
    /// The LUT data doesn't have the shape implied by its axes
    #[error("LUT data has shape {data:?} but the axes imply {axes:?}")]
    ShapeMismatch {
        /// Shape of the data array
        data: Vec<usize>,
        /// Lengths of the axes, in order
        axes: Vec<usize>,
    },

    /// An axis has no coordinates or they aren't strictly increasing
    #[error("axis '{0}' must be non-empty and strictly increasing")]
    InvalidAxis(String),

    /// A query used the wrong number of axes
    #[error("expected {expected} axes but got {actual}")]
    WrongAxisCount {
        /// Number of axes in the table
        expected: usize,
        /// Number of axes supplied
        actual: usize,
    },

    /// The per-axis query vectors don't all have the same length
    #[error("query vectors must all have the same length")]
    InconsistentQuery,

    /// A fractional index falls outside its axis, or is not finite
    #[error("fractional index {index} is outside axis '{axis}' (valid range 0..={max})")]
    IndexOutOfRange {
        /// Name of the axis
        axis: String,
        /// The offending fractional index
        index: f64,
        /// Largest valid fractional index
        max: f64,
    },

    /// A spectrum is empty, misaligned, or its wavelengths aren't increasing
    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(&'static str),

    /// Regression coefficients have the wrong layout
    #[error("invalid regression coefficients: {0}")]
    InvalidCoefficients(String),

    /// The gridded atmosphere fields don't match the grid
    #[error("atmosphere fields must be shaped (time, lat, lon) = {expected:?}, got {actual:?}")]
    InconsistentGrid {
        /// Shape implied by the grid coordinates
        expected: [usize; 3],
        /// Shape of the offending field
        actual: Vec<usize>,
    },

    /// A requested time is outside the gridded time steps
    #[error("time {time} h is outside the grid (0..={max} h)")]
    TimeOutOfRange {
        /// Requested time in hours
        time: f64,
        /// Last valid time in hours
        max: f64,
    },

    /// Reading an auxiliary data file failed
    #[error("couldn't read {path}")]
    Io {
        /// The file being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An auxiliary data file has a malformed line
    #[error("{path}, line {line}: {reason}")]
    Parse {
        /// The file being parsed
        path: PathBuf,
        /// One-based line number
        line: usize,
        /// What went wrong
        reason: String,
    },

    /// The operation was aborted early
    #[error("operation cancelled early")]
    Cancelled,
}
