//! Error types for grid construction, queries and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors that can occur while building, querying or persisting a [`GridIndex`](crate::GridIndex).
///
/// The search algorithms themselves never fail; every variant here is raised
/// by validation before the core runs, or by the persistence layer.
#[derive(Debug, Error)]
pub enum GridError {
    /// The point set contains no points.
    #[error("Data: must contain at least one point")]
    EmptyData,

    /// Points were declared with zero coordinates.
    #[error("Data: dimension must be at least 1")]
    ZeroDimension,

    /// Flat coordinate buffer is not a whole number of points.
    #[error("Data: {len} coordinates cannot be split into points of dimension {dim}")]
    RaggedData {
        /// Length of the flat buffer
        len: usize,
        /// Declared dimension
        dim: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("Data: point {index} has a non-finite coordinate")]
    NonFiniteData {
        /// Index of the offending point
        index: usize,
    },

    /// Cell count per axis must be positive.
    #[error("N_cells: must be at least 1, got {0}")]
    InvalidCellCount(usize),

    /// Bin padding must be a positive finite number.
    #[error("Epsilon: must be finite and positive, got {0}")]
    InvalidEpsilon(f64),

    /// `n_cells^dim` does not fit in a packed cell key.
    #[error("N_cells: {n_cells}^{dim} cells cannot be addressed with 64-bit cell keys")]
    GridTooLarge {
        /// Cells per axis
        n_cells: usize,
        /// Dimension of the points
        dim: usize,
    },

    /// A periodic axis refers to a dimension the data does not have.
    #[error("Periodic: axis {axis} is out of range for dimension {dim}")]
    InvalidPeriodicAxis {
        /// Offending axis
        axis: usize,
        /// Dimension of the points
        dim: usize,
    },

    /// A periodic range is not a finite `low < high` pair.
    #[error("Periodic: axis {axis} has invalid range ({low}, {high})")]
    InvalidPeriodicRange {
        /// Offending axis
        axis: usize,
        /// Lower domain edge
        low: f64,
        /// Upper domain edge
        high: f64,
    },

    /// A data point lies outside a periodic domain.
    #[error("Periodic: point {index} lies outside the domain of axis {axis}")]
    OutOfPeriodicDomain {
        /// Offending point
        index: usize,
        /// Periodic axis
        axis: usize,
    },

    /// Metric name does not match a built-in metric.
    #[error("Metric: unknown name '{0}', options are euclid, haversine, vincenty or a custom metric")]
    UnknownMetric(String),

    /// No query centres were supplied.
    #[error("Centres: must contain at least one centre")]
    EmptyCentres,

    /// Centres do not have the dimension of the indexed data.
    #[error("Centres: expected dimension {expected}, got {actual} coordinates")]
    DimensionMismatch {
        /// Dimension of the indexed data
        expected: usize,
        /// Coordinates supplied
        actual: usize,
    },

    /// A centre coordinate is NaN or infinite.
    #[error("Centres: centre {index} has a non-finite coordinate")]
    NonFiniteCentre {
        /// Index of the offending centre
        index: usize,
    },

    /// Per-centre bounds do not line up with the centres.
    #[error("Distance: got {bounds} bounds for {centres} centres")]
    BoundCountMismatch {
        /// Number of centres
        centres: usize,
        /// Number of bounds
        bounds: usize,
    },

    /// A distance bound is negative or non-finite.
    #[error("Distance: bound {0} must be finite and non-negative")]
    InvalidBound(f64),

    /// Shell lower bound above its upper bound.
    #[error("Distance: lower bound {lower} is greater than upper bound {upper}")]
    InvertedShell {
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// A bound reaches further than one periodic range.
    #[error("Distance: bound {bound} exceeds the periodic range {period} of axis {axis}")]
    BoundExceedsPeriod {
        /// Offending bound
        bound: f64,
        /// Periodic axis
        axis: usize,
        /// Length of the periodic range
        period: f64,
    },

    /// Requested neighbor count cannot be satisfied.
    #[error("Nearest: n must be between 1 and {available}, got {requested}")]
    InvalidNeighborCount {
        /// Requested neighbors
        requested: usize,
        /// Points in the index
        available: usize,
    },

    /// Refusing to overwrite an existing snapshot.
    #[error("Persistence: file {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// Snapshot file does not exist.
    #[error("Persistence: file {} not found", .0.display())]
    NotFound(PathBuf),

    /// Snapshot contents are inconsistent.
    #[error("Persistence: corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GridError::DimensionMismatch { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "Centres: expected dimension 3, got 2 coordinates");

        let err = GridError::AlreadyExists(PathBuf::from("grid.json"));
        assert!(err.to_string().contains("grid.json"));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err: GridError = io.into();
        assert!(matches!(err, GridError::Io(_)));
    }
}
