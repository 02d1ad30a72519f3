use thiserror::Error;

/// Result alias for `cohort`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the feature, reduction, and clustering stages.
///
/// Everything here aborts a run. Recoverable conditions (flat price
/// histories, empty clusters, hitting the iteration cap) are reported as
/// [`Diagnostic`]s on the outputs instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Input had no rows or no columns.
    #[error("empty input provided")]
    EmptyInput,

    /// A row did not match the width of the first row.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Input matrix contains NaN or an infinity.
    #[error("non-finite value at row {row}, column {col}")]
    NonFinite {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Price data could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the source.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Underlying I/O failure, stringified so the error stays `Clone`.
    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// True for the "fail fast before any computation" class of errors.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput
                | Error::DimensionMismatch { .. }
                | Error::NonFinite { .. }
                | Error::InvalidClusterCount { .. }
                | Error::InvalidParameter { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Non-fatal conditions observed during a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Missing (open, close) cells were imputed as a zero movement.
    ImputedCells {
        /// Number of imputed cells across the whole table.
        count: usize,
    },
    /// Rows whose L2 norm was zero and were left as the zero vector.
    ZeroNormRows {
        /// Row indices.
        rows: Vec<usize>,
    },
    /// Fewer distinct points than requested clusters.
    FewerDistinctPointsThanK {
        /// Distinct points found.
        distinct: usize,
        /// Requested cluster count.
        k: usize,
    },
    /// Clusters that ended the winning run with no members.
    EmptyClusters {
        /// Cluster ids.
        clusters: Vec<usize>,
    },
    /// The winning run stopped at the iteration cap without stabilizing.
    IterationCapReached {
        /// The cap that was hit.
        max_iter: usize,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ImputedCells { count } => {
                write!(f, "{count} missing cells filled with zero movement")
            }
            Diagnostic::ZeroNormRows { rows } => {
                write!(f, "{} rows have zero norm and stay zero", rows.len())
            }
            Diagnostic::FewerDistinctPointsThanK { distinct, k } => {
                write!(f, "only {distinct} distinct points for k = {k}")
            }
            Diagnostic::EmptyClusters { clusters } => {
                write!(f, "empty clusters: {clusters:?}")
            }
            Diagnostic::IterationCapReached { max_iter } => {
                write!(f, "stopped at iteration cap {max_iter} without converging")
            }
        }
    }
}
