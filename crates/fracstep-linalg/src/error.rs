//! Error types for matrix assembly and linear solves.

use std::error::Error;
use std::fmt;

/// Errors raised while building a sparse matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssemblyError {
    /// A row's actual nonzero count differs from its preallocated count.
    Preallocation {
        /// The offending row.
        row: usize,
        /// Preallocated (diagonal + off-diagonal block) count.
        expected: usize,
        /// Count produced by assembly.
        actual: usize,
    },
    /// Rows must be pushed in increasing order without gaps.
    RowOutOfOrder {
        /// Row that was expected next.
        expected: usize,
        /// Row that was pushed.
        found: usize,
    },
    /// A column index lies outside the matrix.
    ColumnOutOfRange {
        /// Row being assembled.
        row: usize,
        /// The offending column.
        col: usize,
        /// Number of columns of the matrix.
        ncols: usize,
    },
    /// Operand shapes are incompatible.
    DimensionMismatch {
        /// Description of the operation and the shapes involved.
        detail: String,
    },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preallocation {
                row,
                expected,
                actual,
            } => write!(
                f,
                "row {row} preallocated {expected} nonzeros but assembly produced {actual}"
            ),
            Self::RowOutOfOrder { expected, found } => {
                write!(f, "row {found} pushed while row {expected} was expected")
            }
            Self::ColumnOutOfRange { row, col, ncols } => {
                write!(f, "row {row}: column {col} outside 0..{ncols}")
            }
            Self::DimensionMismatch { detail } => write!(f, "dimension mismatch: {detail}"),
        }
    }
}

impl Error for AssemblyError {}

/// Errors raised by a linear-solver backend.
///
/// Non-convergence is not an error at this level: it is reported through
/// [`ConvergedReason`](crate::ConvergedReason) so the caller decides
/// whether it is fatal.
#[derive(Clone, Debug, PartialEq)]
pub enum SolverError {
    /// `solve` was called before `configure`.
    NotConfigured {
        /// Name of the solver.
        solver: String,
    },
    /// Vector lengths do not match the operator.
    DimensionMismatch {
        /// Operator size.
        expected: usize,
        /// Offending vector length.
        found: usize,
    },
    /// An option has an unusable value.
    InvalidOption {
        /// Option source (file name and prefix).
        source: String,
        /// The option key.
        key: String,
        /// The value as written.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Building the solver's internal operators failed.
    Setup(AssemblyError),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured { solver } => write!(f, "solver '{solver}' used before configure"),
            Self::DimensionMismatch { expected, found } => {
                write!(f, "vector length {found} does not match operator size {expected}")
            }
            Self::InvalidOption {
                source,
                key,
                value,
                reason,
            } => write!(f, "{source}: option '{key}' = '{value}': {reason}"),
            Self::Setup(e) => write!(f, "solver setup: {e}"),
        }
    }
}

impl Error for SolverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Setup(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AssemblyError> for SolverError {
    fn from(e: AssemblyError) -> Self {
        Self::Setup(e)
    }
}
