//! The capability set shared by every linear-solver backend.

use std::fmt;
use std::sync::Arc;

use crate::csr::CsrMatrix;
use crate::error::SolverError;
use crate::nullspace::NullSpace;
use crate::options::SolverOptions;

/// Why an iterative solve stopped.
///
/// The numeric codes follow the PETSc `KSPConvergedReason` convention:
/// positive values converged, negative values diverged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConvergedReason {
    /// Residual fell below `rtol · ‖b‖`.
    ConvergedRtol,
    /// Residual fell below `atol`.
    ConvergedAtol,
    /// Iteration cap reached by a backend that treats the cap as success.
    ConvergedIts,
    /// Iteration cap reached without convergence.
    DivergedIts,
    /// Residual grew beyond `dtol · ‖b‖`.
    DivergedDtol,
    /// A recurrence coefficient vanished.
    DivergedBreakdown,
    /// The preconditioner is not positive definite.
    DivergedIndefinitePc,
    /// A NaN or infinity appeared in the residual.
    DivergedNanOrInf,
    /// The operator is not positive definite.
    DivergedIndefiniteMat,
}

impl ConvergedReason {
    /// PETSc numeric code.
    pub fn code(self) -> i32 {
        match self {
            Self::ConvergedRtol => 2,
            Self::ConvergedAtol => 3,
            Self::ConvergedIts => 4,
            Self::DivergedIts => -3,
            Self::DivergedDtol => -4,
            Self::DivergedBreakdown => -5,
            Self::DivergedIndefinitePc => -8,
            Self::DivergedNanOrInf => -9,
            Self::DivergedIndefiniteMat => -10,
        }
    }

    /// Whether the code is negative.
    pub fn is_diverged(self) -> bool {
        self.code() < 0
    }
}

impl fmt::Display for ConvergedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConvergedRtol => "CONVERGED_RTOL",
            Self::ConvergedAtol => "CONVERGED_ATOL",
            Self::ConvergedIts => "CONVERGED_ITS",
            Self::DivergedIts => "DIVERGED_ITS",
            Self::DivergedDtol => "DIVERGED_DTOL",
            Self::DivergedBreakdown => "DIVERGED_BREAKDOWN",
            Self::DivergedIndefinitePc => "DIVERGED_INDEFINITE_PC",
            Self::DivergedNanOrInf => "DIVERGED_NANORINF",
            Self::DivergedIndefiniteMat => "DIVERGED_INDEFINITE_MAT",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Outcome of one solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveReport {
    /// Iterations performed.
    pub iterations: usize,
    /// Norm of the final (unpreconditioned) residual.
    pub residual_norm: f64,
    /// Stopping reason.
    pub reason: ConvergedReason,
}

/// A configured linear-system solver.
///
/// Implementations own a shared handle to their operator and build any
/// preconditioner once in [`configure`](LinearSolver::configure); every
/// later [`solve`](LinearSolver::solve) reuses it. The vector passed as
/// `x` is used as the initial guess.
pub trait LinearSolver: Send {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Bind the operator and apply options. Builds the preconditioner.
    fn configure(
        &mut self,
        matrix: Arc<CsrMatrix>,
        options: &SolverOptions,
    ) -> Result<(), SolverError>;

    /// Attach a null space that is projected out of every solve.
    fn attach_null_space(&mut self, null_space: NullSpace);

    /// Solve `A x = rhs` starting from the current content of `x`.
    ///
    /// Non-convergence is reported in the returned [`SolveReport`]; `Err`
    /// is reserved for misuse (unconfigured solver, wrong lengths).
    fn solve(&mut self, rhs: &[f64], x: &mut [f64]) -> Result<SolveReport, SolverError>;

    /// Iterations of the most recent solve.
    fn iteration_count(&self) -> usize;

    /// Whether a diverged [`SolveReport::reason`] must stop the run.
    ///
    /// Backends that always spend a fixed budget report their internal
    /// reason for diagnostics only and override this to `false`.
    fn divergence_is_fatal(&self) -> bool {
        true
    }
}

/// Check that `rhs` and `x` match an `n × n` operator.
pub(crate) fn check_lengths(n: usize, rhs: &[f64], x: &[f64]) -> Result<(), SolverError> {
    for len in [rhs.len(), x.len()] {
        if len != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                found: len,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_petsc() {
        assert_eq!(ConvergedReason::ConvergedRtol.code(), 2);
        assert_eq!(ConvergedReason::ConvergedIts.code(), 4);
        assert_eq!(ConvergedReason::DivergedIts.code(), -3);
        assert_eq!(ConvergedReason::DivergedIndefiniteMat.code(), -10);
        assert!(ConvergedReason::DivergedNanOrInf.is_diverged());
        assert!(!ConvergedReason::ConvergedAtol.is_diverged());
        assert_eq!(ConvergedReason::DivergedDtol.to_string(), "DIVERGED_DTOL (-4)");
    }

    #[test]
    fn length_check() {
        assert!(check_lengths(2, &[0.0; 2], &[0.0; 2]).is_ok());
        assert_eq!(
            check_lengths(2, &[0.0; 2], &[0.0; 3]),
            Err(SolverError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }
}
