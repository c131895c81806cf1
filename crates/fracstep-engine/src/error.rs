//! Fatal errors of a run.

use std::error::Error;
use std::fmt;

use fracstep_core::{ConfigError, TimeStep};
use fracstep_io::IoError;
use fracstep_linalg::{AssemblyError, SolverError};

use crate::factory::SystemKind;
use crate::solver::SolverState;

/// Everything that stops a simulation.
///
/// None of these are recovered from: [`NavierStokesSolver::run`] flushes
/// its logs and hands the error to the caller.
///
/// [`NavierStokesSolver::run`]: crate::NavierStokesSolver::run
#[derive(Debug)]
pub enum StepError {
    /// Invalid case files or parameters.
    Config(ConfigError),
    /// Operator assembly failed.
    Assembly(AssemblyError),
    /// A backend was misused or misconfigured.
    Solver(SolverError),
    /// Reading or writing run files failed.
    Io(IoError),
    /// A linear solve ended with a negative converged reason.
    SolverDivergence {
        /// Which system diverged.
        system: SystemKind,
        /// Step being taken.
        step: TimeStep,
        /// Converged-reason code.
        code: i32,
        /// Iterations performed before stopping.
        iterations: usize,
    },
    /// A method was called in the wrong lifecycle state.
    InvalidState {
        /// State the method requires.
        expected: SolverState,
        /// State the solver was in.
        found: SolverState,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Assembly(e) => write!(f, "assembly: {e}"),
            Self::Solver(e) => write!(f, "solver: {e}"),
            Self::Io(e) => write!(f, "output: {e}"),
            Self::SolverDivergence {
                system,
                step,
                code,
                iterations,
            } => write!(
                f,
                "[time-step {step}] {system} solver diverged with reason {code} after {iterations} iterations"
            ),
            Self::InvalidState { expected, found } => {
                write!(f, "expected solver state {expected}, found {found}")
            }
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Assembly(e) => Some(e),
            Self::Solver(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::SolverDivergence { .. } | Self::InvalidState { .. } => None,
        }
    }
}

impl From<ConfigError> for StepError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<AssemblyError> for StepError {
    fn from(e: AssemblyError) -> Self {
        Self::Assembly(e)
    }
}

impl From<SolverError> for StepError {
    fn from(e: SolverError) -> Self {
        Self::Solver(e)
    }
}

impl From<IoError> for StepError {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_message_names_system_and_step() {
        let e = StepError::SolverDivergence {
            system: SystemKind::Poisson,
            step: TimeStep(12),
            code: -3,
            iterations: 10_000,
        };
        let msg = e.to_string();
        assert!(msg.contains("[time-step 12]"), "{msg}");
        assert!(msg.contains("poisson"), "{msg}");
        assert!(msg.contains("-3"), "{msg}");
    }

    #[test]
    fn wrapped_errors_keep_their_source() {
        let e = StepError::from(ConfigError::invalid("dt", "must be positive"));
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("configuration:"));
    }
}
