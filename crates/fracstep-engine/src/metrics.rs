//! Per-step diagnostics of the time integration.
//!
//! [`StepMetrics`] is returned by every
//! [`step_time()`](crate::NavierStokesSolver::step_time) call and feeds
//! the iteration and force logs written by
//! [`write_data()`](crate::NavierStokesSolver::write_data).

use fracstep_core::TimeStep;
use smallvec::SmallVec;

/// Solver effort and timing of a single step.
///
/// Durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Step these metrics belong to.
    pub step: TimeStep,
    /// Iterations of the velocity solve.
    pub velocity_iterations: usize,
    /// Iterations of the pressure/force solve.
    pub poisson_iterations: usize,
    /// Final residual norm of the velocity solve.
    pub velocity_residual: f64,
    /// Final residual norm of the pressure/force solve.
    pub poisson_residual: f64,
    /// Largest cell continuity residual after projection.
    pub max_divergence: f64,
    /// Total body force per direction; empty without a body.
    pub force: SmallVec<[f64; 3]>,
    /// Wall-clock time of the whole step.
    pub total_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.step, TimeStep(0));
        assert_eq!(m.velocity_iterations, 0);
        assert_eq!(m.poisson_iterations, 0);
        assert_eq!(m.max_divergence, 0.0);
        assert!(m.force.is_empty());
        assert_eq!(m.total_us, 0);
    }
}
