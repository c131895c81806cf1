//! Integration test: how each backend's non-convergence reaches the run.
//!
//! A Krylov solve that stops short of its tolerance aborts the run before
//! anything of the failed step is written. The multigrid backend spends a
//! fixed budget and never stops the run.

use std::fs;

use fracstep_core::TimeStep;
use fracstep_engine::{NavierStokesSolver, SimulationConfig, SolverState, StepError, SystemKind};
use fracstep_io::checkpoint_dir;
use fracstep_test_utils::cases;

#[test]
fn krylov_iteration_cap_aborts_the_run() {
    let case = cases::lid_driven_cavity(8, 3);
    case.write(
        "solversPetscOptions.info",
        "-velocity_ksp_rtol 1e-10\n-poisson_ksp_rtol 1e-14\n-poisson_ksp_max_it 1\n",
    );
    let config = SimulationConfig::load(case.path()).unwrap();
    let mut solver = NavierStokesSolver::new(config);

    let err = solver.run().unwrap_err();
    assert!(
        matches!(
            err,
            StepError::SolverDivergence {
                system: SystemKind::Poisson,
                step: TimeStep(1),
                code: -3,
                ..
            }
        ),
        "{err}"
    );
    assert_eq!(solver.state(), SolverState::SolvePoisson);

    // The log exists and holds no line for the failed step.
    let log = fs::read_to_string(case.path().join("iterationCounts.txt")).unwrap();
    assert!(log.is_empty());
    assert!(checkpoint_dir(case.path(), TimeStep(0)).is_dir());
    assert!(!checkpoint_dir(case.path(), TimeStep(1)).exists());
}

#[test]
fn multigrid_early_stop_does_not_abort() {
    let case = cases::lid_driven_cavity(8, 2);
    case.set_parameter("poissonSolveType", "GPU");
    // Without residual monitoring the inner CG runs until it breaks down.
    case.write(
        "solversAmgXOptions_p.info",
        "solver=PCG\nmax_iters=60\nmonitor_residual=false\n",
    );
    let config = SimulationConfig::load(case.path()).unwrap();
    let mut solver = NavierStokesSolver::new(config);

    solver.run().unwrap();
    assert_eq!(solver.state(), SolverState::Done);
    assert_eq!(solver.time_step(), TimeStep(2));
    let m = solver.last_metrics();
    assert!(m.poisson_iterations > 0);
    assert!(m.max_divergence < 1e-6, "{}", m.max_divergence);

    let log = fs::read_to_string(case.path().join("iterationCounts.txt")).unwrap();
    assert_eq!(log.lines().count(), 2);
}
