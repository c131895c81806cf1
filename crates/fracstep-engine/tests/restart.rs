//! Integration test: restarts and backend interchangeability.
//!
//! A run restarted from a saved step must reproduce the uninterrupted
//! run, and swapping the solver backend of either system must not change
//! the solution beyond solver tolerance.

use std::fs;

use fracstep_core::TimeStep;
use fracstep_engine::{NavierStokesSolver, SimulationConfig, SolveType, StepError};
use fracstep_io::{checkpoint_dir, read_vector_file};
use fracstep_test_utils::{cases, max_abs_diff, CaseDir};

fn run(case: &CaseDir) -> NavierStokesSolver {
    let config = SimulationConfig::load(case.path()).unwrap();
    let mut solver = NavierStokesSolver::new(config);
    solver.run().unwrap();
    solver
}

fn saved_flux(case: &CaseDir, step: u64, name: &str, len: usize) -> Vec<f64> {
    let path = checkpoint_dir(case.path(), TimeStep(step)).join(name);
    read_vector_file(&path, len).unwrap()
}

/// Fluxes of a cavity after `nt` steps, stepping in memory.
fn cavity_fluxes(case: &CaseDir) -> Vec<f64> {
    let config = SimulationConfig::load(case.path()).unwrap();
    let mut solver = NavierStokesSolver::new(config);
    solver.initialize().unwrap();
    while !solver.finished() {
        solver.step_time().unwrap();
    }
    solver.velocity().unwrap().as_slice().to_vec()
}

// ── Restart ─────────────────────────────────────────────────────

#[test]
fn restart_reproduces_uninterrupted_run() {
    let n = 8;
    let case = cases::lid_driven_cavity(n, 4);
    run(&case);
    let len = (n - 1) * n;
    let qx = saved_flux(&case, 4, "qx.dat", len);
    let qy = saved_flux(&case, 4, "qy.dat", len);
    assert!(checkpoint_dir(case.path(), TimeStep(2))
        .join("convection.dat")
        .is_file());

    case.set_parameter("startStep", "2");
    case.set_parameter("nt", "2");
    let restarted = run(&case);
    assert_eq!(restarted.time_step(), TimeStep(4));
    assert!(max_abs_diff(&qx, &saved_flux(&case, 4, "qx.dat", len)) < 1e-12);
    assert!(max_abs_diff(&qy, &saved_flux(&case, 4, "qy.dat", len)) < 1e-12);

    // The restart appended its two steps to the iteration log.
    let log = fs::read_to_string(case.path().join("iterationCounts.txt")).unwrap();
    let steps: Vec<&str> = log
        .lines()
        .filter_map(|l| l.split('\t').next())
        .collect();
    assert_eq!(steps, ["1", "2", "3", "4", "3", "4"]);
}

#[test]
fn restart_keeps_convective_outlet_history() {
    let n = 24;
    let case = cases::cylinder(n, 4);
    case.set_parameter("nsave", "2");
    run(&case);
    let len = (n - 1) * n;
    let qx = saved_flux(&case, 4, "qx.dat", len);
    let qy = saved_flux(&case, 4, "qy.dat", len);
    assert!(checkpoint_dir(case.path(), TimeStep(2))
        .join("ghosts.dat")
        .is_file());

    case.set_parameter("startStep", "2");
    case.set_parameter("nt", "2");
    run(&case);
    let dx = max_abs_diff(&qx, &saved_flux(&case, 4, "qx.dat", len));
    let dy = max_abs_diff(&qy, &saved_flux(&case, 4, "qy.dat", len));
    assert!(dx < 1e-8, "qx: {dx}");
    assert!(dy < 1e-8, "qy: {dy}");
}

#[test]
fn restart_without_checkpoint_fails() {
    let case = cases::lid_driven_cavity(6, 2);
    case.set_parameter("startStep", "10");
    let config = SimulationConfig::load(case.path()).unwrap();
    let mut solver = NavierStokesSolver::new(config);
    assert!(matches!(solver.run(), Err(StepError::Io(_))));
}

// ── Backends ────────────────────────────────────────────────────

#[test]
fn multigrid_and_krylov_agree() {
    let reference = cases::lid_driven_cavity(8, 3);
    let expected = cavity_fluxes(&reference);

    for (velocity, poisson) in [("GPU", "CPU"), ("CPU", "GPU"), ("GPU", "GPU")] {
        let case = cases::lid_driven_cavity(8, 3);
        case.set_parameter("velocitySolveType", velocity);
        case.set_parameter("poissonSolveType", poisson);
        let config = SimulationConfig::load(case.path()).unwrap();
        assert_eq!(
            config.parameters.poisson_solve_type,
            if poisson == "GPU" { SolveType::Gpu } else { SolveType::Cpu }
        );
        let got = cavity_fluxes(&case);
        let diff = max_abs_diff(&expected, &got);
        assert!(diff < 1e-6, "{velocity}/{poisson}: {diff}");
    }
}
