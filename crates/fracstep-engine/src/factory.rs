//! Backend selection for the two linear systems.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use fracstep_core::ConfigError;
use fracstep_linalg::options::option_file;
use fracstep_linalg::{CsrMatrix, KrylovSolver, LinearSolver, MultigridSolver, SolverOptions};
use tracing::info;

use crate::config::SolveType;
use crate::error::StepError;

/// Krylov options of both systems, distinguished by prefix.
pub const PETSC_OPTIONS_FILE: &str = "solversPetscOptions.info";
/// Multigrid options of the velocity system.
pub const VELOCITY_MULTIGRID_FILE: &str = "solversAmgXOptions_v.info";
/// Multigrid options of the pressure/force system.
pub const POISSON_MULTIGRID_FILE: &str = "solversAmgXOptions_p.info";

/// The two systems solved every step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemKind {
    /// `A q* = rhs1`.
    Velocity,
    /// `QT BN Q λ = rhs2`.
    Poisson,
}

impl SystemKind {
    /// Lower-case name, used for solver names and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Velocity => "velocity",
            Self::Poisson => "poisson",
        }
    }

    /// Option prefix inside [`PETSC_OPTIONS_FILE`].
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Velocity => "velocity_",
            Self::Poisson => "poisson_",
        }
    }

    /// Multigrid option file of this system.
    pub fn multigrid_file(self) -> &'static str {
        match self {
            Self::Velocity => VELOCITY_MULTIGRID_FILE,
            Self::Poisson => POISSON_MULTIGRID_FILE,
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read the options of `system` for backend `kind` from `directory`.
///
/// A missing file yields the backend defaults.
pub fn load_options(
    kind: SolveType,
    system: SystemKind,
    directory: &Path,
) -> Result<SolverOptions, ConfigError> {
    match kind {
        SolveType::Cpu => {
            SolverOptions::load_prefixed(option_file(directory, PETSC_OPTIONS_FILE), system.prefix())
        }
        SolveType::Gpu => {
            SolverOptions::load_key_value(option_file(directory, system.multigrid_file()))
        }
    }
}

/// Create the backend of `system` and configure it with `matrix`.
pub fn create_solver(
    kind: SolveType,
    system: SystemKind,
    directory: &Path,
    matrix: Arc<CsrMatrix>,
) -> Result<Box<dyn LinearSolver>, StepError> {
    let options = load_options(kind, system, directory)?;
    let mut solver: Box<dyn LinearSolver> = match kind {
        SolveType::Cpu => Box::new(KrylovSolver::new(system.name())),
        SolveType::Gpu => Box::new(MultigridSolver::new(system.name())),
    };
    solver.configure(matrix, &options)?;
    info!(
        system = system.name(),
        backend = ?kind,
        options = options.len(),
        source = options.source(),
        "linear solver ready"
    );
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fracstep_linalg::CsrBuilder;

    fn spd() -> Arc<CsrMatrix> {
        let mut b = CsrBuilder::new(3, 3);
        b.push_row(0, &mut [(0, 2.0), (1, -1.0)]).unwrap();
        b.push_row(1, &mut [(0, -1.0), (1, 2.0), (2, -1.0)]).unwrap();
        b.push_row(2, &mut [(1, -1.0), (2, 2.0)]).unwrap();
        Arc::new(b.finish().unwrap())
    }

    #[test]
    fn prefixes_select_system_options() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PETSC_OPTIONS_FILE),
            "-velocity_ksp_rtol 1e-8\n-poisson_ksp_rtol 1e-6 -poisson_pc_type none\n",
        )
        .unwrap();
        let v = load_options(SolveType::Cpu, SystemKind::Velocity, dir.path()).unwrap();
        let p = load_options(SolveType::Cpu, SystemKind::Poisson, dir.path()).unwrap();
        assert_eq!(v.get_str("ksp_rtol"), Some("1e-8"));
        assert_eq!(v.len(), 1);
        assert_eq!(p.get_str("pc_type"), Some("none"));
    }

    #[test]
    fn missing_files_give_configured_defaults() {
        let dir = tempfile::tempdir().unwrap();
        for kind in [SolveType::Cpu, SolveType::Gpu] {
            let mut s = create_solver(kind, SystemKind::Velocity, dir.path(), spd()).unwrap();
            let mut x = vec![0.0; 3];
            let report = s.solve(&[1.0, 0.0, 1.0], &mut x).unwrap();
            assert!(!report.reason.is_diverged());
            assert!((x[1] - 1.0).abs() < 1e-4, "{kind:?}: {x:?}");
        }
    }

    #[test]
    fn malformed_multigrid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(POISSON_MULTIGRID_FILE), "solver PCG\n").unwrap();
        let err = create_solver(SolveType::Gpu, SystemKind::Poisson, dir.path(), spd())
            .err()
            .unwrap();
        assert!(matches!(err, StepError::Config(ConfigError::Parse { line: Some(1), .. })));
    }

    #[test]
    fn bad_option_value_is_solver_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PETSC_OPTIONS_FILE), "-velocity_ksp_type gmres\n").unwrap();
        let err = create_solver(SolveType::Cpu, SystemKind::Velocity, dir.path(), spd())
            .err()
            .unwrap();
        assert!(matches!(err, StepError::Solver(_)));
    }
}
