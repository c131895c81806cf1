//! Case directories for end-to-end runs.
//!
//! Each builder writes the YAML descriptors and solver option files of a
//! small, fast case into a fresh temporary directory. The directory is
//! removed when the [`CaseDir`] is dropped.

use std::f64::consts::PI;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

const PARAMETERS_FILE: &str = "simulationParameters.yaml";

/// Tight tolerances for both systems of both backends.
const PETSC_OPTIONS: &str = "\
# velocity system
-velocity_ksp_type cg
-velocity_pc_type jacobi
-velocity_ksp_rtol 1e-10
-velocity_ksp_atol 1e-12
# pressure/force system
-poisson_ksp_type cg
-poisson_pc_type jacobi
-poisson_ksp_rtol 1e-10
-poisson_ksp_atol 1e-12
";

const MULTIGRID_OPTIONS: &str = "\
config_version=2
main:solver=PCG
main:max_iters=500
main:tolerance=1e-10
main:presweeps=2
main:postsweeps=2
main:relaxation_factor=0.8
";

/// A case written to a temporary directory.
#[derive(Debug)]
pub struct CaseDir {
    dir: TempDir,
}

impl CaseDir {
    fn create() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create case directory"),
        }
    }

    /// Root of the case.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write (or replace) a file of the case.
    pub fn write(&self, name: &str, contents: &str) {
        fs::write(self.path().join(name), contents).expect("write case file");
    }

    /// Set `key: value` in `simulationParameters.yaml`.
    pub fn set_parameter(&self, key: &str, value: &str) {
        let path = self.path().join(PARAMETERS_FILE);
        let text = fs::read_to_string(&path).expect("read parameters");
        let prefix = format!("{key}:");
        let mut out = String::new();
        for line in text.lines().filter(|l| !l.starts_with(&prefix)) {
            out.push_str(line);
            out.push('\n');
        }
        let _ = writeln!(out, "{key}: {value}");
        fs::write(path, out).expect("write parameters");
    }

    fn write_options(&self) {
        self.write("solversPetscOptions.info", PETSC_OPTIONS);
        self.write("solversAmgXOptions_v.info", MULTIGRID_OPTIONS);
        self.write("solversAmgXOptions_p.info", MULTIGRID_OPTIONS);
    }
}

fn uniform_mesh(extents: &[(f64, f64)], cells: usize) -> String {
    let mut text = String::new();
    for ((start, end), name) in extents.iter().zip(["x", "y", "z"]) {
        let _ = write!(
            text,
            "- direction: {name}\n  start: {start:?}\n  subDomains:\n    - end: {end:?}\n      cells: {cells}\n      stretchRatio: 1.0\n"
        );
    }
    text
}

fn parameters(nt: u64, nsave: u64, dt: f64, ibm: &str) -> String {
    format!(
        "dt: {dt:?}\nstartStep: 0\nnt: {nt}\nnsave: {nsave}\nibmScheme: {ibm}\n\
         convection: ADAMS_BASHFORTH_2\ndiffusion: CRANK_NICOLSON\n\
         velocitySolveType: CPU\npoissonSolveType: CPU\n"
    )
}

/// Unit lid-driven cavity on an `n × n` grid: no-slip walls, top lid
/// moving at `u = 1`, `Re = 100`, saved every 2 steps.
pub fn lid_driven_cavity(n: usize, nt: u64) -> CaseDir {
    let case = CaseDir::create();
    case.write("cartesianMesh.yaml", &uniform_mesh(&[(0.0, 1.0), (0.0, 1.0)], n));
    case.write(
        "flowDescription.yaml",
        "dimensions: 2\nnu: 0.01\ninitialVelocity: [0.0, 0.0]\n\
         boundaryConditions:\n\
         \x20 - location: xMinus\n    u: [DIRICHLET, 0.0]\n    v: [DIRICHLET, 0.0]\n\
         \x20 - location: xPlus\n    u: [DIRICHLET, 0.0]\n    v: [DIRICHLET, 0.0]\n\
         \x20 - location: yMinus\n    u: [DIRICHLET, 0.0]\n    v: [DIRICHLET, 0.0]\n\
         \x20 - location: yPlus\n    u: [DIRICHLET, 1.0]\n    v: [DIRICHLET, 0.0]\n",
    );
    case.write(PARAMETERS_FILE, &parameters(nt, 2, 0.01, "NAVIER_STOKES"));
    case.write_options();
    case
}

/// Fully periodic `2π × 2π` box on an `n × n` grid, starting from a
/// single-period vortex perturbation.
pub fn periodic_box(n: usize, nt: u64) -> CaseDir {
    let case = CaseDir::create();
    let l = 2.0 * PI;
    case.write("cartesianMesh.yaml", &uniform_mesh(&[(0.0, l), (0.0, l)], n));
    let mut flow = String::from(
        "dimensions: 2\nnu: 0.1\ninitialVelocity: [0.0, 0.0]\n\
         initialPerturbation: [0.5, 2.0]\nboundaryConditions:\n",
    );
    for face in ["xMinus", "xPlus", "yMinus", "yPlus"] {
        let _ = writeln!(
            flow,
            "  - location: {face}\n    u: [PERIODIC, 0.0]\n    v: [PERIODIC, 0.0]"
        );
    }
    case.write("flowDescription.yaml", &flow);
    case.write(PARAMETERS_FILE, &parameters(nt, 5, 0.01, "NAVIER_STOKES"));
    case.write_options();
    case
}

/// Points on a circle, one per arc length `spacing`.
pub fn circle_points(center: [f64; 2], radius: f64, spacing: f64) -> Vec<[f64; 2]> {
    let n = ((2.0 * PI * radius / spacing).round() as usize).max(3);
    (0..n)
        .map(|k| {
            let t = 2.0 * PI * k as f64 / n as f64;
            [center[0] + radius * t.cos(), center[1] + radius * t.sin()]
        })
        .collect()
}

/// Flow past a circular cylinder of radius 0.5 at `Re = 40` in a
/// `[-2, 2]²` box: uniform inflow, free-stream sides, convective outlet.
pub fn cylinder(n: usize, nt: u64) -> CaseDir {
    let case = CaseDir::create();
    case.write("cartesianMesh.yaml", &uniform_mesh(&[(-2.0, 2.0), (-2.0, 2.0)], n));
    case.write(
        "flowDescription.yaml",
        "dimensions: 2\nnu: 0.025\ninitialVelocity: [1.0, 0.0]\n\
         boundaryConditions:\n\
         \x20 - location: xMinus\n    u: [DIRICHLET, 1.0]\n    v: [DIRICHLET, 0.0]\n\
         \x20 - location: xPlus\n    u: [CONVECTIVE, 1.0]\n    v: [CONVECTIVE, 1.0]\n\
         \x20 - location: yMinus\n    u: [DIRICHLET, 1.0]\n    v: [DIRICHLET, 0.0]\n\
         \x20 - location: yPlus\n    u: [DIRICHLET, 1.0]\n    v: [DIRICHLET, 0.0]\n",
    );
    case.write(PARAMETERS_FILE, &parameters(nt, 10, 0.01, "TAIRA_COLONIUS"));
    let h = 4.0 / n as f64;
    let points = circle_points([0.0, 0.0], 0.5, h);
    let mut body = format!("{}\n", points.len());
    for p in &points {
        let _ = writeln!(body, "{:?}\t{:?}", p[0], p[1]);
    }
    case.write("circle.body", &body);
    case.write("bodies.yaml", "- type: points\n  pointsFile: circle.body\n");
    case.write_options();
    case
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cavity_directory_is_complete() {
        let case = lid_driven_cavity(8, 3);
        for name in [
            "cartesianMesh.yaml",
            "flowDescription.yaml",
            "simulationParameters.yaml",
            "solversPetscOptions.info",
            "solversAmgXOptions_v.info",
            "solversAmgXOptions_p.info",
        ] {
            assert!(case.path().join(name).is_file(), "{name}");
        }
    }

    #[test]
    fn set_parameter_replaces_line() {
        let case = lid_driven_cavity(4, 3);
        case.set_parameter("nt", "7");
        case.set_parameter("velocitySolveType", "GPU");
        let text = fs::read_to_string(case.path().join(PARAMETERS_FILE)).unwrap();
        assert!(text.contains("nt: 7\n"));
        assert!(!text.contains("nt: 3\n"));
        assert_eq!(text.matches("velocitySolveType").count(), 1);
    }

    #[test]
    fn circle_spacing_matches_request() {
        let pts = circle_points([0.0, 0.0], 0.5, 0.125);
        assert_eq!(pts.len(), 25);
        for p in &pts {
            assert!(((p[0] * p[0] + p[1] * p[1]).sqrt() - 0.5).abs() < 1e-12);
        }
    }
}
