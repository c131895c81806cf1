//! Benchmark profiles for the fracstep flow solver.
//!
//! Builds discretizations and assembled systems without touching the file
//! system, so the benches time assembly and solves only:
//!
//! - [`cavity`]: unit box with no-slip walls
//! - [`periodic_box`]: fully periodic unit box
//! - [`cylinder`]: unit box with an immersed circle of boundary points
//! - [`assemble_systems`]: the velocity and pressure/force operators of a profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::f64::consts::PI;
use std::sync::Arc;

use fracstep_core::{ConfigError, Dim};
use fracstep_grid::{BoundaryConditions, CartesianMesh};
use fracstep_linalg::{AssemblyError, CsrMatrix, NullSpace};
use fracstep_operators::{
    assemble_bnq, assemble_coupling, assemble_implicit_operator, assemble_schur_complement,
    Body, DiagonalScalings, DiffusionCoefficients, DiffusionScheme, Discretization, Partitions,
};

/// Time step used by every profile.
pub const DT: f64 = 0.01;

/// Viscosity used by every profile.
pub const NU: f64 = 0.01;

/// `n × n` unit cavity with no-slip walls.
pub fn cavity(n: usize) -> Result<Discretization, ConfigError> {
    let mesh = CartesianMesh::uniform(Dim::Two, &[n, n], &[1.0, 1.0])?;
    Discretization::new(mesh, BoundaryConditions::no_slip(Dim::Two), None)
}

/// `n × n` fully periodic unit box.
pub fn periodic_box(n: usize) -> Result<Discretization, ConfigError> {
    let mesh = CartesianMesh::uniform(Dim::Two, &[n, n], &[1.0, 1.0])?;
    Discretization::new(mesh, BoundaryConditions::periodic(Dim::Two), None)
}

/// `n × n` no-slip unit box holding a circle of radius 0.15, sampled at
/// the grid spacing.
pub fn cylinder(n: usize) -> Result<Discretization, ConfigError> {
    let mesh = CartesianMesh::uniform(Dim::Two, &[n, n], &[1.0, 1.0])?;
    let radius = 0.15;
    let count = (2.0 * PI * radius * n as f64).round() as usize;
    let points = (0..count)
        .map(|k| {
            let t = 2.0 * PI * k as f64 / count as f64;
            [0.5 + radius * t.cos(), 0.5 + radius * t.sin(), 0.0]
        })
        .collect();
    let body = Body::new(Dim::Two, points)?;
    Discretization::new(mesh, BoundaryConditions::no_slip(Dim::Two), Some(body))
}

/// The two implicit systems of one profile.
#[derive(Debug)]
pub struct Systems {
    /// `A = M/dt - θ ν L`.
    pub velocity: Arc<CsrMatrix>,
    /// `QT BN Q`.
    pub poisson: Arc<CsrMatrix>,
    /// Constant pressure mode of `poisson`.
    pub null_space: Option<NullSpace>,
}

/// Assemble both systems of `disc` on a single rank with Crank–Nicolson
/// diffusion.
pub fn assemble_systems(disc: &Discretization) -> Result<Systems, AssemblyError> {
    let parts = Partitions::single(disc);
    let scalings = DiagonalScalings::compute(disc, DT);
    let coefficients = DiffusionCoefficients::new(DiffusionScheme::CrankNicolson, NU);
    let velocity = assemble_implicit_operator(disc, &scalings, &coefficients, &parts)?;
    let coupling = assemble_coupling(disc, &parts)?;
    let bnq = assemble_bnq(&coupling.q, &scalings, &parts)?;
    let poisson = assemble_schur_complement(&coupling.qt, &bnq, &parts)?;
    Ok(Systems {
        velocity: Arc::new(velocity),
        poisson: Arc::new(poisson),
        null_space: NullSpace::constant_on(disc.num_lambda(), 0..disc.num_pressure()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_assemble() {
        for disc in [cavity(16), periodic_box(16), cylinder(16)] {
            let disc = disc.unwrap();
            let s = assemble_systems(&disc).unwrap();
            assert_eq!(s.velocity.nrows(), disc.num_velocity());
            assert_eq!(s.poisson.nrows(), disc.num_lambda());
            assert!(s.null_space.is_some());
        }
    }

    #[test]
    fn cylinder_has_force_unknowns() {
        let disc = cylinder(32).unwrap();
        assert!(disc.num_body_points() >= 30);
        assert_eq!(disc.num_lambda(), 32 * 32 + 2 * disc.num_body_points());
    }
}
