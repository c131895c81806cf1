//! Boundary vectors of the two linear systems.
//!
//! `bc1` carries the ghost-velocity part of the diffusion stencil into the
//! velocity right-hand side. `r2` carries the boundary fluxes into the
//! pressure/force right-hand side, so that after the projection
//! `QT q = r2` holds: cells next to a wall see the prescribed normal flux
//! and body points see zero velocity.

use fracstep_grid::{FaceRef, Side};

use crate::discretization::Discretization;
use crate::ghosts::BoundaryGhosts;
use crate::scheme::DiffusionCoefficients;
use crate::stencil::{laplacian_row, GhostTerm};

/// Precomputed ghost couplings of the diffusion stencil.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryTerms {
    couplings: Vec<(usize, GhostTerm)>,
}

impl BoundaryTerms {
    /// Collect the boundary couplings of every velocity row.
    pub fn new(disc: &Discretization) -> Self {
        let couplings = (0..disc.num_velocity())
            .flat_map(|row| {
                laplacian_row(disc, row)
                    .boundary
                    .into_iter()
                    .map(move |term| (row, term))
            })
            .collect();
        Self { couplings }
    }

    /// Number of (row, ghost) couplings.
    pub fn len(&self) -> usize {
        self.couplings.len()
    }

    /// Whether no row touches a boundary (fully periodic domain).
    pub fn is_empty(&self) -> bool {
        self.couplings.is_empty()
    }

    /// `bc1 = ν Σ coef · ((1 - θ) gⁿ + θ gⁿ⁺¹)`.
    pub fn bc1(
        &self,
        coefficients: &DiffusionCoefficients,
        current: &BoundaryGhosts,
        next: &BoundaryGhosts,
        bc1: &mut [f64],
    ) {
        let theta = coefficients.theta;
        bc1.fill(0.0);
        for &(row, term) in &self.couplings {
            let g0 = current.value(term.location, term.component, term.index);
            let g1 = next.value(term.location, term.component, term.index);
            bc1[row] += coefficients.nu * term.coefficient * ((1.0 - theta) * g0 + theta * g1);
        }
    }

    /// Boundary fluxes of the pressure rows; force rows get zero.
    pub fn r2(disc: &Discretization, ghosts: &BoundaryGhosts, r2: &mut [f64]) {
        r2.fill(0.0);
        let layout = disc.layout();
        for p in 0..disc.num_pressure() {
            let idx = layout.pressure_coords(p);
            for &axis in disc.dim().axes() {
                let (minus, plus) = layout.cell_faces(idx, axis);
                for face in [minus, plus] {
                    let FaceRef::Boundary(location) = face else {
                        continue;
                    };
                    let c = axis.index();
                    let flux = ghosts.value(location, c, layout.ghost_index(c, axis, idx))
                        * disc.cell_face_area(axis, idx);
                    match location.side() {
                        Side::Minus => r2[p] -= flux,
                        Side::Plus => r2[p] += flux,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagonal::DiagonalScalings;
    use crate::scheme::DiffusionScheme;
    use approx::assert_abs_diff_eq;
    use fracstep_core::Dim;
    use fracstep_grid::{BoundaryCondition, BoundaryConditions, BoundaryLocation, CartesianMesh};

    fn lid_cavity() -> Discretization {
        let mesh = CartesianMesh::uniform(Dim::Two, &[4, 4], &[1.0, 1.0]).unwrap();
        let mut bcs = BoundaryConditions::no_slip(Dim::Two);
        bcs.set(BoundaryLocation::YPlus, 0, BoundaryCondition::dirichlet(1.0));
        Discretization::new(mesh, bcs, None).unwrap()
    }

    #[test]
    fn lid_drives_only_top_row() {
        let d = lid_cavity();
        let s = DiagonalScalings::compute(&d, 0.01);
        let g = BoundaryGhosts::initialize(&d, &s, &vec![0.0; d.num_velocity()]);
        let terms = BoundaryTerms::new(&d);
        let coeffs = DiffusionCoefficients::new(DiffusionScheme::CrankNicolson, 0.01);
        let mut bc1 = vec![0.0; d.num_velocity()];
        terms.bc1(&coeffs, &g, &g, &mut bc1);
        let layout = d.layout();
        for row in 0..d.num_velocity() {
            let (c, idx) = layout.velocity_coords(row);
            if c == 0 && idx[1] == 3 {
                // ν · MHat / (dy · dy/2) = 0.01 · 8
                assert_abs_diff_eq!(bc1[row], 0.08, epsilon = 1e-12);
            } else {
                assert_eq!(bc1[row], 0.0);
            }
        }
    }

    #[test]
    fn no_slip_walls_give_zero_r2() {
        let d = lid_cavity();
        let s = DiagonalScalings::compute(&d, 0.01);
        let g = BoundaryGhosts::initialize(&d, &s, &vec![0.0; d.num_velocity()]);
        let mut r2 = vec![1.0; d.num_lambda()];
        BoundaryTerms::r2(&d, &g, &mut r2);
        assert!(r2.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn inflow_outflow_fluxes_enter_r2() {
        let mesh = CartesianMesh::uniform(Dim::Two, &[2, 2], &[1.0, 2.0]).unwrap();
        let mut bcs = BoundaryConditions::no_slip(Dim::Two);
        bcs.set(BoundaryLocation::XMinus, 0, BoundaryCondition::dirichlet(1.0));
        bcs.set(BoundaryLocation::XPlus, 0, BoundaryCondition::dirichlet(1.0));
        let d = Discretization::new(mesh, bcs, None).unwrap();
        let s = DiagonalScalings::compute(&d, 0.01);
        let g = BoundaryGhosts::initialize(&d, &s, &vec![0.0; d.num_velocity()]);
        let mut r2 = vec![0.0; d.num_lambda()];
        BoundaryTerms::r2(&d, &g, &mut r2);
        let layout = d.layout();
        // Face area is dy = 1.
        assert_abs_diff_eq!(r2[layout.pressure_index([0, 0, 0])], -1.0);
        assert_abs_diff_eq!(r2[layout.pressure_index([1, 1, 0])], 1.0);
        assert_abs_diff_eq!(r2.iter().sum::<f64>(), 0.0);
    }
}
