//! Diagonal scalings of the velocity unknowns.

use crate::discretization::Discretization;

/// Per-unknown diagonal matrices, stored as vectors over the velocity
/// numbering.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagonalScalings {
    /// Time step the scalings were built for.
    pub dt: f64,
    /// Staggered cell extent along the component direction.
    pub mhat: Vec<f64>,
    /// Inverse face area.
    pub rinv: Vec<f64>,
    /// `MHat · RInv`.
    pub m: Vec<f64>,
    /// `dt / M`.
    pub bn: Vec<f64>,
}

impl DiagonalScalings {
    /// Scalings of every velocity unknown of `disc` for time step `dt`.
    pub fn compute(disc: &Discretization, dt: f64) -> Self {
        let layout = disc.layout();
        let n = disc.num_velocity();
        let mut mhat = Vec::with_capacity(n);
        let mut rinv = Vec::with_capacity(n);
        for row in 0..n {
            let (c, idx) = layout.velocity_coords(row);
            mhat.push(disc.mhat(c, idx));
            rinv.push(disc.rinv(c, idx));
        }
        let m: Vec<f64> = mhat.iter().zip(&rinv).map(|(a, b)| a * b).collect();
        let bn = m.iter().map(|v| dt / v).collect();
        Self {
            dt,
            mhat,
            rinv,
            m,
            bn,
        }
    }

    /// Velocities `u = RInv q` from fluxes.
    pub fn velocities(&self, q: &[f64], u: &mut [f64]) {
        for ((ui, qi), r) in u.iter_mut().zip(q).zip(&self.rinv) {
            *ui = qi * r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fracstep_core::Dim;
    use fracstep_grid::{BoundaryConditions, CartesianMesh};

    #[test]
    fn uniform_cavity_scalings() {
        let mesh = CartesianMesh::uniform(Dim::Two, &[4, 4], &[1.0, 1.0]).unwrap();
        let d = Discretization::new(mesh, BoundaryConditions::no_slip(Dim::Two), None).unwrap();
        let s = DiagonalScalings::compute(&d, 0.01);
        assert_eq!(s.m.len(), 24);
        for i in 0..24 {
            assert_abs_diff_eq!(s.mhat[i], 0.25);
            assert_abs_diff_eq!(s.rinv[i], 4.0);
            assert_abs_diff_eq!(s.m[i], 1.0);
            assert_abs_diff_eq!(s.bn[i], 0.01);
        }
    }
}
