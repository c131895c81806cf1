//! The implicit velocity operator `A = M/dt - θ ν L`.

use fracstep_linalg::{AssemblyError, CsrBuilder, CsrMatrix, NnzCounts};
use smallvec::SmallVec;
use tracing::debug;

use crate::diagonal::DiagonalScalings;
use crate::discretization::{Discretization, Partitions};
use crate::scheme::DiffusionCoefficients;
use crate::stencil::{laplacian_row, stencil_columns};

/// Nonzero counts of `L` and `A`, from the stencil shape alone.
pub fn count_implicit_nonzeros(disc: &Discretization, parts: &Partitions) -> NnzCounts {
    let layout = disc.layout();
    let n = disc.num_velocity();
    let mut counts = NnzCounts::new(n);
    for row in 0..n {
        let cols = stencil_columns(layout, row);
        counts.record(row, &cols, &parts.velocity, &parts.velocity);
    }
    counts
}

fn assemble_with(
    disc: &Discretization,
    parts: &Partitions,
    mut entry: impl FnMut(usize, f64, bool) -> f64,
) -> Result<CsrMatrix, AssemblyError> {
    let n = disc.num_velocity();
    let counts = count_implicit_nonzeros(disc, parts);
    let mut builder = CsrBuilder::with_preallocation(n, n, &counts);
    let mut entries: SmallVec<[(usize, f64); 7]> = SmallVec::new();
    for row in 0..n {
        let s = laplacian_row(disc, row);
        entries.clear();
        entries.push((row, entry(row, s.diagonal, true)));
        for &(j, v) in &s.neighbours {
            entries.push((j, entry(row, v, false)));
        }
        builder.push_row(row, &mut entries)?;
    }
    builder.finish()
}

/// The flux-form Laplacian `L = MHat · Lap · RInv` on interior couplings.
pub fn assemble_laplacian(
    disc: &Discretization,
    parts: &Partitions,
) -> Result<CsrMatrix, AssemblyError> {
    assemble_with(disc, parts, |_, v, _| v)
}

/// `A = M/dt - θ ν L`.
///
/// The stencil shape is kept even when `θ = 0`, so the matrix pattern
/// does not depend on the scheme.
pub fn assemble_implicit_operator(
    disc: &Discretization,
    scalings: &DiagonalScalings,
    coefficients: &DiffusionCoefficients,
    parts: &Partitions,
) -> Result<CsrMatrix, AssemblyError> {
    let k = coefficients.theta * coefficients.nu;
    let dt = scalings.dt;
    let a = assemble_with(disc, parts, |row, v, diagonal| {
        if diagonal {
            scalings.m[row] / dt - k * v
        } else {
            -k * v
        }
    })?;
    debug!(rows = a.nrows(), nnz = a.nnz(), theta = coefficients.theta, "assembled A");
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::DiffusionScheme;
    use approx::assert_abs_diff_eq;
    use fracstep_core::Dim;
    use fracstep_grid::{BoundaryConditions, CartesianMesh};

    fn stretched_cavity() -> Discretization {
        let mesh = CartesianMesh::from_nodes(
            Dim::Two,
            vec![vec![0.0, 0.1, 0.3, 0.6, 1.0], vec![0.0, 0.2, 0.3, 0.7, 0.8, 1.0]],
        )
        .unwrap();
        Discretization::new(mesh, BoundaryConditions::no_slip(Dim::Two), None).unwrap()
    }

    #[test]
    fn laplacian_and_a_are_symmetric() {
        let d = stretched_cavity();
        let p = Partitions::single(&d);
        let l = assemble_laplacian(&d, &p).unwrap();
        assert!(l.is_symmetric(1e-10));
        let s = DiagonalScalings::compute(&d, 0.01);
        let c = DiffusionCoefficients::new(DiffusionScheme::CrankNicolson, 0.1);
        let a = assemble_implicit_operator(&d, &s, &c, &p).unwrap();
        assert!(a.is_symmetric(1e-10));
        assert_eq!(a.nnz(), l.nnz());
    }

    #[test]
    fn explicit_diffusion_leaves_mass_matrix() {
        let d = stretched_cavity();
        let p = Partitions::single(&d);
        let s = DiagonalScalings::compute(&d, 0.5);
        let c = DiffusionCoefficients::new(DiffusionScheme::EulerExplicit, 0.1);
        let a = assemble_implicit_operator(&d, &s, &c, &p).unwrap();
        for row in 0..d.num_velocity() {
            let (cols, vals) = a.row(row);
            for (&j, &v) in cols.iter().zip(vals) {
                if j == row {
                    assert_abs_diff_eq!(v, s.m[row] / 0.5, epsilon = 1e-12);
                } else {
                    assert_eq!(v, 0.0);
                }
            }
        }
    }

    #[test]
    fn a_is_diagonally_dominant() {
        let d = stretched_cavity();
        let p = Partitions::single(&d);
        let s = DiagonalScalings::compute(&d, 0.01);
        let c = DiffusionCoefficients::new(DiffusionScheme::EulerImplicit, 1.0);
        let a = assemble_implicit_operator(&d, &s, &c, &p).unwrap();
        for row in 0..a.nrows() {
            let (cols, vals) = a.row(row);
            let off: f64 = cols
                .iter()
                .zip(vals)
                .filter(|(&j, _)| j != row)
                .map(|(_, v)| v.abs())
                .sum();
            assert!(a.get(row, row) > off);
        }
    }
}
