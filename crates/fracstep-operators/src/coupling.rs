//! Pressure/force coupling operators and the Schur complement.
//!
//! `QT = [-D; E]` maps fluxes to the constraint space: `D` is the discrete
//! divergence (entries ±1 on the interior faces of each cell), `E`
//! interpolates fluxes onto the body points with the three-point discrete
//! delta. `Q = QTᵀ`, so its pressure columns form the gradient `G = -Dᵀ`
//! and its force columns spread body forces onto the grid.

use fracstep_core::Axis;
use fracstep_grid::FaceRef;
use fracstep_linalg::{AssemblyError, CsrBuilder, CsrMatrix, NnzCounts};
use smallvec::SmallVec;
use tracing::debug;

use crate::diagonal::DiagonalScalings;
use crate::discretization::{Discretization, Partitions};
use crate::immersed::{in_support, roma_delta, support_range};

/// `QT` and its transpose `Q`.
#[derive(Clone, Debug)]
pub struct CouplingOperators {
    /// Constraint operator, `num_lambda × num_velocity`.
    pub qt: CsrMatrix,
    /// Its transpose, `num_velocity × num_lambda`.
    pub q: CsrMatrix,
}

/// Positions of the unknowns of component `c` along `axis`.
fn face_coordinates(disc: &Discretization, c: usize, axis: Axis) -> Vec<f64> {
    let mesh = disc.mesh();
    let n = disc.layout().velocity_counts(c)[axis.index()];
    if axis.index() == c {
        mesh.nodes(axis)[1..=n].to_vec()
    } else {
        (0..n).map(|i| mesh.center(axis, i)).collect()
    }
}

/// Local grid spacing at coordinate `x` along `axis`.
fn spacing_at(disc: &Discretization, axis: Axis, x: f64) -> f64 {
    let mesh = disc.mesh();
    let nodes = mesh.nodes(axis);
    let cell = nodes
        .partition_point(|&p| p <= x)
        .saturating_sub(1)
        .min(mesh.cells(axis) - 1);
    mesh.width(axis, cell)
}

/// The interpolation stencil of body point `k` for component `c`:
/// every flux unknown in the delta support, with its weight.
///
/// The weight is the product of the one-dimensional deltas times `RInv`,
/// so it applies to fluxes.
fn interpolation_row(
    disc: &Discretization,
    coords: &[Vec<f64>],
    c: usize,
    k: usize,
    with_values: bool,
) -> Vec<(usize, f64)> {
    let Some(body) = disc.body() else {
        return Vec::new();
    };
    let layout = disc.layout();
    let point = body.points()[k];
    let axes = disc.dim().axes();
    let mut ranges: SmallVec<[(std::ops::Range<usize>, f64); 3]> = SmallVec::new();
    for &axis in axes {
        let a = axis.index();
        let h = spacing_at(disc, axis, point[a]);
        ranges.push((support_range(&coords[a], point[a], h), h));
    }
    let zr = if axes.len() == 3 { ranges[2].0.clone() } else { 0..1 };
    let mut row = Vec::new();
    for iz in zr {
        for iy in ranges[1].0.clone() {
            for ix in ranges[0].0.clone() {
                let idx = [ix, iy, iz];
                let mut weight = 1.0;
                let mut inside = true;
                for &axis in axes {
                    let a = axis.index();
                    let r = (coords[a][idx[a]] - point[a]) / ranges[a].1;
                    inside &= in_support(r);
                    if with_values {
                        weight *= roma_delta(r);
                    }
                }
                if !inside {
                    continue;
                }
                let col = layout.velocity_index(c, idx);
                let value = if with_values { weight * disc.rinv(c, idx) } else { 0.0 };
                row.push((col, value));
            }
        }
    }
    row
}

fn component_coordinates(disc: &Discretization) -> Vec<Vec<Vec<f64>>> {
    (0..disc.dim().count())
        .map(|c| {
            Axis::ALL
                .iter()
                .map(|&axis| face_coordinates(disc, c, axis))
                .collect()
        })
        .collect()
}

fn divergence_row(disc: &Discretization, p: usize) -> SmallVec<[(usize, f64); 6]> {
    let layout = disc.layout();
    let idx = layout.pressure_coords(p);
    let mut row = SmallVec::new();
    for &axis in disc.dim().axes() {
        let (minus, plus) = layout.cell_faces(idx, axis);
        if let FaceRef::Unknown(j) = minus {
            row.push((j, 1.0));
        }
        if let FaceRef::Unknown(j) = plus {
            row.push((j, -1.0));
        }
    }
    row
}

/// Nonzero counts of `QT`, from the face topology and the delta support.
pub fn count_coupling_nonzeros(disc: &Discretization, parts: &Partitions) -> NnzCounts {
    let mut counts = NnzCounts::new(disc.num_lambda());
    let mut cols: Vec<usize> = Vec::new();
    for p in 0..disc.num_pressure() {
        cols.clear();
        cols.extend(divergence_row(disc, p).iter().map(|&(j, _)| j));
        cols.sort_unstable();
        cols.dedup();
        counts.record(p, &cols, &parts.lambda, &parts.velocity);
    }
    if disc.body().is_some() {
        let coords = component_coordinates(disc);
        for c in 0..disc.dim().count() {
            for k in 0..disc.num_body_points() {
                cols.clear();
                cols.extend(
                    interpolation_row(disc, &coords[c], c, k, false)
                        .iter()
                        .map(|&(j, _)| j),
                );
                counts.record(disc.force_row(c, k), &cols, &parts.lambda, &parts.velocity);
            }
        }
    }
    counts
}

/// Assemble `QT` and `Q`.
pub fn assemble_coupling(
    disc: &Discretization,
    parts: &Partitions,
) -> Result<CouplingOperators, AssemblyError> {
    let nl = disc.num_lambda();
    let nv = disc.num_velocity();
    let counts = count_coupling_nonzeros(disc, parts);
    let mut builder = CsrBuilder::with_preallocation(nl, nv, &counts);
    for p in 0..disc.num_pressure() {
        let mut row = divergence_row(disc, p);
        builder.push_row(p, &mut row)?;
    }
    if disc.body().is_some() {
        let coords = component_coordinates(disc);
        for c in 0..disc.dim().count() {
            for k in 0..disc.num_body_points() {
                let mut row = interpolation_row(disc, &coords[c], c, k, true);
                builder.push_row(disc.force_row(c, k), &mut row)?;
            }
        }
    }
    let qt = builder.finish()?;
    let q = qt.transpose();
    debug!(rows = qt.nrows(), cols = qt.ncols(), nnz = qt.nnz(), "assembled QT");
    Ok(CouplingOperators { qt, q })
}

/// `BN · Q`, preallocated from the pattern of `Q`.
pub fn assemble_bnq(
    q: &CsrMatrix,
    scalings: &DiagonalScalings,
    parts: &Partitions,
) -> Result<CsrMatrix, AssemblyError> {
    if scalings.bn.len() != q.nrows() {
        return Err(AssemblyError::DimensionMismatch {
            detail: format!("BN of length {} for Q with {} rows", scalings.bn.len(), q.nrows()),
        });
    }
    let counts = NnzCounts::of_matrix(q, &parts.velocity, &parts.lambda);
    let mut builder = CsrBuilder::with_preallocation(q.nrows(), q.ncols(), &counts);
    let mut row: Vec<(usize, f64)> = Vec::new();
    for i in 0..q.nrows() {
        let (cols, vals) = q.row(i);
        row.clear();
        row.extend(cols.iter().zip(vals).map(|(&j, &v)| (j, scalings.bn[i] * v)));
        builder.push_row(i, &mut row)?;
    }
    builder.finish()
}

/// `QT · BNQ`, preallocated from a symbolic product count.
pub fn assemble_schur_complement(
    qt: &CsrMatrix,
    bnq: &CsrMatrix,
    parts: &Partitions,
) -> Result<CsrMatrix, AssemblyError> {
    let counts = NnzCounts::of_product(qt, bnq, &parts.lambda, &parts.lambda);
    let m = qt.matmul(bnq, Some(&counts))?;
    debug!(rows = m.nrows(), nnz = m.nnz(), "assembled QTBNQ");
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immersed::Body;
    use approx::assert_abs_diff_eq;
    use fracstep_core::Dim;
    use fracstep_grid::{BoundaryConditions, CartesianMesh};

    fn cavity(body: Option<Body>) -> Discretization {
        let mesh = CartesianMesh::uniform(Dim::Two, &[8, 8], &[1.0, 1.0]).unwrap();
        Discretization::new(mesh, BoundaryConditions::no_slip(Dim::Two), body).unwrap()
    }

    #[test]
    fn divergence_rows_sum_boundary_faces() {
        let d = cavity(None);
        let p = Partitions::single(&d);
        let ops = assemble_coupling(&d, &p).unwrap();
        // Corner cell has one interior face per axis (the plus faces).
        let (cols, vals) = ops.qt.row(0);
        assert_eq!(cols.len(), 2);
        assert!(vals.iter().all(|&v| v == -1.0));
        // Interior cell: two faces per axis, entries cancel.
        let mid = d.layout().pressure_index([3, 3, 0]);
        assert_eq!(ops.qt.row_nnz(mid), 4);
        assert_eq!(ops.qt.row(mid).1.iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn q_is_transpose_and_schur_symmetric() {
        let body = Body::new(Dim::Two, vec![[0.5, 0.5, 0.0], [0.55, 0.47, 0.0]]).unwrap();
        let d = cavity(Some(body));
        let p = Partitions::single(&d);
        let ops = assemble_coupling(&d, &p).unwrap();
        assert_eq!(ops.q.transpose(), ops.qt);
        let s = DiagonalScalings::compute(&d, 0.01);
        let bnq = assemble_bnq(&ops.q, &s, &p).unwrap();
        let schur = assemble_schur_complement(&ops.qt, &bnq, &p).unwrap();
        assert!(schur.is_symmetric(1e-12));
        assert_eq!(schur.nrows(), d.num_lambda());
    }

    #[test]
    fn interpolation_reproduces_uniform_flow() {
        let body = Body::new(Dim::Two, vec![[0.43, 0.61, 0.0]]).unwrap();
        let d = cavity(Some(body));
        let ops = assemble_coupling(&d, &Partitions::single(&d)).unwrap();
        // Uniform u = 1: q = area on every u face.
        let layout = d.layout();
        let mut q = vec![0.0; d.num_velocity()];
        for row in layout.velocity_range(0) {
            let (c, idx) = layout.velocity_coords(row);
            q[row] = d.face_area(c, idx);
        }
        let mut out = vec![0.0; d.num_lambda()];
        ops.qt.mul_vec(&q, &mut out);
        assert_abs_diff_eq!(out[d.force_row(0, 0)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[d.force_row(1, 0)], 0.0, epsilon = 1e-12);
    }
}
