//! Second-order Laplacian stencil on staggered fluxes.
//!
//! The operator is `L = MHat · Lap · RInv`: `RInv` turns fluxes into
//! velocities, `Lap` is the standard three-point second difference per
//! axis on the (possibly stretched) grid, `MHat` scales each row by the
//! unknown's staggered extent. The resulting matrix is symmetric.
//!
//! Neighbours past a bounded axis are ghost values living on the boundary
//! itself: a normal component's ghost sits on the boundary face (one cell
//! width from the first unknown), a tangential component's ghost sits on
//! the wall (half a cell from the first unknown). Their coefficients
//! multiply velocities, not fluxes.

use fracstep_grid::{BoundaryLocation, FaceRef, StaggeredLayout};
use smallvec::SmallVec;

use crate::discretization::Discretization;

/// Coupling of a velocity row to one boundary ghost value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GhostTerm {
    /// Boundary face of the ghost.
    pub location: BoundaryLocation,
    /// Velocity component of the ghost.
    pub component: usize,
    /// Position in the ghost array of that face and component.
    pub index: usize,
    /// Coefficient multiplying the ghost velocity.
    pub coefficient: f64,
}

/// One row of `L`.
#[derive(Clone, Debug, PartialEq)]
pub struct StencilRow {
    /// Diagonal entry.
    pub diagonal: f64,
    /// Off-diagonal entries `(column, value)`; periodic wrap on two cells
    /// may repeat a column.
    pub neighbours: SmallVec<[(usize, f64); 6]>,
    /// Boundary ghost couplings.
    pub boundary: SmallVec<[GhostTerm; 2]>,
}

/// Columns of the Laplacian row `row`, diagonal included, sorted and
/// without duplicates. Depends only on the numbering.
pub fn stencil_columns(layout: &StaggeredLayout, row: usize) -> SmallVec<[usize; 7]> {
    let (c, idx) = layout.velocity_coords(row);
    let mut cols: SmallVec<[usize; 7]> = SmallVec::new();
    cols.push(row);
    for &axis in layout.dim().axes() {
        for step in [-1, 1] {
            if let FaceRef::Unknown(j) = layout.velocity_neighbour(c, idx, axis, step) {
                cols.push(j);
            }
        }
    }
    cols.sort_unstable();
    cols.dedup();
    cols
}

/// Row `row` of `L` with its boundary couplings.
pub fn laplacian_row(disc: &Discretization, row: usize) -> StencilRow {
    let layout = disc.layout();
    let mesh = disc.mesh();
    let (c, idx) = layout.velocity_coords(row);
    let mhat = disc.mhat(c, idx);
    let rinv = disc.rinv(c, idx);
    let mut lap_diag = 0.0;
    let mut neighbours = SmallVec::new();
    let mut boundary = SmallVec::new();

    for &axis in disc.dim().axes() {
        let a = axis.index();
        let i = idx[a];
        let w = mesh.width(axis, i);
        for step in [-1isize, 1] {
            let lap = if a == c {
                // Node spacing: to node i on the minus side, to node i + 2
                // on the plus side.
                let h = if step < 0 {
                    w
                } else {
                    let next = disc.cell(axis, i as isize + 1).unwrap_or(i);
                    mesh.width(axis, next)
                };
                1.0 / (mhat * h)
            } else {
                let spacing = match disc.cell(axis, i as isize + step) {
                    Some(k) => 0.5 * (w + mesh.width(axis, k)),
                    None => 0.5 * w,
                };
                1.0 / (w * spacing)
            };
            lap_diag -= lap;
            match layout.velocity_neighbour(c, idx, axis, step) {
                FaceRef::Unknown(j) => {
                    let (cj, idx_j) = layout.velocity_coords(j);
                    neighbours.push((j, mhat * lap * disc.rinv(cj, idx_j)));
                }
                FaceRef::Boundary(location) => boundary.push(GhostTerm {
                    location,
                    component: c,
                    index: layout.ghost_index(c, axis, idx),
                    coefficient: mhat * lap,
                }),
            }
        }
    }

    StencilRow {
        diagonal: mhat * lap_diag * rinv,
        neighbours,
        boundary,
    }
}
