//! Staggered unknown numbering.
//!
//! Flux component `c` lives on the faces normal to axis `c`. Along its own
//! axis it has `n - 1` interior faces on a bounded axis (the two boundary
//! faces carry ghost values) and `n` faces on a periodic axis (face `n`
//! coincides with face 0). Along the other axes it has one unknown per
//! cell. Unknown `i` along the own axis sits on node `i + 1`.
//!
//! Global velocity numbering is component-major (all u, then v, then w),
//! x fastest within a component. Pressure is numbered x fastest.

use std::ops::Range;

use fracstep_core::{Axis, Dim};
use smallvec::SmallVec;

use crate::boundary::{BoundaryConditions, BoundaryLocation, Side};
use crate::edge::{resolve_axis, EdgeBehavior, Resolved};
use crate::mesh::CartesianMesh;

/// A face adjacent to a cell or unknown: either an unknown or a boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceRef {
    /// A velocity unknown, by global row.
    Unknown(usize),
    /// A physical boundary face.
    Boundary(BoundaryLocation),
}

/// Index arithmetic for velocity and pressure unknowns.
#[derive(Clone, Debug, PartialEq)]
pub struct StaggeredLayout {
    dim: Dim,
    cells: [usize; 3],
    edges: [EdgeBehavior; 3],
    counts: SmallVec<[[usize; 3]; 3]>,
    offsets: SmallVec<[usize; 4]>,
}

impl StaggeredLayout {
    /// Layout for a mesh under the given boundary conditions.
    pub fn new(mesh: &CartesianMesh, bcs: &BoundaryConditions) -> Self {
        let edges = [bcs.edge(Axis::X), bcs.edge(Axis::Y), bcs.edge(Axis::Z)];
        Self::from_parts(mesh.dim(), mesh.cell_counts(), edges)
    }

    /// Layout from raw cell counts and per-axis edge behavior.
    pub fn from_parts(dim: Dim, cells: [usize; 3], edges: [EdgeBehavior; 3]) -> Self {
        let mut counts = SmallVec::new();
        let mut offsets = SmallVec::new();
        offsets.push(0);
        let mut total = 0;
        for &axis in dim.axes() {
            let mut n = cells;
            let a = axis.index();
            if edges[a] == EdgeBehavior::Bounded {
                n[a] = cells[a].saturating_sub(1);
            }
            total += n.iter().product::<usize>();
            counts.push(n);
            offsets.push(total);
        }
        Self {
            dim,
            cells,
            edges,
            counts,
            offsets,
        }
    }

    /// Spatial dimension.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// Cell counts along x, y, z.
    pub fn cells(&self) -> [usize; 3] {
        self.cells
    }

    /// Edge behavior of `axis`.
    pub fn edge(&self, axis: Axis) -> EdgeBehavior {
        self.edges[axis.index()]
    }

    /// Unknown counts of flux component `c` along x, y, z.
    pub fn velocity_counts(&self, c: usize) -> [usize; 3] {
        self.counts[c]
    }

    /// Total number of velocity unknowns.
    pub fn num_velocity(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    /// Sizes of the flux components in order.
    pub fn velocity_sizes(&self) -> SmallVec<[usize; 3]> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Global row range of flux component `c`.
    pub fn velocity_range(&self, c: usize) -> Range<usize> {
        self.offsets[c]..self.offsets[c + 1]
    }

    /// Global row of flux component `c` at `idx`.
    pub fn velocity_index(&self, c: usize, idx: [usize; 3]) -> usize {
        let n = self.counts[c];
        self.offsets[c] + idx[0] + n[0] * (idx[1] + n[1] * idx[2])
    }

    /// Component and local index of a global velocity row.
    pub fn velocity_coords(&self, row: usize) -> (usize, [usize; 3]) {
        let c = self.offsets.partition_point(|&o| o <= row) - 1;
        let n = self.counts[c];
        let local = row - self.offsets[c];
        (c, [local % n[0], (local / n[0]) % n[1], local / (n[0] * n[1])])
    }

    /// Total number of pressure unknowns.
    pub fn num_pressure(&self) -> usize {
        self.cells.iter().product()
    }

    /// Global row of the pressure unknown in cell `idx`.
    pub fn pressure_index(&self, idx: [usize; 3]) -> usize {
        idx[0] + self.cells[0] * (idx[1] + self.cells[1] * idx[2])
    }

    /// Cell index of a pressure row.
    pub fn pressure_coords(&self, row: usize) -> [usize; 3] {
        let n = self.cells;
        [row % n[0], (row / n[0]) % n[1], row / (n[0] * n[1])]
    }

    /// Neighbour of flux unknown (`c`, `idx`) one step along `axis`.
    ///
    /// Periodic axes wrap; bounded axes return the boundary face crossed.
    pub fn velocity_neighbour(&self, c: usize, idx: [usize; 3], axis: Axis, step: isize) -> FaceRef {
        let a = axis.index();
        match resolve_axis(idx[a] as isize + step, self.counts[c][a], self.edges[a]) {
            Resolved::Inside(j) => {
                let mut n = idx;
                n[a] = j;
                FaceRef::Unknown(self.velocity_index(c, n))
            }
            Resolved::Below => FaceRef::Boundary(BoundaryLocation::new(axis, Side::Minus)),
            Resolved::Above => FaceRef::Boundary(BoundaryLocation::new(axis, Side::Plus)),
        }
    }

    /// The two faces of cell `idx` normal to `axis`, low side first.
    pub fn cell_faces(&self, idx: [usize; 3], axis: Axis) -> (FaceRef, FaceRef) {
        let a = axis.index();
        let c = a;
        let i = idx[a];
        let minus = match self.edges[a] {
            EdgeBehavior::Wrap => {
                let mut f = idx;
                f[a] = if i == 0 { self.cells[a] - 1 } else { i - 1 };
                FaceRef::Unknown(self.velocity_index(c, f))
            }
            EdgeBehavior::Bounded if i == 0 => {
                FaceRef::Boundary(BoundaryLocation::new(axis, Side::Minus))
            }
            EdgeBehavior::Bounded => {
                let mut f = idx;
                f[a] = i - 1;
                FaceRef::Unknown(self.velocity_index(c, f))
            }
        };
        let plus = if self.edges[a] == EdgeBehavior::Bounded && i + 1 == self.cells[a] {
            FaceRef::Boundary(BoundaryLocation::new(axis, Side::Plus))
        } else {
            FaceRef::Unknown(self.velocity_index(c, idx))
        };
        (minus, plus)
    }

    /// Number of ghost values of component `c` on a face normal to `axis`.
    pub fn ghost_count(&self, c: usize, axis: Axis) -> usize {
        let n = self.counts[c];
        (0..3).filter(|&e| e != axis.index()).map(|e| n[e]).product()
    }

    /// Position in the ghost array of component `c` on a face normal to
    /// `axis` for the unknown (or boundary point) at `idx`.
    ///
    /// The coordinate along `axis` is ignored.
    pub fn ghost_index(&self, c: usize, axis: Axis, idx: [usize; 3]) -> usize {
        let n = self.counts[c];
        let mut index = 0;
        let mut stride = 1;
        for e in 0..3 {
            if e == axis.index() {
                continue;
            }
            index += idx[e] * stride;
            stride *= n[e];
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded_2d(nx: usize, ny: usize) -> StaggeredLayout {
        StaggeredLayout::from_parts(
            Dim::Two,
            [nx, ny, 1],
            [EdgeBehavior::Bounded; 3],
        )
    }

    #[test]
    fn bounded_counts() {
        let l = bounded_2d(4, 3);
        assert_eq!(l.velocity_counts(0), [3, 3, 1]);
        assert_eq!(l.velocity_counts(1), [4, 2, 1]);
        assert_eq!(l.num_velocity(), 9 + 8);
        assert_eq!(l.num_pressure(), 12);
        assert_eq!(l.velocity_range(1), 9..17);
    }

    #[test]
    fn periodic_counts() {
        let l = StaggeredLayout::from_parts(
            Dim::Two,
            [4, 3, 1],
            [EdgeBehavior::Wrap, EdgeBehavior::Wrap, EdgeBehavior::Bounded],
        );
        assert_eq!(l.num_velocity(), 24);
    }

    #[test]
    fn coords_round_trip() {
        let l = bounded_2d(5, 4);
        for row in 0..l.num_velocity() {
            let (c, idx) = l.velocity_coords(row);
            assert_eq!(l.velocity_index(c, idx), row);
        }
        for row in 0..l.num_pressure() {
            assert_eq!(l.pressure_index(l.pressure_coords(row)), row);
        }
    }

    #[test]
    fn neighbour_crosses_boundary() {
        let l = bounded_2d(4, 3);
        assert_eq!(
            l.velocity_neighbour(0, [0, 1, 0], Axis::X, -1),
            FaceRef::Boundary(BoundaryLocation::XMinus)
        );
        assert_eq!(
            l.velocity_neighbour(0, [0, 2, 0], Axis::Y, 1),
            FaceRef::Boundary(BoundaryLocation::YPlus)
        );
        assert_eq!(
            l.velocity_neighbour(0, [1, 1, 0], Axis::X, 1),
            FaceRef::Unknown(l.velocity_index(0, [2, 1, 0]))
        );
    }

    #[test]
    fn cell_faces_bounded_and_periodic() {
        let l = bounded_2d(4, 3);
        assert_eq!(
            l.cell_faces([0, 0, 0], Axis::X),
            (
                FaceRef::Boundary(BoundaryLocation::XMinus),
                FaceRef::Unknown(0)
            )
        );
        assert_eq!(
            l.cell_faces([3, 0, 0], Axis::X).1,
            FaceRef::Boundary(BoundaryLocation::XPlus)
        );
        let p = StaggeredLayout::from_parts(
            Dim::Two,
            [4, 3, 1],
            [EdgeBehavior::Wrap, EdgeBehavior::Bounded, EdgeBehavior::Bounded],
        );
        assert_eq!(
            p.cell_faces([0, 1, 0], Axis::X).0,
            FaceRef::Unknown(p.velocity_index(0, [3, 1, 0]))
        );
    }

    #[test]
    fn ghost_index_skips_axis() {
        let l = bounded_2d(4, 3);
        assert_eq!(l.ghost_count(0, Axis::X), 3);
        assert_eq!(l.ghost_count(0, Axis::Y), 3);
        assert_eq!(l.ghost_count(1, Axis::Y), 4);
        assert_eq!(l.ghost_index(0, Axis::X, [2, 1, 0]), 1);
        assert_eq!(l.ghost_index(1, Axis::Y, [3, 1, 0]), 3);
    }
}
