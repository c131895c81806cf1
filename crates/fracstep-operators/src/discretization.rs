//! The mesh, its boundary conditions and the resulting unknown layout.

use fracstep_core::{Axis, ConfigError, Dim};
use fracstep_grid::{
    resolve_axis, BoundaryConditions, CartesianMesh, Resolved, StaggeredLayout,
};
use fracstep_linalg::RowPartition;
use smallvec::SmallVec;

use crate::immersed::Body;

/// Everything the operators need to know about the spatial problem.
#[derive(Clone, Debug)]
pub struct Discretization {
    mesh: CartesianMesh,
    bcs: BoundaryConditions,
    layout: StaggeredLayout,
    body: Option<Body>,
}

/// Row ownership of the velocity and pressure/force vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partitions {
    /// Ownership of velocity unknowns (rows and columns of `A`).
    pub velocity: RowPartition,
    /// Ownership of pressure/force unknowns (rows of `QT`).
    pub lambda: RowPartition,
}

impl Partitions {
    /// Even split of both vectors over `ranks` ranks.
    pub fn even(disc: &Discretization, ranks: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            velocity: RowPartition::even(disc.num_velocity(), ranks)?,
            lambda: RowPartition::even(disc.num_lambda(), ranks)?,
        })
    }

    /// One rank owning everything.
    pub fn single(disc: &Discretization) -> Self {
        Self {
            velocity: RowPartition::single(disc.num_velocity()),
            lambda: RowPartition::single(disc.num_lambda()),
        }
    }
}

impl Discretization {
    /// Combine a mesh, validated boundary conditions and an optional body.
    pub fn new(
        mesh: CartesianMesh,
        bcs: BoundaryConditions,
        body: Option<Body>,
    ) -> Result<Self, ConfigError> {
        if bcs.dim() != mesh.dim() {
            return Err(ConfigError::invalid(
                "boundaryConditions",
                format!(
                    "declared for {}D but the mesh is {}D",
                    bcs.dim().count(),
                    mesh.dim().count()
                ),
            ));
        }
        bcs.validate()?;
        if let Some(b) = &body {
            if b.dim() != mesh.dim() {
                return Err(ConfigError::invalid("body", "dimension differs from the mesh"));
            }
            for (k, p) in b.points().iter().enumerate() {
                for &axis in mesh.dim().axes() {
                    let a = axis.index();
                    let x = p[a];
                    if x <= mesh.start(axis) || x >= mesh.start(axis) + mesh.length(axis) {
                        return Err(ConfigError::invalid(
                            format!("body point {k}"),
                            format!("{axis} = {x} lies outside the domain"),
                        ));
                    }
                }
            }
        }
        let layout = StaggeredLayout::new(&mesh, &bcs);
        Ok(Self {
            mesh,
            bcs,
            layout,
            body,
        })
    }

    /// The mesh.
    pub fn mesh(&self) -> &CartesianMesh {
        &self.mesh
    }

    /// Boundary conditions.
    pub fn bcs(&self) -> &BoundaryConditions {
        &self.bcs
    }

    /// Unknown numbering.
    pub fn layout(&self) -> &StaggeredLayout {
        &self.layout
    }

    /// The immersed body, if any.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Spatial dimension.
    pub fn dim(&self) -> Dim {
        self.mesh.dim()
    }

    /// Number of velocity (flux) unknowns.
    pub fn num_velocity(&self) -> usize {
        self.layout.num_velocity()
    }

    /// Number of pressure unknowns.
    pub fn num_pressure(&self) -> usize {
        self.layout.num_pressure()
    }

    /// Number of body points (0 without a body).
    pub fn num_body_points(&self) -> usize {
        self.body.as_ref().map_or(0, Body::len)
    }

    /// Length of the pressure/force vector.
    pub fn num_lambda(&self) -> usize {
        self.num_pressure() + self.dim().count() * self.num_body_points()
    }

    /// Component sizes of the pressure/force vector: pressure, then one
    /// force block per direction in immersed-boundary runs.
    pub fn lambda_sizes(&self) -> SmallVec<[usize; 4]> {
        let mut sizes = SmallVec::new();
        sizes.push(self.num_pressure());
        if self.body.is_some() {
            for _ in 0..self.dim().count() {
                sizes.push(self.num_body_points());
            }
        }
        sizes
    }

    /// Row of the force on body point `k` along component `c`.
    pub fn force_row(&self, c: usize, k: usize) -> usize {
        self.num_pressure() + c * self.num_body_points() + k
    }

    /// Cell index `i` along `axis`, wrapped on periodic axes.
    pub fn cell(&self, axis: Axis, i: isize) -> Option<usize> {
        match resolve_axis(i, self.mesh.cells(axis), self.layout.edge(axis)) {
            Resolved::Inside(k) => Some(k),
            _ => None,
        }
    }

    /// Staggered extent of flux unknown (`c`, `idx`) along its own axis.
    pub fn mhat(&self, c: usize, idx: [usize; 3]) -> f64 {
        let axis = Axis::ALL[c];
        let i = idx[c];
        let next = self.cell(axis, i as isize + 1).unwrap_or(i);
        0.5 * (self.mesh.width(axis, i) + self.mesh.width(axis, next))
    }

    /// Area of the face carrying flux unknown (`c`, `idx`).
    pub fn face_area(&self, c: usize, idx: [usize; 3]) -> f64 {
        Axis::ALL
            .iter()
            .filter(|a| a.index() != c)
            .map(|&a| self.mesh.width(a, idx[a.index()]))
            .product()
    }

    /// `1 / face area`: converts a flux into a velocity.
    pub fn rinv(&self, c: usize, idx: [usize; 3]) -> f64 {
        1.0 / self.face_area(c, idx)
    }

    /// Coordinates of the face centre of flux unknown (`c`, `idx`).
    pub fn face_position(&self, c: usize, idx: [usize; 3]) -> [f64; 3] {
        let mut x = [0.0; 3];
        for axis in Axis::ALL {
            let a = axis.index();
            x[a] = if a == c {
                self.mesh.nodes(axis)[idx[a] + 1]
            } else {
                self.mesh.center(axis, idx[a])
            };
        }
        x
    }

    /// Area of the boundary face of cell `idx` normal to `axis`.
    pub fn cell_face_area(&self, axis: Axis, idx: [usize; 3]) -> f64 {
        self.face_area(axis.index(), idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fracstep_grid::{BoundaryCondition, BoundaryLocation};

    fn stretched() -> Discretization {
        let mesh = CartesianMesh::from_nodes(
            Dim::Two,
            vec![vec![0.0, 1.0, 3.0, 6.0], vec![0.0, 0.5, 1.0]],
        )
        .unwrap();
        Discretization::new(mesh, BoundaryConditions::no_slip(Dim::Two), None).unwrap()
    }

    #[test]
    fn geometry_of_faces() {
        let d = stretched();
        // u unknown 1 sits on node x = 3, between cells of width 2 and 3.
        assert_abs_diff_eq!(d.mhat(0, [1, 0, 0]), 2.5);
        assert_abs_diff_eq!(d.face_area(0, [1, 1, 0]), 0.5);
        assert_abs_diff_eq!(d.rinv(1, [2, 0, 0]), 1.0 / 3.0);
        assert_eq!(d.face_position(0, [1, 1, 0]), [3.0, 0.75, 0.5]);
        assert_eq!(d.face_position(1, [0, 0, 0]), [0.5, 0.5, 0.5]);
        assert_eq!(d.num_lambda(), 6);
        assert_eq!(d.lambda_sizes().as_slice(), &[6]);
    }

    #[test]
    fn periodic_mhat_wraps() {
        let mesh = CartesianMesh::from_nodes(
            Dim::Two,
            vec![vec![0.0, 1.0, 3.0], vec![0.0, 1.0, 2.0]],
        )
        .unwrap();
        let mut bcs = BoundaryConditions::no_slip(Dim::Two);
        for loc in [BoundaryLocation::XMinus, BoundaryLocation::XPlus] {
            for c in 0..2 {
                bcs.set(loc, c, BoundaryCondition::periodic());
            }
        }
        let d = Discretization::new(mesh, bcs, None).unwrap();
        assert_abs_diff_eq!(d.mhat(0, [1, 0, 0]), 1.5);
        assert_eq!(d.cell(Axis::X, -1), Some(1));
        assert_eq!(d.cell(Axis::Y, -1), None);
    }

    #[test]
    fn body_outside_domain_is_rejected() {
        let mesh = CartesianMesh::uniform(Dim::Two, &[4, 4], &[1.0, 1.0]).unwrap();
        let body = Body::new(Dim::Two, vec![[1.5, 0.5, 0.0]]).unwrap();
        assert!(
            Discretization::new(mesh, BoundaryConditions::no_slip(Dim::Two), Some(body)).is_err()
        );
    }
}
