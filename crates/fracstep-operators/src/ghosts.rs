//! Boundary ghost velocities.
//!
//! Every non-periodic face stores one value per velocity component and per
//! boundary point of that component. Normal components sit on the face
//! itself, tangential components on the wall half a cell outside the
//! first interior unknown.

use fracstep_core::{Axis, ConfigError};
use fracstep_grid::{BoundaryKind, BoundaryLocation, Side};

use crate::diagonal::DiagonalScalings;
use crate::discretization::Discretization;

/// One boundary point: the interior unknown next to it, its slot in the
/// ghost array and the distance between the two.
#[derive(Clone, Copy, Debug)]
struct GhostPoint {
    interior: usize,
    slot: usize,
    distance: f64,
}

/// Ghost velocities on every boundary face, indexed `[location][component]`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryGhosts {
    values: [[Vec<f64>; 3]; 6],
}

fn boundary_points(disc: &Discretization, location: BoundaryLocation, c: usize) -> Vec<GhostPoint> {
    let layout = disc.layout();
    let mesh = disc.mesh();
    let axis = location.axis();
    let a = axis.index();
    let n = layout.velocity_counts(c);
    let (fixed, cell) = match location.side() {
        Side::Minus => (0, 0),
        Side::Plus => (n[a] - 1, mesh.cells(axis) - 1),
    };
    let width = mesh.width(axis, cell);
    let distance = if a == c { width } else { 0.5 * width };
    let mut ranges = [0..n[0], 0..n[1], 0..n[2]];
    ranges[a] = fixed..fixed + 1;
    let mut points = Vec::with_capacity(layout.ghost_count(c, axis));
    for k in ranges[2].clone() {
        for j in ranges[1].clone() {
            for i in ranges[0].clone() {
                let idx = [i, j, k];
                points.push(GhostPoint {
                    interior: layout.velocity_index(c, idx),
                    slot: layout.ghost_index(c, axis, idx),
                    distance,
                });
            }
        }
    }
    points
}

fn is_active(disc: &Discretization, location: BoundaryLocation) -> bool {
    let axis = location.axis();
    axis.index() < disc.dim().count() && !disc.bcs().is_periodic(axis)
}

impl BoundaryGhosts {
    /// Ghosts for the initial flux field `q`: Dirichlet faces take their
    /// value, every other face copies the adjacent interior velocity.
    pub fn initialize(disc: &Discretization, scalings: &DiagonalScalings, q: &[f64]) -> Self {
        let mut values: [[Vec<f64>; 3]; 6] = Default::default();
        for location in BoundaryLocation::ALL {
            if !is_active(disc, location) {
                continue;
            }
            for c in 0..disc.dim().count() {
                let bc = disc.bcs().get(location, c);
                let mut slots = vec![0.0; disc.layout().ghost_count(c, location.axis())];
                for p in boundary_points(disc, location, c) {
                    slots[p.slot] = match bc.kind {
                        BoundaryKind::Dirichlet => bc.value,
                        _ => q[p.interior] * scalings.rinv[p.interior],
                    };
                }
                values[location.index()][c] = slots;
            }
        }
        Self { values }
    }

    /// Advance the ghosts to the next time level from the current fluxes.
    ///
    /// Neumann faces extrapolate the interior value with the prescribed
    /// gradient, convective faces advect the ghost out with the prescribed
    /// speed, Dirichlet faces keep their value.
    pub fn update(&mut self, disc: &Discretization, scalings: &DiagonalScalings, q: &[f64]) {
        let dt = scalings.dt;
        for location in BoundaryLocation::ALL {
            if !is_active(disc, location) {
                continue;
            }
            let sign = match location.side() {
                Side::Minus => -1.0,
                Side::Plus => 1.0,
            };
            for c in 0..disc.dim().count() {
                let bc = disc.bcs().get(location, c);
                let slots = &mut self.values[location.index()][c];
                for p in boundary_points(disc, location, c) {
                    let interior = q[p.interior] * scalings.rinv[p.interior];
                    let g = &mut slots[p.slot];
                    match bc.kind {
                        BoundaryKind::Dirichlet => *g = bc.value,
                        BoundaryKind::Neumann => *g = interior + sign * bc.value * p.distance,
                        BoundaryKind::Convective => {
                            *g -= bc.value * dt * (*g - interior) / p.distance;
                        }
                        BoundaryKind::Periodic => {}
                    }
                }
            }
        }
    }

    /// Ghost value `slot` of component `c` on `location`.
    pub fn value(&self, location: BoundaryLocation, c: usize, slot: usize) -> f64 {
        self.values[location.index()][c][slot]
    }

    /// All ghost values of component `c` on `location`; empty for
    /// periodic or inactive faces.
    pub fn values(&self, location: BoundaryLocation, c: usize) -> &[f64] {
        &self.values[location.index()][c]
    }

    /// Whether the ghosts on the face normal to `axis` exist.
    pub fn has_face(&self, axis: Axis) -> bool {
        self.values[BoundaryLocation::new(axis, Side::Minus).index()]
            .iter()
            .any(|v| !v.is_empty())
    }

    /// Number of ghost values `disc` needs over every face and component.
    pub fn count(disc: &Discretization) -> usize {
        BoundaryLocation::ALL
            .into_iter()
            .filter(|&location| is_active(disc, location))
            .map(|location| {
                (0..disc.dim().count())
                    .map(|c| disc.layout().ghost_count(c, location.axis()))
                    .sum::<usize>()
            })
            .sum()
    }

    /// Total number of ghost values over every face and component.
    pub fn len(&self) -> usize {
        self.values.iter().flatten().map(Vec::len).sum()
    }

    /// Whether every face is periodic or inactive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every ghost value in one vector, ordered by face then component.
    pub fn to_flat(&self) -> Vec<f64> {
        self.values.iter().flatten().flatten().copied().collect()
    }

    /// Overwrite every ghost value from a vector laid out like
    /// [`to_flat`](Self::to_flat).
    pub fn restore(&mut self, flat: &[f64]) -> Result<(), ConfigError> {
        if flat.len() != self.len() {
            return Err(ConfigError::invalid(
                "ghosts",
                format!("expected {} values, found {}", self.len(), flat.len()),
            ));
        }
        let mut offset = 0;
        for slots in self.values.iter_mut().flatten() {
            let n = slots.len();
            slots.copy_from_slice(&flat[offset..offset + n]);
            offset += n;
        }
        Ok(())
    }
}
