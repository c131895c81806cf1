//! Explicit part of the momentum right-hand side.
//!
//! `H = -(γ Nⁿ + ζ Nⁿ⁻¹) + (1 - θ) ν L qⁿ`, where `N = MHat · ∇·(u u)` is
//! the convective term in conservative form evaluated on the staggered
//! velocities. The boundary contribution of the explicit diffusion lives
//! in `bc1`, not here.

use fracstep_core::Axis;
use fracstep_grid::{BoundaryLocation, FaceRef, Side};
use fracstep_linalg::CsrMatrix;

use crate::diagonal::DiagonalScalings;
use crate::discretization::Discretization;
use crate::ghosts::BoundaryGhosts;
use crate::scheme::{ConvectionScheme, DiffusionCoefficients};

/// Velocity of the own-axis neighbour of (`c`, `idx`), or the boundary
/// ghost past the last unknown.
fn neighbour_velocity(
    disc: &Discretization,
    u: &[f64],
    ghosts: &BoundaryGhosts,
    c: usize,
    idx: [usize; 3],
    axis: Axis,
    step: isize,
) -> f64 {
    let layout = disc.layout();
    match layout.velocity_neighbour(c, idx, axis, step) {
        FaceRef::Unknown(j) => u[j],
        FaceRef::Boundary(location) => ghosts.value(location, c, layout.ghost_index(c, axis, idx)),
    }
}

/// Component `a` velocity at the edge shared by unknown (`c`, `idx`) and
/// its neighbour one `step` along `a`.
///
/// The edge lies on node `idx[c] + 1` along `c`, between cells `idx[c]`
/// and `idx[c] + 1`; the two component-`a` values there are blended with
/// distance weights.
fn transport_velocity(
    disc: &Discretization,
    u: &[f64],
    ghosts: &BoundaryGhosts,
    c: usize,
    idx: [usize; 3],
    axis: Axis,
    step: isize,
) -> f64 {
    let layout = disc.layout();
    let mesh = disc.mesh();
    let a = axis.index();
    let c_axis = Axis::ALL[c];
    let node = if step < 0 { idx[a] } else { idx[a] + 1 };
    let n_a = mesh.cells(axis);

    let k0 = idx[c];
    let k1 = disc.cell(c_axis, k0 as isize + 1).unwrap_or(k0);
    let h0 = mesh.width(c_axis, k0);
    let h1 = mesh.width(c_axis, k1);

    let sample = |kc: usize| {
        let mut jdx = idx;
        jdx[c] = kc;
        if disc.bcs().is_periodic(axis) {
            jdx[a] = (node + n_a - 1) % n_a;
            return u[layout.velocity_index(a, jdx)];
        }
        let side = if node == 0 {
            Some(Side::Minus)
        } else if node == n_a {
            Some(Side::Plus)
        } else {
            None
        };
        match side {
            Some(side) => {
                let location = BoundaryLocation::new(axis, side);
                ghosts.value(location, a, layout.ghost_index(a, axis, jdx))
            }
            None => {
                jdx[a] = node - 1;
                u[layout.velocity_index(a, jdx)]
            }
        }
    };

    (sample(k0) * h1 + sample(k1) * h0) / (h0 + h1)
}

/// Convective term `N = MHat · ∇·(u u)` for velocities `u` (not fluxes).
pub fn convection(disc: &Discretization, u: &[f64], ghosts: &BoundaryGhosts, out: &mut [f64]) {
    let layout = disc.layout();
    let mesh = disc.mesh();
    for (row, n) in out.iter_mut().enumerate() {
        let (c, idx) = layout.velocity_coords(row);
        let here = u[row];
        let mhat = disc.mhat(c, idx);
        let mut total = 0.0;
        for &axis in disc.dim().axes() {
            let a = axis.index();
            if a == c {
                let minus = 0.5 * (neighbour_velocity(disc, u, ghosts, c, idx, axis, -1) + here);
                let plus = 0.5 * (here + neighbour_velocity(disc, u, ghosts, c, idx, axis, 1));
                total += plus * plus - minus * minus;
                continue;
            }
            let w = mesh.width(axis, idx[a]);
            let mut flux = [0.0; 2];
            for (f, step) in flux.iter_mut().zip([-1isize, 1]) {
                let carried = match layout.velocity_neighbour(c, idx, axis, step) {
                    FaceRef::Unknown(j) => {
                        let k = disc.cell(axis, idx[a] as isize + step).unwrap_or(idx[a]);
                        let wk = mesh.width(axis, k);
                        (here * wk + u[j] * w) / (w + wk)
                    }
                    FaceRef::Boundary(location) => {
                        ghosts.value(location, c, layout.ghost_index(c, axis, idx))
                    }
                };
                *f = carried * transport_velocity(disc, u, ghosts, c, idx, axis, step);
            }
            total += mhat * (flux[1] - flux[0]) / w;
        }
        *n = total;
    }
}

/// Explicit momentum terms and the convection history they depend on.
#[derive(Clone, Debug)]
pub struct ExplicitTerms {
    scheme: ConvectionScheme,
    coefficients: DiffusionCoefficients,
    laplacian: CsrMatrix,
    velocity: Vec<f64>,
    current: Vec<f64>,
    previous: Option<Vec<f64>>,
}

impl ExplicitTerms {
    /// Explicit terms for the given schemes and flux-form Laplacian `L`.
    pub fn new(
        scheme: ConvectionScheme,
        coefficients: DiffusionCoefficients,
        laplacian: CsrMatrix,
    ) -> Self {
        let n = laplacian.nrows();
        Self {
            scheme,
            coefficients,
            laplacian,
            velocity: vec![0.0; n],
            current: vec![0.0; n],
            previous: None,
        }
    }

    /// Compute `H` for fluxes `q`, then remember `Nⁿ` as the history for
    /// the next call.
    pub fn calculate(
        &mut self,
        disc: &Discretization,
        scalings: &DiagonalScalings,
        q: &[f64],
        ghosts: &BoundaryGhosts,
        h: &mut [f64],
    ) {
        scalings.velocities(q, &mut self.velocity);
        convection(disc, &self.velocity, ghosts, &mut self.current);

        let (gamma, zeta) = self.scheme.coefficients(self.previous.is_some());
        let k = (1.0 - self.coefficients.theta) * self.coefficients.nu;
        if k == 0.0 {
            h.fill(0.0);
        } else {
            self.laplacian.mul_vec(q, h);
            h.iter_mut().for_each(|v| *v *= k);
        }
        for (i, hi) in h.iter_mut().enumerate() {
            *hi -= gamma * self.current[i];
        }
        if let Some(prev) = &self.previous {
            for (hi, p) in h.iter_mut().zip(prev) {
                *hi -= zeta * p;
            }
        }

        match &mut self.previous {
            Some(prev) => std::mem::swap(prev, &mut self.current),
            None => self.previous = Some(self.current.clone()),
        }
    }

    /// Convection term of the latest step, if any step has been taken or a
    /// history was restored.
    pub fn history(&self) -> Option<&[f64]> {
        self.previous.as_deref()
    }

    /// Restore the convection history from a checkpoint.
    pub fn set_history(&mut self, n: Vec<f64>) {
        self.previous = Some(n);
    }

    /// Convection scheme in use.
    pub fn scheme(&self) -> ConvectionScheme {
        self.scheme
    }
}
