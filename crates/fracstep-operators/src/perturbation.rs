//! Divergence-free perturbation of the initial flux field.

use std::f64::consts::PI;

use fracstep_core::Axis;

use crate::discretization::Discretization;

/// Add `amplitude · sin(π f x̂) · sin(π f ŷ)`-shaped vortices to the x-y
/// fluxes of `q`, with `x̂`, `ŷ` the coordinates normalised to the domain.
///
/// The perturbation is the discrete curl of a streamfunction sampled at
/// cell corners, so it adds no divergence in any cell and no flux through
/// the domain boundary. A zero amplitude or frequency leaves `q` as is.
pub fn add_perturbation(disc: &Discretization, amplitude: f64, frequency: f64, q: &mut [f64]) {
    if amplitude == 0.0 || frequency == 0.0 {
        return;
    }
    let mesh = disc.mesh();
    let layout = disc.layout();
    let (x0, lx) = (mesh.start(Axis::X), mesh.length(Axis::X));
    let (y0, ly) = (mesh.start(Axis::Y), mesh.length(Axis::Y));
    let scale = amplitude * ly / (PI * frequency);
    let psi = |x: f64, y: f64| {
        scale * (PI * frequency * (x - x0) / lx).sin() * (PI * frequency * (y - y0) / ly).sin()
    };
    let xs = mesh.nodes(Axis::X);
    let ys = mesh.nodes(Axis::Y);

    for row in layout.velocity_range(0) {
        let (_, [i, j, k]) = layout.velocity_coords(row);
        let dz = mesh.width(Axis::Z, k);
        q[row] += (psi(xs[i + 1], ys[j + 1]) - psi(xs[i + 1], ys[j])) * dz;
    }
    for row in layout.velocity_range(1) {
        let (_, [i, j, k]) = layout.velocity_coords(row);
        let dz = mesh.width(Axis::Z, k);
        q[row] -= (psi(xs[i + 1], ys[j + 1]) - psi(xs[i], ys[j + 1])) * dz;
    }
}
