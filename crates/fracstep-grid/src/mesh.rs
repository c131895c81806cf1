//! Structured Cartesian mesh: node coordinates and cell widths per axis.

use fracstep_core::{Axis, ConfigError, Dim};
use smallvec::SmallVec;

/// One stretched sub-domain along an axis.
///
/// Consecutive cell widths grow by `stretch_ratio`; a ratio of 1 gives a
/// uniform segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StretchedSegment {
    /// Coordinate where the segment ends.
    pub end: f64,
    /// Number of cells in the segment.
    pub cells: usize,
    /// Ratio between consecutive cell widths.
    pub stretch_ratio: f64,
}

/// Node coordinates and cell widths of a rectangular staggered mesh.
///
/// Pressure lives at cell centres, the flux component normal to an axis
/// lives on the cell faces along that axis. A 2D mesh stores one cell of
/// unit width along z.
#[derive(Clone, Debug, PartialEq)]
pub struct CartesianMesh {
    dim: Dim,
    nodes: SmallVec<[Vec<f64>; 3]>,
    widths: SmallVec<[Vec<f64>; 3]>,
}

impl CartesianMesh {
    /// Build from explicit node coordinates, one array per active axis.
    ///
    /// Each axis needs at least two cells and strictly increasing finite
    /// coordinates.
    pub fn from_nodes(dim: Dim, nodes: Vec<Vec<f64>>) -> Result<Self, ConfigError> {
        if nodes.len() != dim.count() {
            return Err(ConfigError::invalid(
                "mesh",
                format!("expected {} axes, got {}", dim.count(), nodes.len()),
            ));
        }
        let mut all_nodes: SmallVec<[Vec<f64>; 3]> = SmallVec::new();
        let mut widths: SmallVec<[Vec<f64>; 3]> = SmallVec::new();
        for (a, axis_nodes) in nodes.into_iter().enumerate() {
            let axis = Axis::ALL[a];
            if axis_nodes.len() < 3 {
                return Err(ConfigError::invalid(
                    format!("mesh axis {axis}"),
                    "at least two cells are required",
                ));
            }
            if axis_nodes.iter().any(|x| !x.is_finite()) {
                return Err(ConfigError::invalid(
                    format!("mesh axis {axis}"),
                    "coordinates must be finite",
                ));
            }
            let w: Vec<f64> = axis_nodes.windows(2).map(|p| p[1] - p[0]).collect();
            if let Some(i) = w.iter().position(|&h| h <= 0.0) {
                return Err(ConfigError::invalid(
                    format!("mesh axis {axis}"),
                    format!("coordinates must increase strictly (cell {i})"),
                ));
            }
            all_nodes.push(axis_nodes);
            widths.push(w);
        }
        if dim == Dim::Two {
            all_nodes.push(vec![0.0, 1.0]);
            widths.push(vec![1.0]);
        }
        Ok(Self {
            dim,
            nodes: all_nodes,
            widths,
        })
    }

    /// Uniform mesh starting at the origin.
    pub fn uniform(dim: Dim, cells: &[usize], lengths: &[f64]) -> Result<Self, ConfigError> {
        if cells.len() != dim.count() || lengths.len() != dim.count() {
            return Err(ConfigError::invalid(
                "mesh",
                "cells and lengths must have one entry per dimension",
            ));
        }
        let nodes = cells
            .iter()
            .zip(lengths)
            .map(|(&n, &l)| (0..=n).map(|i| l * i as f64 / n.max(1) as f64).collect())
            .collect();
        Self::from_nodes(dim, nodes)
    }

    /// Build from per-axis start coordinates and stretched segments.
    pub fn from_segments(
        dim: Dim,
        axes: &[(f64, Vec<StretchedSegment>)],
    ) -> Result<Self, ConfigError> {
        let mut nodes = Vec::with_capacity(axes.len());
        for (a, (start, segments)) in axes.iter().enumerate() {
            let axis = Axis::from_index(a).unwrap_or(Axis::Z);
            let mut coords = vec![*start];
            let mut origin = *start;
            for seg in segments {
                let length = seg.end - origin;
                if seg.cells == 0 || length <= 0.0 || seg.stretch_ratio <= 0.0 {
                    return Err(ConfigError::invalid(
                        format!("mesh axis {axis}"),
                        format!(
                            "segment ending at {} needs cells > 0, positive length and ratio",
                            seg.end
                        ),
                    ));
                }
                let r = seg.stretch_ratio;
                let first = if (r - 1.0).abs() < 1e-12 {
                    length / seg.cells as f64
                } else {
                    length * (r - 1.0) / (r.powi(seg.cells as i32) - 1.0)
                };
                let mut h = first;
                let mut x = origin;
                for i in 0..seg.cells {
                    x = if i + 1 == seg.cells { seg.end } else { x + h };
                    coords.push(x);
                    h *= r;
                }
                origin = seg.end;
            }
            nodes.push(coords);
        }
        Self::from_nodes(dim, nodes)
    }

    /// Spatial dimension.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// Number of cells along `axis` (1 for z on a 2D mesh).
    pub fn cells(&self, axis: Axis) -> usize {
        self.widths[axis.index()].len()
    }

    /// Cell counts along x, y, z.
    pub fn cell_counts(&self) -> [usize; 3] {
        [
            self.cells(Axis::X),
            self.cells(Axis::Y),
            self.cells(Axis::Z),
        ]
    }

    /// Total number of cells (pressure unknowns).
    pub fn num_cells(&self) -> usize {
        self.cell_counts().iter().product()
    }

    /// Node coordinates along `axis`.
    pub fn nodes(&self, axis: Axis) -> &[f64] {
        &self.nodes[axis.index()]
    }

    /// Cell widths along `axis`.
    pub fn widths(&self, axis: Axis) -> &[f64] {
        &self.widths[axis.index()]
    }

    /// Width of cell `i` along `axis`.
    pub fn width(&self, axis: Axis, i: usize) -> f64 {
        self.widths[axis.index()][i]
    }

    /// Centre coordinate of cell `i` along `axis`.
    pub fn center(&self, axis: Axis, i: usize) -> f64 {
        let n = &self.nodes[axis.index()];
        0.5 * (n[i] + n[i + 1])
    }

    /// Domain extent along `axis`.
    pub fn length(&self, axis: Axis) -> f64 {
        let n = &self.nodes[axis.index()];
        n[n.len() - 1] - n[0]
    }

    /// Lowest coordinate along `axis`.
    pub fn start(&self, axis: Axis) -> f64 {
        self.nodes[axis.index()][0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_2d_has_unit_depth() {
        let m = CartesianMesh::uniform(Dim::Two, &[4, 2], &[1.0, 0.5]).unwrap();
        assert_eq!(m.cell_counts(), [4, 2, 1]);
        assert_eq!(m.num_cells(), 8);
        assert_relative_eq!(m.width(Axis::X, 3), 0.25, epsilon = 1e-15);
        assert_relative_eq!(m.width(Axis::Z, 0), 1.0);
        assert_relative_eq!(m.center(Axis::Y, 1), 0.375, epsilon = 1e-15);
    }

    #[test]
    fn stretched_segment_sums_to_length() {
        let seg = StretchedSegment {
            end: 2.0,
            cells: 5,
            stretch_ratio: 1.2,
        };
        let uni = StretchedSegment {
            end: 1.0,
            cells: 4,
            stretch_ratio: 1.0,
        };
        let m = CartesianMesh::from_segments(
            Dim::Two,
            &[(0.0, vec![uni]), (-1.0, vec![uni, seg])],
        )
        .unwrap();
        assert_eq!(m.cells(Axis::Y), 9);
        assert_relative_eq!(m.length(Axis::Y), 3.0, epsilon = 1e-12);
        let w = m.widths(Axis::Y);
        assert_relative_eq!(w[6] / w[5], 1.2, epsilon = 1e-9);
        assert_relative_eq!(w[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn rejects_decreasing_nodes() {
        let err = CartesianMesh::from_nodes(
            Dim::Two,
            vec![vec![0.0, 1.0, 0.5], vec![0.0, 1.0, 2.0]],
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_single_cell_axis() {
        assert!(CartesianMesh::uniform(Dim::Two, &[1, 4], &[1.0, 1.0]).is_err());
    }
}
