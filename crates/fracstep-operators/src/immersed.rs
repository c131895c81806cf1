//! Immersed body points and the discrete delta function.

use std::ops::Range;
use std::path::Path;

use fracstep_core::{ConfigError, Dim};

/// Roma et al. three-point discrete delta, as a function of `r = x / h`.
///
/// Nonzero for `|r| < 1.5`, sums to one over unit-spaced samples.
pub fn roma_delta(r: f64) -> f64 {
    let r = r.abs();
    if r <= 0.5 {
        (1.0 + (1.0 - 3.0 * r * r).sqrt()) / 3.0
    } else if r < 1.5 {
        let s = 1.0 - r;
        (5.0 - 3.0 * r - (1.0 - 3.0 * s * s).max(0.0).sqrt()) / 6.0
    } else {
        0.0
    }
}

/// Whether a sample at normalized distance `r` lies in the delta support.
///
/// Counting and assembly share this test so both see the same nonzeros.
pub fn in_support(r: f64) -> bool {
    r.abs() < 1.5
}

/// Indices of the sorted `positions` inside the support around `x`.
pub(crate) fn support_range(positions: &[f64], x: f64, h: f64) -> Range<usize> {
    let lo = positions.partition_point(|&p| p < x && !in_support((p - x) / h));
    let hi = positions.partition_point(|&p| p <= x || in_support((p - x) / h));
    lo..hi.max(lo)
}

/// Lagrangian points of a rigid, stationary immersed body.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    dim: Dim,
    points: Vec<[f64; 3]>,
}

impl Body {
    /// Body from point coordinates; 2D points ignore the third entry.
    pub fn new(dim: Dim, mut points: Vec<[f64; 3]>) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::invalid("body", "at least one point is required"));
        }
        for (k, p) in points.iter_mut().enumerate() {
            if dim == Dim::Two {
                p[2] = 0.5;
            }
            if p.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::invalid(
                    format!("body point {k}"),
                    "coordinates must be finite",
                ));
            }
        }
        Ok(Self { dim, points })
    }

    /// Parse a points file: the point count on the first line, then one
    /// point per line with `dim` whitespace-separated coordinates.
    pub fn parse_points(dim: Dim, text: &str, path: &Path) -> Result<Self, ConfigError> {
        let err = |line: usize, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            line: Some(line),
            message,
        };
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));
        let (n0, head) = lines
            .next()
            .ok_or_else(|| err(1, "missing point count".to_string()))?;
        let count: usize = head
            .parse()
            .map_err(|_| err(n0, format!("expected a point count, found '{head}'")))?;
        let mut points = Vec::with_capacity(count);
        for (n, line) in lines {
            let mut p = [0.0; 3];
            let values: Vec<&str> = line.split_whitespace().collect();
            if values.len() != dim.count() {
                return Err(err(
                    n,
                    format!("expected {} coordinates, found {}", dim.count(), values.len()),
                ));
            }
            for (slot, v) in p.iter_mut().zip(&values) {
                *slot = v
                    .parse()
                    .map_err(|_| err(n, format!("invalid coordinate '{v}'")))?;
            }
            points.push(p);
        }
        if points.len() != count {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                line: None,
                message: format!("header announces {count} points, found {}", points.len()),
            });
        }
        Self::new(dim, points)
    }

    /// Spatial dimension.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the body has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point coordinates.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn delta_partition_of_unity() {
        for shift in [0.0, 0.1, 0.37, 0.5, 0.81] {
            let sum: f64 = (-3..=3).map(|k| roma_delta(k as f64 - shift)).sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
        assert_eq!(roma_delta(1.5), 0.0);
        assert_eq!(roma_delta(-2.0), 0.0);
        assert_abs_diff_eq!(roma_delta(0.0), 2.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn support_range_matches_predicate() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let r = support_range(&xs, 0.93, 0.1);
        let expected: Vec<usize> = (0..20)
            .filter(|&i| in_support((xs[i] - 0.93) / 0.1))
            .collect();
        assert_eq!(r.collect::<Vec<_>>(), expected);
    }

    #[test]
    fn parse_points_file() {
        let text = "3\n0.0 0.5\n0.1 0.5\n\n0.2 0.5\n";
        let b = Body::parse_points(Dim::Two, text, Path::new("circle.txt")).unwrap();
        assert_eq!(b.len(), 3);
        assert_eq!(b.points()[1], [0.1, 0.5, 0.5]);

        let bad = Body::parse_points(Dim::Two, "2\n0 0\n1\n", Path::new("b.txt")).unwrap_err();
        assert!(matches!(bad, ConfigError::Parse { line: Some(3), .. }));
        let short = Body::parse_points(Dim::Two, "3\n0 0\n", Path::new("b.txt")).unwrap_err();
        assert!(matches!(short, ConfigError::Parse { line: None, .. }));
    }
}
