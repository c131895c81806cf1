//! One-dimensional null spaces of singular operators.

use std::ops::Range;

use crate::vector::{axpy, dot, norm2};

/// A unit vector spanning the null space of an operator.
///
/// Attached to a solver, it is removed from the right-hand side, from every
/// preconditioned residual and from the final solution, so iterates stay
/// in the operator's range and the answer is shift-invariant.
#[derive(Clone, Debug, PartialEq)]
pub struct NullSpace {
    basis: Vec<f64>,
}

impl NullSpace {
    /// Constant vector over `entries` of a vector of length `len`, zero
    /// elsewhere.
    ///
    /// Returns `None` if `entries` is empty or exceeds `len`.
    pub fn constant_on(len: usize, entries: Range<usize>) -> Option<Self> {
        if entries.is_empty() || entries.end > len {
            return None;
        }
        let value = 1.0 / (entries.len() as f64).sqrt();
        let mut basis = vec![0.0; len];
        basis[entries].fill(value);
        Some(Self { basis })
    }

    /// Normalized copy of an arbitrary nonzero vector.
    pub fn from_vector(mut v: Vec<f64>) -> Option<Self> {
        let n = norm2(&v);
        if n == 0.0 || !n.is_finite() {
            return None;
        }
        v.iter_mut().for_each(|x| *x /= n);
        Some(Self { basis: v })
    }

    /// Length of the vectors this null space applies to.
    pub fn len(&self) -> usize {
        self.basis.len()
    }

    /// Whether the basis is empty.
    pub fn is_empty(&self) -> bool {
        self.basis.is_empty()
    }

    /// Unit basis vector.
    pub fn basis(&self) -> &[f64] {
        &self.basis
    }

    /// Coefficient of `v` along the basis.
    pub fn component(&self, v: &[f64]) -> f64 {
        dot(&self.basis, v)
    }

    /// Remove the null-space component of `v` in place.
    pub fn remove(&self, v: &mut [f64]) {
        let c = self.component(v);
        axpy(-c, &self.basis, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn removes_mean_on_subrange() {
        let ns = NullSpace::constant_on(5, 0..3).unwrap();
        let mut v = vec![1.0, 2.0, 6.0, 10.0, 20.0];
        ns.remove(&mut v);
        assert_abs_diff_eq!(v[0] + v[1] + v[2], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v[0], -2.0, epsilon = 1e-12);
        assert_eq!(&v[3..], &[10.0, 20.0]);
    }

    #[test]
    fn rejects_degenerate() {
        assert!(NullSpace::constant_on(3, 2..2).is_none());
        assert!(NullSpace::constant_on(3, 0..4).is_none());
        assert!(NullSpace::from_vector(vec![0.0, 0.0]).is_none());
        let ns = NullSpace::from_vector(vec![3.0, 4.0]).unwrap();
        assert_abs_diff_eq!(ns.basis()[1], 0.8, epsilon = 1e-15);
    }
}
