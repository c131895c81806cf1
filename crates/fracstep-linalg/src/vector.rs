//! Dense vector kernels used by the iterative solvers.

use rayon::prelude::*;

/// Length above which the parallel variants split work across threads.
const PARALLEL_LEN: usize = 8192;

/// Dot product.
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() >= PARALLEL_LEN {
        x.par_iter().zip(y.par_iter()).map(|(a, b)| a * b).sum()
    } else {
        x.iter().zip(y).map(|(a, b)| a * b).sum()
    }
}

/// Euclidean norm.
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

/// `y += alpha x`.
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    if y.len() >= PARALLEL_LEN {
        y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, xi)| *yi += alpha * xi);
    } else {
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += alpha * xi;
        }
    }
}

/// `y = x + beta y`.
pub fn xpby(x: &[f64], beta: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi = xi + beta * *yi;
    }
}

/// `z = d ⊙ r` (pointwise product).
pub fn pointwise(d: &[f64], r: &[f64], z: &mut [f64]) {
    debug_assert_eq!(d.len(), r.len());
    for ((zi, di), ri) in z.iter_mut().zip(d).zip(r) {
        *zi = di * ri;
    }
}

/// `r = b - A x` into `r`.
pub fn residual(a: &crate::CsrMatrix, x: &[f64], b: &[f64], r: &mut [f64]) {
    a.mul_vec(x, r);
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = bi - *ri;
    }
}

/// Largest absolute entry.
pub fn max_abs(x: &[f64]) -> f64 {
    x.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kernels() {
        let x = [1.0, 2.0, 3.0];
        let mut y = [1.0, 1.0, 1.0];
        assert_relative_eq!(dot(&x, &y), 6.0);
        axpy(2.0, &x, &mut y);
        assert_eq!(y, [3.0, 5.0, 7.0]);
        xpby(&x, 0.5, &mut y);
        assert_eq!(y, [2.5, 4.5, 6.5]);
        let mut z = [0.0; 3];
        pointwise(&x, &x, &mut z);
        assert_eq!(z, [1.0, 4.0, 9.0]);
        assert_relative_eq!(norm2(&[3.0, 4.0]), 5.0);
        assert_relative_eq!(max_abs(&[-7.0, 2.0]), 7.0);
    }

    #[test]
    fn parallel_dot_matches_serial() {
        let n = PARALLEL_LEN + 17;
        let x: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
        let serial: f64 = x.iter().map(|v| v * v).sum();
        assert_relative_eq!(dot(&x, &x), serial, max_relative = 1e-12);
    }
}
