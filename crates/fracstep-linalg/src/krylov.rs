//! Preconditioned conjugate gradients.

use std::sync::Arc;

use tracing::{debug, info};

use crate::csr::CsrMatrix;
use crate::error::SolverError;
use crate::nullspace::NullSpace;
use crate::options::SolverOptions;
use crate::solver::{check_lengths, ConvergedReason, LinearSolver, SolveReport};
use crate::vector::{axpy, dot, norm2, pointwise, residual, xpby};

/// Option keys understood by [`KrylovSolver`].
pub const KRYLOV_OPTION_KEYS: &[&str] = &[
    "ksp_type",
    "pc_type",
    "ksp_rtol",
    "ksp_atol",
    "ksp_divtol",
    "ksp_max_it",
    "ksp_initial_guess_nonzero",
];

/// Preconditioner applied inside conjugate gradients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreconditionerKind {
    /// Inverse of the operator diagonal.
    Jacobi,
    /// Identity.
    None,
}

/// Stopping criteria and preconditioner choice.
#[derive(Clone, Debug, PartialEq)]
pub struct KrylovSettings {
    /// Relative tolerance on `‖r‖ / ‖b‖`. Default: `1e-5`.
    pub rtol: f64,
    /// Absolute tolerance on `‖r‖`. Default: `1e-50`.
    pub atol: f64,
    /// Divergence tolerance relative to the initial residual. Default: `1e5`.
    pub dtol: f64,
    /// Iteration cap. Default: 10000.
    pub max_it: usize,
    /// Preconditioner. Default: Jacobi.
    pub preconditioner: PreconditionerKind,
    /// Start from the incoming `x` instead of zero. Default: `true`.
    pub nonzero_initial_guess: bool,
}

impl Default for KrylovSettings {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-50,
            dtol: 1e5,
            max_it: 10_000,
            preconditioner: PreconditionerKind::Jacobi,
            nonzero_initial_guess: true,
        }
    }
}

impl KrylovSettings {
    /// Defaults overridden by `options`.
    pub fn from_options(options: &SolverOptions) -> Result<Self, SolverError> {
        options.warn_unknown(KRYLOV_OPTION_KEYS);
        let mut s = Self::default();
        if let Some(t) = options.get_str("ksp_type") {
            if !t.eq_ignore_ascii_case("cg") {
                return Err(SolverError::InvalidOption {
                    source: options.source().to_string(),
                    key: "ksp_type".into(),
                    value: t.into(),
                    reason: "only 'cg' is available".into(),
                });
            }
        }
        if let Some(pc) = options.get_str("pc_type") {
            s.preconditioner = match pc.to_ascii_lowercase().as_str() {
                "jacobi" => PreconditionerKind::Jacobi,
                "none" => PreconditionerKind::None,
                _ => {
                    return Err(SolverError::InvalidOption {
                        source: options.source().to_string(),
                        key: "pc_type".into(),
                        value: pc.into(),
                        reason: "expected 'jacobi' or 'none'".into(),
                    })
                }
            };
        }
        if let Some(v) = options.get_f64("ksp_rtol")? {
            s.rtol = v;
        }
        if let Some(v) = options.get_f64("ksp_atol")? {
            s.atol = v;
        }
        if let Some(v) = options.get_f64("ksp_divtol")? {
            s.dtol = v;
        }
        if let Some(v) = options.get_usize("ksp_max_it")? {
            s.max_it = v;
        }
        if let Some(v) = options.get_bool("ksp_initial_guess_nonzero")? {
            s.nonzero_initial_guess = v;
        }
        Ok(s)
    }
}

/// Scratch vectors of one conjugate-gradient solve, reused across solves.
#[derive(Debug, Default)]
pub(crate) struct CgWorkspace {
    pub(crate) b: Vec<f64>,
    pub(crate) r: Vec<f64>,
    pub(crate) z: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl CgWorkspace {
    pub(crate) fn resize(&mut self, n: usize) {
        for v in [&mut self.b, &mut self.r, &mut self.z, &mut self.p, &mut self.ap] {
            v.clear();
            v.resize(n, 0.0);
        }
    }
}

/// Stopping criteria of [`conjugate_gradients`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct CgControl {
    pub(crate) rtol: f64,
    pub(crate) atol: f64,
    pub(crate) dtol: f64,
    pub(crate) max_it: usize,
}

/// Preconditioned CG on `A x = work.b`, starting from `x`.
///
/// `precondition(r, z)` must apply a symmetric positive-definite operator.
/// With a null space, every preconditioned residual is projected.
/// Returns iterations, final residual norm and reason.
pub(crate) fn conjugate_gradients(
    a: &CsrMatrix,
    x: &mut [f64],
    work: &mut CgWorkspace,
    ctl: CgControl,
    null_space: Option<&NullSpace>,
    mut precondition: impl FnMut(&[f64], &mut [f64]),
) -> (usize, f64, ConvergedReason) {
    let CgWorkspace { b, r, z, p, ap } = work;
    residual(a, x, b, r);
    let bnorm = norm2(b);
    let mut rnorm = norm2(r);
    let rnorm0 = rnorm;
    let converged = |rn: f64| {
        if rn <= ctl.atol {
            Some(ConvergedReason::ConvergedAtol)
        } else if rn <= ctl.rtol * bnorm {
            Some(ConvergedReason::ConvergedRtol)
        } else {
            None
        }
    };
    if !rnorm.is_finite() {
        return (0, rnorm, ConvergedReason::DivergedNanOrInf);
    }
    if let Some(reason) = converged(rnorm) {
        return (0, rnorm, reason);
    }

    let mut apply = |r: &[f64], z: &mut [f64]| {
        precondition(r, z);
        if let Some(ns) = null_space {
            ns.remove(z);
        }
    };
    apply(r.as_slice(), z.as_mut_slice());
    let mut rz = dot(r, z);
    if rz < 0.0 {
        return (0, rnorm, ConvergedReason::DivergedIndefinitePc);
    }
    p.copy_from_slice(z);

    for it in 1..=ctl.max_it {
        a.mul_vec(p, ap);
        let pap = dot(p, ap);
        if pap < 0.0 {
            return (it - 1, rnorm, ConvergedReason::DivergedIndefiniteMat);
        }
        if pap == 0.0 {
            return (it - 1, rnorm, ConvergedReason::DivergedBreakdown);
        }
        let alpha = rz / pap;
        axpy(alpha, p, x);
        axpy(-alpha, ap, r);

        rnorm = norm2(r);
        if !rnorm.is_finite() {
            return (it, rnorm, ConvergedReason::DivergedNanOrInf);
        }
        if let Some(reason) = converged(rnorm) {
            return (it, rnorm, reason);
        }
        if rnorm > ctl.dtol * rnorm0 {
            return (it, rnorm, ConvergedReason::DivergedDtol);
        }

        apply(r.as_slice(), z.as_mut_slice());
        let rz_new = dot(r, z);
        if rz_new < 0.0 {
            return (it, rnorm, ConvergedReason::DivergedIndefinitePc);
        }
        if rz_new == 0.0 {
            return (it, rnorm, ConvergedReason::DivergedBreakdown);
        }
        xpby(z, rz_new / rz, p);
        rz = rz_new;
    }
    (ctl.max_it, rnorm, ConvergedReason::DivergedIts)
}

/// Conjugate gradients with an optional Jacobi preconditioner.
#[derive(Debug)]
pub struct KrylovSolver {
    name: String,
    settings: KrylovSettings,
    matrix: Option<Arc<CsrMatrix>>,
    inv_diag: Vec<f64>,
    null_space: Option<NullSpace>,
    work: CgWorkspace,
    iterations: usize,
}

impl KrylovSolver {
    /// Unconfigured solver named after the system it solves.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: KrylovSettings::default(),
            matrix: None,
            inv_diag: Vec::new(),
            null_space: None,
            work: CgWorkspace::default(),
            iterations: 0,
        }
    }

    /// Active settings.
    pub fn settings(&self) -> &KrylovSettings {
        &self.settings
    }
}

impl LinearSolver for KrylovSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(
        &mut self,
        matrix: Arc<CsrMatrix>,
        options: &SolverOptions,
    ) -> Result<(), SolverError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(SolverError::DimensionMismatch {
                expected: matrix.nrows(),
                found: matrix.ncols(),
            });
        }
        self.settings = KrylovSettings::from_options(options)?;
        self.inv_diag = matrix
            .diagonal()
            .into_iter()
            .map(|d| if d == 0.0 { 1.0 } else { 1.0 / d })
            .collect();
        self.work.resize(matrix.nrows());
        info!(
            solver = %self.name,
            rows = matrix.nrows(),
            nnz = matrix.nnz(),
            pc = ?self.settings.preconditioner,
            rtol = self.settings.rtol,
            atol = self.settings.atol,
            max_it = self.settings.max_it,
            "configured conjugate-gradient solver"
        );
        self.matrix = Some(matrix);
        Ok(())
    }

    fn attach_null_space(&mut self, null_space: NullSpace) {
        self.null_space = Some(null_space);
    }

    fn solve(&mut self, rhs: &[f64], x: &mut [f64]) -> Result<SolveReport, SolverError> {
        let a = self
            .matrix
            .clone()
            .ok_or_else(|| SolverError::NotConfigured {
                solver: self.name.clone(),
            })?;
        check_lengths(a.nrows(), rhs, x)?;
        if let Some(ns) = &self.null_space {
            if ns.len() != a.nrows() {
                return Err(SolverError::DimensionMismatch {
                    expected: a.nrows(),
                    found: ns.len(),
                });
            }
        }
        if !self.settings.nonzero_initial_guess {
            x.fill(0.0);
        }
        self.work.b.copy_from_slice(rhs);
        if let Some(ns) = &self.null_space {
            ns.remove(&mut self.work.b);
            ns.remove(x);
        }

        let ctl = CgControl {
            rtol: self.settings.rtol,
            atol: self.settings.atol,
            dtol: self.settings.dtol,
            max_it: self.settings.max_it,
        };
        let inv_diag = &self.inv_diag;
        let (iterations, residual_norm, reason) = match self.settings.preconditioner {
            PreconditionerKind::Jacobi => conjugate_gradients(
                &a,
                x,
                &mut self.work,
                ctl,
                self.null_space.as_ref(),
                |r, z| pointwise(inv_diag, r, z),
            ),
            PreconditionerKind::None => conjugate_gradients(
                &a,
                x,
                &mut self.work,
                ctl,
                self.null_space.as_ref(),
                |r, z| z.copy_from_slice(r),
            ),
        };

        if let Some(ns) = &self.null_space {
            ns.remove(x);
        }
        self.iterations = iterations;
        debug!(solver = %self.name, iterations, residual_norm, %reason, "cg solve");
        Ok(SolveReport {
            iterations,
            residual_norm,
            reason,
        })
    }

    fn iteration_count(&self) -> usize {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::CsrBuilder;
    use approx::assert_abs_diff_eq;

    fn laplacian_1d(n: usize, periodic: bool) -> CsrMatrix {
        let mut b = CsrBuilder::new(n, n);
        for i in 0..n {
            let mut e = vec![(i, 2.0)];
            if i > 0 {
                e.push((i - 1, -1.0));
            } else if periodic {
                e.push((n - 1, -1.0));
            }
            if i + 1 < n {
                e.push((i + 1, -1.0));
            } else if periodic {
                e.push((0, -1.0));
            }
            if !periodic && (i == 0 || i + 1 == n) {
                e[0].1 = 3.0;
            }
            b.push_row(i, &mut e).unwrap();
        }
        b.finish().unwrap()
    }

    #[test]
    fn solves_spd_system() {
        let a = Arc::new(laplacian_1d(20, false));
        let rhs: Vec<f64> = (0..20).map(|i| (i as f64 * 0.3).sin()).collect();
        let mut s = KrylovSolver::new("test");
        let mut opts = SolverOptions::empty("test");
        opts.set("ksp_rtol", "1e-12");
        s.configure(a.clone(), &opts).unwrap();
        let mut x = vec![0.0; 20];
        let report = s.solve(&rhs, &mut x).unwrap();
        assert_eq!(report.reason, ConvergedReason::ConvergedRtol);
        assert!(report.iterations <= 20);
        assert_eq!(s.iteration_count(), report.iterations);
        let mut ax = vec![0.0; 20];
        a.mul_vec(&x, &mut ax);
        for (l, r) in ax.iter().zip(&rhs) {
            assert_abs_diff_eq!(l, r, epsilon = 1e-9);
        }
    }

    #[test]
    fn exact_guess_takes_zero_iterations() {
        let a = Arc::new(laplacian_1d(5, false));
        let x_true = vec![1.0, -2.0, 0.5, 3.0, 1.0];
        let mut rhs = vec![0.0; 5];
        a.mul_vec(&x_true, &mut rhs);
        let mut s = KrylovSolver::new("guess");
        s.configure(a, &SolverOptions::empty("t")).unwrap();
        let mut x = x_true.clone();
        let report = s.solve(&rhs, &mut x).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(!report.reason.is_diverged());
    }

    #[test]
    fn singular_system_needs_null_space() {
        let n = 16;
        let a = Arc::new(laplacian_1d(n, true));
        // Inconsistent: nonzero mean.
        let rhs: Vec<f64> = (0..n).map(|i| 1.0 + (i as f64).cos()).collect();
        let mut opts = SolverOptions::empty("t");
        opts.set("ksp_max_it", "200").set("ksp_rtol", "1e-10");

        let mut bare = KrylovSolver::new("bare");
        bare.configure(a.clone(), &opts).unwrap();
        let mut x = vec![0.0; n];
        assert!(bare.solve(&rhs, &mut x).unwrap().reason.is_diverged());
        assert!(bare.divergence_is_fatal());

        let mut guarded = KrylovSolver::new("guarded");
        guarded.configure(a, &opts).unwrap();
        guarded.attach_null_space(NullSpace::constant_on(n, 0..n).unwrap());
        let mut x = vec![0.0; n];
        let report = guarded.solve(&rhs, &mut x).unwrap();
        assert!(!report.reason.is_diverged());
        assert_abs_diff_eq!(x.iter().sum::<f64>(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn misuse_is_an_error() {
        let mut s = KrylovSolver::new("x");
        let mut x = vec![0.0; 2];
        assert!(matches!(
            s.solve(&[0.0; 2], &mut x),
            Err(SolverError::NotConfigured { .. })
        ));
        s.configure(Arc::new(CsrMatrix::identity(2)), &SolverOptions::empty("t"))
            .unwrap();
        assert!(matches!(
            s.solve(&[0.0; 3], &mut x),
            Err(SolverError::DimensionMismatch { .. })
        ));
        let mut bad = SolverOptions::empty("t");
        bad.set("ksp_type", "gmres");
        assert!(s.configure(Arc::new(CsrMatrix::identity(2)), &bad).is_err());
    }
}
