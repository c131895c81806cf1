//! Aggregation algebraic multigrid.
//!
//! The hierarchy is built once in `configure`:
//!
//! 1. greedy aggregation of strongly connected unknowns,
//! 2. piecewise-constant prolongation `P` (one column per aggregate),
//! 3. restriction `R = Pᵀ` and Galerkin coarse operator `R A P`.
//!
//! A V-cycle uses damped Jacobi smoothing and a fixed number of Jacobi
//! sweeps on the coarsest level. Matrix-vector products and smoothing
//! sweeps run on the rayon pool.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::csr::{CsrBuilder, CsrMatrix};
use crate::error::{AssemblyError, SolverError};
use crate::krylov::{conjugate_gradients, CgControl, CgWorkspace};
use crate::nullspace::NullSpace;
use crate::options::SolverOptions;
use crate::solver::{check_lengths, ConvergedReason, LinearSolver, SolveReport};
use crate::vector::{axpy, norm2, residual};

/// Option keys understood by [`MultigridSolver`].
pub const MULTIGRID_OPTION_KEYS: &[&str] = &[
    "config_version",
    "solver",
    "max_iters",
    "tolerance",
    "presweeps",
    "postsweeps",
    "max_levels",
    "min_coarse_rows",
    "relaxation_factor",
    "coarse_sweeps",
    "strength_threshold",
    "monitor_residual",
];

/// How the V-cycle is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultigridMode {
    /// As the preconditioner of conjugate gradients.
    Pcg,
    /// As a stationary iteration.
    Amg,
}

/// Hierarchy and cycle parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MultigridSettings {
    /// Outer solver. Default: PCG.
    pub mode: MultigridMode,
    /// Outer iteration cap. Default: 100.
    pub max_iters: usize,
    /// Relative residual tolerance. Default: `1e-10`.
    pub tolerance: f64,
    /// Smoothing sweeps before restriction. Default: 2.
    pub presweeps: usize,
    /// Smoothing sweeps after prolongation. Default: 2.
    pub postsweeps: usize,
    /// Maximum number of levels including the finest. Default: 10.
    pub max_levels: usize,
    /// Stop coarsening at or below this many rows. Default: 32.
    pub min_coarse_rows: usize,
    /// Jacobi damping factor. Default: 0.8.
    pub relaxation_factor: f64,
    /// Jacobi sweeps on the coarsest level. Default: 40.
    pub coarse_sweeps: usize,
    /// Strength-of-connection threshold. Default: 0.25.
    pub strength_threshold: f64,
    /// Check the residual after each iteration. Default: `true`.
    ///
    /// When off, exactly `max_iters` iterations run.
    pub monitor_residual: bool,
}

impl Default for MultigridSettings {
    fn default() -> Self {
        Self {
            mode: MultigridMode::Pcg,
            max_iters: 100,
            tolerance: 1e-10,
            presweeps: 2,
            postsweeps: 2,
            max_levels: 10,
            min_coarse_rows: 32,
            relaxation_factor: 0.8,
            coarse_sweeps: 40,
            strength_threshold: 0.25,
            monitor_residual: true,
        }
    }
}

impl MultigridSettings {
    /// Defaults overridden by `options`.
    pub fn from_options(options: &SolverOptions) -> Result<Self, SolverError> {
        options.warn_unknown(MULTIGRID_OPTION_KEYS);
        let invalid = |key: &str, value: &str, reason: &str| SolverError::InvalidOption {
            source: options.source().to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let mut s = Self::default();
        if let Some(m) = options.get_str("solver") {
            s.mode = match m.to_ascii_uppercase().as_str() {
                "PCG" => MultigridMode::Pcg,
                "AMG" => MultigridMode::Amg,
                _ => return Err(invalid("solver", m, "expected 'PCG' or 'AMG'")),
            };
        }
        macro_rules! take {
            ($field:ident, $getter:ident) => {
                if let Some(v) = options.$getter(stringify!($field))? {
                    s.$field = v;
                }
            };
        }
        take!(max_iters, get_usize);
        take!(tolerance, get_f64);
        take!(presweeps, get_usize);
        take!(postsweeps, get_usize);
        take!(max_levels, get_usize);
        take!(min_coarse_rows, get_usize);
        take!(relaxation_factor, get_f64);
        take!(coarse_sweeps, get_usize);
        take!(strength_threshold, get_f64);
        take!(monitor_residual, get_bool);
        if s.max_levels == 0 {
            return Err(invalid("max_levels", "0", "at least one level is required"));
        }
        if !(s.relaxation_factor > 0.0 && s.relaxation_factor < 2.0) {
            let v = s.relaxation_factor.to_string();
            return Err(invalid("relaxation_factor", &v, "must lie in (0, 2)"));
        }
        Ok(s)
    }
}

// ── hierarchy construction ────────────────────────────────────────

/// Greedy aggregation over strong connections.
///
/// `j` is strongly connected to `i` when
/// `|a_ij| >= theta * sqrt(|a_ii a_jj|)`. Each unaggregated row seeds a
/// new aggregate together with its unaggregated strong neighbours.
/// Returns the aggregate of every row and the number of aggregates.
pub fn aggregate(a: &CsrMatrix, theta: f64) -> (Vec<usize>, usize) {
    let n = a.nrows();
    let diag = a.diagonal();
    let mut agg = vec![usize::MAX; n];
    let mut count = 0;
    for i in 0..n {
        if agg[i] != usize::MAX {
            continue;
        }
        agg[i] = count;
        let (cols, vals) = a.row(i);
        for (&j, &v) in cols.iter().zip(vals) {
            if j != i
                && agg[j] == usize::MAX
                && v.abs() >= theta * (diag[i] * diag[j]).abs().sqrt()
            {
                agg[j] = count;
            }
        }
        count += 1;
    }
    (agg, count)
}

/// Piecewise-constant prolongation from an aggregate map.
pub fn prolongation(agg: &[usize], num_aggregates: usize) -> Result<CsrMatrix, AssemblyError> {
    let mut b = CsrBuilder::new(agg.len(), num_aggregates);
    for (i, &g) in agg.iter().enumerate() {
        b.push_row(i, &mut [(g, 1.0)])?;
    }
    b.finish()
}

#[derive(Debug)]
struct Transfer {
    p: CsrMatrix,
    r: CsrMatrix,
}

#[derive(Debug)]
struct Level {
    a: Arc<CsrMatrix>,
    inv_diag: Vec<f64>,
    transfer: Option<Transfer>,
    x: Vec<f64>,
    b: Vec<f64>,
    tmp: Vec<f64>,
}

impl Level {
    fn new(a: Arc<CsrMatrix>) -> Self {
        let n = a.nrows();
        let inv_diag = a
            .diagonal()
            .into_iter()
            .map(|d| if d == 0.0 { 1.0 } else { 1.0 / d })
            .collect();
        Self {
            a,
            inv_diag,
            transfer: None,
            x: vec![0.0; n],
            b: vec![0.0; n],
            tmp: vec![0.0; n],
        }
    }

    /// `sweeps` damped Jacobi sweeps on `A x = b`.
    fn smooth(&mut self, sweeps: usize, omega: f64) {
        for _ in 0..sweeps {
            self.a.mul_vec(&self.x, &mut self.tmp);
            self.x
                .par_iter_mut()
                .zip(self.b.par_iter())
                .zip(self.tmp.par_iter())
                .zip(self.inv_diag.par_iter())
                .with_min_len(1024)
                .for_each(|(((xi, bi), ai), di)| *xi += omega * di * (bi - ai));
        }
    }
}

fn build_hierarchy(a: Arc<CsrMatrix>, s: &MultigridSettings) -> Result<Vec<Level>, AssemblyError> {
    let mut levels = vec![Level::new(a)];
    while levels.len() < s.max_levels {
        let Some(fine) = levels.last_mut() else {
            break;
        };
        let n = fine.a.nrows();
        if n <= s.min_coarse_rows {
            break;
        }
        let (agg, nc) = aggregate(&fine.a, s.strength_threshold);
        if nc == 0 || nc == n {
            break;
        }
        let p = prolongation(&agg, nc)?;
        let r = p.transpose();
        let ap = fine.a.matmul(&p, None)?;
        let coarse = r.matmul(&ap, None)?;
        fine.transfer = Some(Transfer { p, r });
        levels.push(Level::new(Arc::new(coarse)));
    }
    Ok(levels)
}

/// One V-cycle on `levels[0]` with a zero initial guess.
fn v_cycle(levels: &mut [Level], s: &MultigridSettings) {
    let Some((fine, rest)) = levels.split_first_mut() else {
        return;
    };
    fine.x.fill(0.0);
    if fine.transfer.is_none() || rest.is_empty() {
        fine.smooth(s.coarse_sweeps, s.relaxation_factor);
        return;
    }
    fine.smooth(s.presweeps, s.relaxation_factor);
    residual(&fine.a, &fine.x, &fine.b, &mut fine.tmp);
    if let (Some(t), Some(coarse)) = (&fine.transfer, rest.first_mut()) {
        t.r.mul_vec(&fine.tmp, &mut coarse.b);
    }
    v_cycle(rest, s);
    if let (Some(t), Some(coarse)) = (&fine.transfer, rest.first()) {
        t.p.mul_vec_add(1.0, &coarse.x, &mut fine.x);
    }
    fine.smooth(s.postsweeps, s.relaxation_factor);
}

/// Apply one V-cycle as an operator: `z = V(r)`.
fn precondition(levels: &mut [Level], s: &MultigridSettings, r: &[f64], z: &mut [f64]) {
    if let Some(top) = levels.first_mut() {
        top.b.copy_from_slice(r);
    }
    v_cycle(levels, s);
    if let Some(top) = levels.first() {
        z.copy_from_slice(&top.x);
    }
}

/// Stationary iteration `x += V(b - A x)` on `A x = work.b`.
fn stationary(
    a: &CsrMatrix,
    x: &mut [f64],
    levels: &mut [Level],
    s: &MultigridSettings,
    work: &mut CgWorkspace,
    null_space: Option<&NullSpace>,
) -> (usize, f64, ConvergedReason) {
    let CgWorkspace { b, r, z, .. } = work;
    residual(a, x, b, r);
    let tol = s.tolerance * norm2(b);
    let mut rnorm = norm2(r);
    if s.monitor_residual && rnorm <= tol {
        return (0, rnorm, ConvergedReason::ConvergedRtol);
    }
    for it in 1..=s.max_iters {
        precondition(levels, s, r, z);
        axpy(1.0, z, x);
        if let Some(ns) = null_space {
            ns.remove(x);
        }
        residual(a, x, b, r);
        rnorm = norm2(r);
        if !rnorm.is_finite() {
            return (it, rnorm, ConvergedReason::DivergedNanOrInf);
        }
        if s.monitor_residual && rnorm <= tol {
            return (it, rnorm, ConvergedReason::ConvergedRtol);
        }
    }
    (s.max_iters, rnorm, ConvergedReason::ConvergedIts)
}

// ── solver ────────────────────────────────────────────────────────

/// Algebraic multigrid used stand-alone or as a CG preconditioner.
#[derive(Debug)]
pub struct MultigridSolver {
    name: String,
    settings: MultigridSettings,
    levels: Vec<Level>,
    null_space: Option<NullSpace>,
    work: CgWorkspace,
    iterations: usize,
}

impl MultigridSolver {
    /// Unconfigured solver named after the system it solves.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: MultigridSettings::default(),
            levels: Vec::new(),
            null_space: None,
            work: CgWorkspace::default(),
            iterations: 0,
        }
    }

    /// Active settings.
    pub fn settings(&self) -> &MultigridSettings {
        &self.settings
    }

    /// Number of levels in the hierarchy (0 before `configure`).
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Rows of each level, finest first.
    pub fn level_sizes(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.a.nrows()).collect()
    }
}

impl LinearSolver for MultigridSolver {
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
        self.settings = MultigridSettings::from_options(options)?;
        self.work.resize(matrix.nrows());
        self.levels = build_hierarchy(matrix, &self.settings)?;
        info!(
            solver = %self.name,
            mode = ?self.settings.mode,
            levels = ?self.level_sizes(),
            max_iters = self.settings.max_iters,
            tolerance = self.settings.tolerance,
            "configured multigrid solver"
        );
        Ok(())
    }

    fn attach_null_space(&mut self, null_space: NullSpace) {
        self.null_space = Some(null_space);
    }

    fn solve(&mut self, rhs: &[f64], x: &mut [f64]) -> Result<SolveReport, SolverError> {
        let a = match self.levels.first() {
            Some(top) => top.a.clone(),
            None => {
                return Err(SolverError::NotConfigured {
                    solver: self.name.clone(),
                })
            }
        };
        check_lengths(a.nrows(), rhs, x)?;
        self.work.b.copy_from_slice(rhs);
        if let Some(ns) = &self.null_space {
            if ns.len() != a.nrows() {
                return Err(SolverError::DimensionMismatch {
                    expected: a.nrows(),
                    found: ns.len(),
                });
            }
            ns.remove(&mut self.work.b);
            ns.remove(x);
        }

        let (iterations, residual_norm, reason) = match self.settings.mode {
            MultigridMode::Pcg => {
                let s = &self.settings;
                let ctl = CgControl {
                    rtol: if s.monitor_residual { s.tolerance } else { 0.0 },
                    atol: 0.0,
                    dtol: f64::INFINITY,
                    max_it: s.max_iters,
                };
                let levels = &mut self.levels;
                let (it, rn, reason) = conjugate_gradients(
                    &a,
                    x,
                    &mut self.work,
                    ctl,
                    self.null_space.as_ref(),
                    |r, z| precondition(levels, s, r, z),
                );
                let reason = match reason {
                    ConvergedReason::DivergedIts => ConvergedReason::ConvergedIts,
                    other => other,
                };
                (it, rn, reason)
            }
            MultigridMode::Amg => stationary(
                &a,
                x,
                &mut self.levels,
                &self.settings,
                &mut self.work,
                self.null_space.as_ref(),
            ),
        };

        if let Some(ns) = &self.null_space {
            ns.remove(x);
        }
        self.iterations = iterations;
        debug!(solver = %self.name, iterations, residual_norm, %reason, "multigrid solve");
        Ok(SolveReport {
            iterations,
            residual_norm,
            reason,
        })
    }

    fn iteration_count(&self) -> usize {
        self.iterations
    }

    fn divergence_is_fatal(&self) -> bool {
        false
    }
}
