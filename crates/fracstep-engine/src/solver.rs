//! The fractional-step Navier–Stokes solver.
//!
//! [`NavierStokesSolver`] owns every operator, vector and solver handle of
//! a run and advances it one step at a time:
//!
//! ```text
//! Uninitialized → Initializing → Ready
//!   → {RhsVelocity → SolveVelocity → RhsPoisson → SolvePoisson → Projection} → Ready
//!   → Finalizing → Done
//! ```
//!
//! Each step solves `A q* = rhs1` for the intermediate fluxes, then
//! `QT BN Q λ = QT q* - r2` for pressure and body forces, and projects
//! `q = q* - BN Q λ`. Calling a method from the wrong state returns
//! [`StepError::InvalidState`] and leaves the solver untouched.
//!
//! # Ownership model
//!
//! Operators are shared read-only with their solver handles through
//! `Arc<CsrMatrix>`; all vectors are owned by the solver and overwritten
//! in place every step. Everything built by
//! [`initialize()`](NavierStokesSolver::initialize) is released by
//! [`finalize()`](NavierStokesSolver::finalize).

use std::fmt;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use fracstep_core::{PressureForceField, TimeStep, VelocityField};
use fracstep_io::{
    read_checkpoint, write_checkpoint, write_grid, write_matrix_file, ForceLog, History, IoError,
    IterationLog,
};
use fracstep_linalg::vector::max_abs;
use fracstep_linalg::{CsrMatrix, LinearSolver, NullSpace, SolveReport};
use fracstep_operators::{
    add_perturbation, assemble_bnq, assemble_coupling, assemble_implicit_operator,
    assemble_laplacian, assemble_schur_complement, count_implicit_nonzeros, BoundaryGhosts,
    BoundaryTerms, CouplingOperators, DiagonalScalings, DiffusionCoefficients, Discretization,
    ExplicitTerms, Partitions,
};
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use crate::config::SimulationConfig;
use crate::error::StepError;
use crate::factory::{create_solver, SystemKind};
use crate::metrics::StepMetrics;
use crate::timing::{Stage, StageTimer, StageTimings};

/// Directory receiving operator dumps.
pub const OPERATOR_DIR: &str = "outputs";

// ── SolverState ─────────────────────────────────────────────────

/// Lifecycle state of a [`NavierStokesSolver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolverState {
    /// Constructed, nothing built yet.
    Uninitialized,
    /// `initialize()` in progress (or failed).
    Initializing,
    /// Between steps.
    Ready,
    /// Building the velocity right-hand side.
    RhsVelocity,
    /// Solving for the intermediate fluxes.
    SolveVelocity,
    /// Building the pressure/force right-hand side.
    RhsPoisson,
    /// Solving for pressure and forces.
    SolvePoisson,
    /// Correcting the fluxes.
    Projection,
    /// `finalize()` in progress.
    Finalizing,
    /// Finalized; every resource is released.
    Done,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── Run data ────────────────────────────────────────────────────

/// Operators assembled at initialization.
#[derive(Debug)]
pub struct SystemOperators {
    /// `A = M/dt - θ ν L`.
    pub a: Arc<CsrMatrix>,
    /// `QT` and `Q`.
    pub coupling: CouplingOperators,
    /// `BN Q`.
    pub bnq: CsrMatrix,
    /// `QT BN Q`.
    pub qtbnq: Arc<CsrMatrix>,
}

/// Right-hand sides and intermediate vectors of the latest step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepVectors {
    /// Explicit convection and diffusion.
    pub h: Vec<f64>,
    /// Boundary contribution of the diffusion stencil.
    pub bc1: Vec<f64>,
    /// `M/dt qⁿ + H + bc1`.
    pub rhs1: Vec<f64>,
    /// Intermediate fluxes.
    pub q_star: Vec<f64>,
    /// Known boundary fluxes and body velocities.
    pub r2: Vec<f64>,
    /// `QT q* - r2`.
    pub rhs2: Vec<f64>,
    /// `QT qⁿ⁺¹ - r2`; its pressure rows are the continuity residual.
    pub constraint: Vec<f64>,
}

impl StepVectors {
    fn new(num_velocity: usize, num_lambda: usize) -> Self {
        Self {
            h: vec![0.0; num_velocity],
            bc1: vec![0.0; num_velocity],
            rhs1: vec![0.0; num_velocity],
            q_star: vec![0.0; num_velocity],
            r2: vec![0.0; num_lambda],
            rhs2: vec![0.0; num_lambda],
            constraint: vec![0.0; num_lambda],
        }
    }
}

struct RunState {
    disc: Discretization,
    scalings: DiagonalScalings,
    coefficients: DiffusionCoefficients,
    explicit: ExplicitTerms,
    boundary: BoundaryTerms,
    ghosts: BoundaryGhosts,
    next_ghosts: BoundaryGhosts,
    ops: SystemOperators,
    velocity_solver: Box<dyn LinearSolver>,
    poisson_solver: Box<dyn LinearSolver>,
    q: VelocityField,
    lambda: PressureForceField,
    work: StepVectors,
    iteration_log: IterationLog,
    force_log: Option<ForceLog>,
}

fn checked_solve(
    solver: &mut dyn LinearSolver,
    system: SystemKind,
    step: TimeStep,
    rhs: &[f64],
    x: &mut [f64],
) -> Result<SolveReport, StepError> {
    let report = solver.solve(rhs, x)?;
    if report.reason.is_diverged() && !solver.divergence_is_fatal() {
        warn!(
            system = system.name(),
            step = step.0,
            backend = solver.name(),
            reason = %report.reason,
            iterations = report.iterations,
            "solver stopped early, continuing"
        );
        return Ok(report);
    }
    if report.reason.is_diverged() {
        error!(
            system = system.name(),
            step = step.0,
            reason = %report.reason,
            iterations = report.iterations,
            "linear solver diverged"
        );
        return Err(StepError::SolverDivergence {
            system,
            step,
            code: report.reason.code(),
            iterations: report.iterations,
        });
    }
    debug!(
        system = system.name(),
        step = step.0,
        iterations = report.iterations,
        residual = report.residual_norm,
        "solve converged"
    );
    Ok(report)
}

impl RunState {
    /// `H`, ghosts at `n+1`, `bc1` and `rhs1`.
    fn rhs_velocity(&mut self) {
        let q = self.q.as_slice();
        self.explicit
            .calculate(&self.disc, &self.scalings, q, &self.ghosts, &mut self.work.h);
        self.next_ghosts.clone_from(&self.ghosts);
        self.next_ghosts.update(&self.disc, &self.scalings, q);
        self.boundary.bc1(
            &self.coefficients,
            &self.ghosts,
            &self.next_ghosts,
            &mut self.work.bc1,
        );
        let dt = self.scalings.dt;
        for (i, r) in self.work.rhs1.iter_mut().enumerate() {
            *r = self.scalings.m[i] / dt * q[i] + self.work.h[i] + self.work.bc1[i];
        }
    }

    fn solve_velocity(&mut self, step: TimeStep) -> Result<SolveReport, StepError> {
        self.work.q_star.copy_from_slice(self.q.as_slice());
        checked_solve(
            self.velocity_solver.as_mut(),
            SystemKind::Velocity,
            step,
            &self.work.rhs1,
            &mut self.work.q_star,
        )
    }

    /// `r2` from the ghosts at `n+1`, then `rhs2 = QT q* - r2`.
    fn rhs_poisson(&mut self) {
        BoundaryTerms::r2(&self.disc, &self.next_ghosts, &mut self.work.r2);
        self.ops
            .coupling
            .qt
            .mul_vec(&self.work.q_star, &mut self.work.rhs2);
        for (r, b) in self.work.rhs2.iter_mut().zip(&self.work.r2) {
            *r -= b;
        }
    }

    fn solve_poisson(&mut self, step: TimeStep) -> Result<SolveReport, StepError> {
        checked_solve(
            self.poisson_solver.as_mut(),
            SystemKind::Poisson,
            step,
            &self.work.rhs2,
            self.lambda.as_mut_slice(),
        )
    }

    /// `q = q* - BNQ λ`; the `n+1` ghosts become current.
    fn project(&mut self) {
        let q = self.q.as_mut_slice();
        q.copy_from_slice(&self.work.q_star);
        self.ops.bnq.mul_vec_add(-1.0, self.lambda.as_slice(), q);
        std::mem::swap(&mut self.ghosts, &mut self.next_ghosts);
    }

    /// Largest `|QT q - r2|` over the pressure rows.
    fn max_divergence(&mut self) -> f64 {
        let c = &mut self.work.constraint;
        self.ops.coupling.qt.mul_vec(self.q.as_slice(), c);
        for (v, b) in c.iter_mut().zip(&self.work.r2) {
            *v -= b;
        }
        max_abs(&c[..self.disc.num_pressure()])
    }

    /// Sum of the force unknowns per direction.
    fn body_force(&self) -> SmallVec<[f64; 3]> {
        let n = self.disc.num_body_points();
        if n == 0 {
            return SmallVec::new();
        }
        let lambda = self.lambda.as_slice();
        (0..self.disc.dim().count())
            .map(|c| {
                let start = self.disc.force_row(c, 0);
                lambda[start..start + n].iter().sum()
            })
            .collect()
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.iteration_log.flush()?;
        if let Some(log) = &mut self.force_log {
            log.flush()?;
        }
        Ok(())
    }
}

// ── NavierStokesSolver ──────────────────────────────────────────

/// Fractional-step solver for incompressible flow with an optional
/// immersed body.
///
/// # Example
///
/// ```ignore
/// let mut solver = NavierStokesSolver::new(SimulationConfig::load("cavity")?);
/// solver.run()?;
/// ```
pub struct NavierStokesSolver {
    config: SimulationConfig,
    state: SolverState,
    time_step: TimeStep,
    timings: Arc<StageTimings>,
    last_metrics: StepMetrics,
    run: Option<RunState>,
}

impl fmt::Debug for NavierStokesSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavierStokesSolver")
            .field("directory", &self.config.directory)
            .field("state", &self.state)
            .field("time_step", &self.time_step)
            .finish_non_exhaustive()
    }
}

impl NavierStokesSolver {
    /// Solver for a resolved configuration. Nothing is built until
    /// [`initialize()`](Self::initialize).
    pub fn new(config: SimulationConfig) -> Self {
        let time_step = TimeStep(config.parameters.start_step);
        Self {
            config,
            state: SolverState::Uninitialized,
            time_step,
            timings: StageTimings::new(),
            last_metrics: StepMetrics::default(),
            run: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Latest completed step (the start step before any step is taken).
    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    /// The configuration of this run.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Accumulated stage timings.
    pub fn timings(&self) -> &Arc<StageTimings> {
        &self.timings
    }

    /// Metrics of the latest step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Fluxes, once initialized.
    pub fn velocity(&self) -> Option<&VelocityField> {
        self.run.as_ref().map(|r| &r.q)
    }

    /// Pressure and body forces, once initialized.
    pub fn pressure_force(&self) -> Option<&PressureForceField> {
        self.run.as_ref().map(|r| &r.lambda)
    }

    /// Discretization, once initialized.
    pub fn discretization(&self) -> Option<&Discretization> {
        self.run.as_ref().map(|r| &r.disc)
    }

    /// Assembled operators, once initialized.
    pub fn operators(&self) -> Option<&SystemOperators> {
        self.run.as_ref().map(|r| &r.ops)
    }

    /// Vectors of the latest step, once initialized.
    pub fn vectors(&self) -> Option<&StepVectors> {
        self.run.as_ref().map(|r| &r.work)
    }

    /// Convection term carried to the next step, if any.
    pub fn convection_history(&self) -> Option<&[f64]> {
        self.run.as_ref().and_then(|r| r.explicit.history())
    }

    /// Whether the last step of the run has been taken.
    pub fn finished(&self) -> bool {
        let p = &self.config.parameters;
        self.time_step.0 >= p.start_step + p.nt
    }

    fn expect_state(&self, expected: SolverState) -> Result<(), StepError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(StepError::InvalidState {
                expected,
                found: self.state,
            })
        }
    }

    /// Build operators and solvers, then set the initial condition.
    ///
    /// Starting from step 0 the fluxes are the uniform initial velocity
    /// plus the optional perturbation, and the initial fields are saved.
    /// A nonzero start step reads that checkpoint, including the
    /// convection history and the boundary ghosts when they were saved.
    pub fn initialize(&mut self) -> Result<(), StepError> {
        self.expect_state(SolverState::Uninitialized)?;
        self.state = SolverState::Initializing;
        let _t = StageTimer::start(&self.timings, Stage::Initialize);
        let config = &self.config;
        let params = &config.parameters;
        let dir = config.directory.as_path();

        let disc = Discretization::new(
            config.mesh.clone(),
            config.flow.bcs.clone(),
            config.body.clone(),
        )?;
        let parts = Partitions::even(&disc, params.ranks)?;
        if params.ranks > 1 {
            let counts = count_implicit_nonzeros(&disc, &parts);
            for rank in 0..params.ranks {
                debug!(
                    rank,
                    rows = parts.velocity.range(rank).len(),
                    diag = counts.rank_diag(&parts.velocity, rank),
                    off = counts.rank_off(&parts.velocity, rank),
                    "velocity preallocation"
                );
            }
        }

        // 1. Scalings and operators.
        let scalings = DiagonalScalings::compute(&disc, params.dt);
        let coefficients = DiffusionCoefficients::new(params.diffusion, config.flow.nu);
        let laplacian = assemble_laplacian(&disc, &parts)?;
        let a = Arc::new(assemble_implicit_operator(
            &disc,
            &scalings,
            &coefficients,
            &parts,
        )?);
        let coupling = assemble_coupling(&disc, &parts)?;
        let bnq = assemble_bnq(&coupling.q, &scalings, &parts)?;
        let qtbnq = Arc::new(assemble_schur_complement(&coupling.qt, &bnq, &parts)?);
        let ops = SystemOperators {
            a,
            coupling,
            bnq,
            qtbnq,
        };
        if params.output_operators {
            write_operators(dir, &ops)?;
        }

        // 2. Solver handles; pressure is only defined up to a constant.
        let velocity_solver = create_solver(
            params.velocity_solve_type,
            SystemKind::Velocity,
            dir,
            Arc::clone(&ops.a),
        )?;
        let mut poisson_solver = create_solver(
            params.poisson_solve_type,
            SystemKind::Poisson,
            dir,
            Arc::clone(&ops.qtbnq),
        )?;
        if let Some(ns) = NullSpace::constant_on(disc.num_lambda(), 0..disc.num_pressure()) {
            poisson_solver.attach_null_space(ns);
        }

        // 3. Initial condition.
        let mut q = VelocityField::zeros(&disc.layout().velocity_sizes());
        let mut lambda = PressureForceField::zeros(&disc.lambda_sizes());
        let mut explicit = ExplicitTerms::new(params.convection, coefficients, laplacian);
        let fresh = params.start_step == 0;
        let mut saved_ghosts = None;
        if fresh {
            let u0 = config.flow.initial_velocity;
            let layout = disc.layout();
            for (row, v) in q.as_mut_slice().iter_mut().enumerate() {
                let (c, _) = layout.velocity_coords(row);
                *v = u0[c] / scalings.rinv[row];
            }
            if let Some((amplitude, frequency)) = config.flow.perturbation {
                add_perturbation(&disc, amplitude, frequency, q.as_mut_slice());
            }
        } else {
            let num_ghosts = BoundaryGhosts::count(&disc);
            let saved = read_checkpoint(dir, self.time_step, &mut q, &mut lambda, num_ghosts)?;
            if let Some(history) = saved.convection {
                explicit.set_history(history);
            }
            saved_ghosts = saved.ghosts;
        }
        let mut ghosts = BoundaryGhosts::initialize(&disc, &scalings, q.as_slice());
        if let Some(values) = saved_ghosts {
            ghosts.restore(&values)?;
        }

        // 4. Outputs.
        write_grid(dir, &config.mesh)?;
        let iteration_log = IterationLog::open(dir, fresh)?;
        let force_log = match disc.body() {
            Some(_) => Some(ForceLog::open(dir, fresh)?),
            None => None,
        };
        if fresh {
            let flat = ghosts.to_flat();
            let history = History {
                convection: None,
                ghosts: Some(&flat),
            };
            write_checkpoint(dir, self.time_step, &q, &lambda, history)?;
        }

        info!(
            velocity_unknowns = disc.num_velocity(),
            lambda_unknowns = disc.num_lambda(),
            nnz_a = ops.a.nnz(),
            nnz_qtbnq = ops.qtbnq.nnz(),
            start_step = self.time_step.0,
            convection = %params.convection,
            diffusion = %params.diffusion,
            "solver initialized"
        );
        let work = StepVectors::new(disc.num_velocity(), disc.num_lambda());
        self.run = Some(RunState {
            boundary: BoundaryTerms::new(&disc),
            next_ghosts: ghosts.clone(),
            ghosts,
            disc,
            scalings,
            coefficients,
            explicit,
            ops,
            velocity_solver,
            poisson_solver,
            q,
            lambda,
            work,
            iteration_log,
            force_log,
        });
        self.state = SolverState::Ready;
        Ok(())
    }

    /// Advance one time step.
    pub fn step_time(&mut self) -> Result<StepMetrics, StepError> {
        self.expect_state(SolverState::Ready)?;
        let started = Instant::now();
        let timings = Arc::clone(&self.timings);
        let run = self.run.as_mut().ok_or(StepError::InvalidState {
            expected: SolverState::Ready,
            found: self.state,
        })?;
        let step = self.time_step.next();
        self.time_step = step;

        self.state = SolverState::RhsVelocity;
        {
            let _t = StageTimer::start(&timings, Stage::RhsVelocity);
            run.rhs_velocity();
        }

        self.state = SolverState::SolveVelocity;
        let velocity = {
            let _t = StageTimer::start(&timings, Stage::SolveVelocity);
            run.solve_velocity(step)?
        };

        self.state = SolverState::RhsPoisson;
        {
            let _t = StageTimer::start(&timings, Stage::RhsPoisson);
            run.rhs_poisson();
        }

        self.state = SolverState::SolvePoisson;
        let poisson = {
            let _t = StageTimer::start(&timings, Stage::SolvePoisson);
            run.solve_poisson(step)?
        };

        self.state = SolverState::Projection;
        let max_divergence = {
            let _t = StageTimer::start(&timings, Stage::Projection);
            run.project();
            run.max_divergence()
        };

        let metrics = StepMetrics {
            step,
            velocity_iterations: velocity.iterations,
            poisson_iterations: poisson.iterations,
            velocity_residual: velocity.residual_norm,
            poisson_residual: poisson.residual_norm,
            max_divergence,
            force: run.body_force(),
            total_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        };
        debug!(
            step = step.0,
            velocity_iterations = metrics.velocity_iterations,
            poisson_iterations = metrics.poisson_iterations,
            max_divergence,
            "step complete"
        );
        self.last_metrics = metrics.clone();
        self.state = SolverState::Ready;
        Ok(metrics)
    }

    /// Log the latest step and save a checkpoint on the save cadence.
    ///
    /// The logs are flushed after every step, so they stay current if the
    /// process is killed.
    pub fn write_data(&mut self) -> Result<(), StepError> {
        self.expect_state(SolverState::Ready)?;
        let _t = StageTimer::start(&self.timings, Stage::Output);
        let run = self.run.as_mut().ok_or(StepError::InvalidState {
            expected: SolverState::Ready,
            found: self.state,
        })?;
        let step = self.time_step;
        let m = &self.last_metrics;
        if m.step == step && step.0 > self.config.parameters.start_step {
            run.iteration_log
                .record(step, m.velocity_iterations, m.poisson_iterations)?;
            if let Some(log) = &mut run.force_log {
                log.record(step, &m.force)?;
            }
            run.flush()?;
        }
        if step.is_multiple_of(self.config.parameters.nsave) {
            let ghosts = run.ghosts.to_flat();
            let history = History {
                convection: run.explicit.history(),
                ghosts: Some(&ghosts),
            };
            write_checkpoint(&self.config.directory, step, &run.q, &run.lambda, history)?;
            info!(step = step.0, "fields saved");
        }
        Ok(())
    }

    /// Flush logs, report stage timings and release the run.
    pub fn finalize(&mut self) -> Result<(), StepError> {
        self.expect_state(SolverState::Ready)?;
        self.state = SolverState::Finalizing;
        if let Some(run) = self.run.as_mut() {
            run.flush()?;
        }
        self.timings.report();
        self.run = None;
        self.state = SolverState::Done;
        info!(step = self.time_step.0, "run finalized");
        Ok(())
    }

    /// Initialize, step until finished, writing data after every step,
    /// then finalize.
    ///
    /// On error the logs are flushed before the error is returned.
    pub fn run(&mut self) -> Result<(), StepError> {
        let result = self.run_to_completion();
        if let Err(e) = &result {
            error!(step = self.time_step.0, error = %e, "simulation aborted");
            self.shutdown();
        }
        result
    }

    fn run_to_completion(&mut self) -> Result<(), StepError> {
        self.initialize()?;
        while !self.finished() {
            self.step_time()?;
            self.write_data()?;
        }
        self.finalize()
    }

    fn shutdown(&mut self) {
        if let Some(run) = self.run.as_mut() {
            if let Err(e) = run.flush() {
                warn!(error = %e, "could not flush logs during shutdown");
            }
        }
        self.timings.report();
    }
}

/// Dump `A`, `QT`, `BNQ` and `QTBNQ` as PETSc binary matrices.
fn write_operators(dir: &std::path::Path, ops: &SystemOperators) -> Result<(), IoError> {
    let out = dir.join(OPERATOR_DIR);
    fs::create_dir_all(&out).map_err(|source| IoError::Io {
        path: out.clone(),
        source,
    })?;
    write_matrix_file(&out.join("A.dat"), &ops.a)?;
    write_matrix_file(&out.join("QT.dat"), &ops.coupling.qt)?;
    write_matrix_file(&out.join("BNQ.dat"), &ops.bnq)?;
    write_matrix_file(&out.join("QTBNQ.dat"), &ops.qtbnq)?;
    info!(dir = %out.display(), "operators written");
    Ok(())
}
