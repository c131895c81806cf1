//! Fracstep: a fractional-step solver for incompressible flow with an
//! immersed boundary.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all fracstep sub-crates. For most users, adding `fracstep` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use fracstep::prelude::*;
//!
//! let config = SimulationConfig::load("cases/cavity")?;
//! let mut solver = NavierStokesSolver::new(config);
//! solver.run()?;
//! println!("finished at step {}", solver.time_step());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `fracstep-core` | Axes, dimensions, time steps, field vectors, `ConfigError` |
//! | [`grid`] | `fracstep-grid` | Stretched meshes, boundary conditions, staggered layout |
//! | [`linalg`] | `fracstep-linalg` | CSR matrices, preallocation counts, Krylov and multigrid backends |
//! | [`operators`] | `fracstep-operators` | Scalings, operator assembly, explicit and boundary terms, immersed bodies |
//! | [`io`] | `fracstep-io` | PETSc binary vectors and matrices, checkpoints, run logs |
//! | [`engine`] | `fracstep-engine` | Case loading, solver factory, the time-stepping state machine |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`fracstep-core`).
pub use fracstep_core as types;

/// Meshes and boundary conditions (`fracstep-grid`).
///
/// [`grid::CartesianMesh`] holds node coordinates per axis;
/// [`grid::StaggeredLayout`] numbers the flux unknowns.
pub use fracstep_grid as grid;

/// Sparse matrices and linear solvers (`fracstep-linalg`).
///
/// Both backends implement [`linalg::LinearSolver`]:
/// [`linalg::KrylovSolver`] and [`linalg::MultigridSolver`].
pub use fracstep_linalg as linalg;

/// Discrete operators (`fracstep-operators`).
pub use fracstep_operators as operators;

/// Field and log files (`fracstep-io`).
pub use fracstep_io as io;

/// Configuration and time stepping (`fracstep-engine`).
///
/// [`engine::NavierStokesSolver`] drives a run loaded with
/// [`engine::SimulationConfig::load`].
pub use fracstep_engine as engine;

/// Common imports for typical fracstep usage.
///
/// ```rust
/// use fracstep::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use fracstep_core::{Axis, ConfigError, Dim, FieldVector, TimeStep};

    // Grid
    pub use fracstep_grid::{BoundaryCondition, BoundaryConditions, BoundaryLocation, CartesianMesh};

    // Linear algebra
    pub use fracstep_linalg::{CsrMatrix, LinearSolver, SolveReport, SolverOptions};

    // Operators
    pub use fracstep_operators::{Body, ConvectionScheme, DiffusionScheme, Discretization};

    // Engine
    pub use fracstep_engine::{
        NavierStokesSolver, SimulationConfig, SolveType, SolverState, StepError, StepMetrics,
    };
}
