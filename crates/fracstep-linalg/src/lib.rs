//! Sparse linear algebra for the fracstep flow solver.
//!
//! - [`CsrMatrix`] / [`CsrBuilder`]: compressed sparse row storage whose
//!   builder enforces exact per-row preallocation.
//! - [`NnzCounts`] and [`RowPartition`]: per-row nonzero counts split into
//!   diagonal-block and off-diagonal-block counts for a rank layout.
//! - [`LinearSolver`]: the capability set every backend implements, with
//!   two implementations, [`KrylovSolver`] (preconditioned conjugate
//!   gradients) and [`MultigridSolver`] (aggregation algebraic multigrid).
//! - [`NullSpace`]: a vector projected out of singular systems.
//! - [`SolverOptions`]: option files in prefixed-flag and key=value form.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod csr;
pub mod error;
pub mod krylov;
pub mod multigrid;
pub mod nnz;
pub mod nullspace;
pub mod options;
pub mod partition;
pub mod solver;
pub mod vector;

pub use csr::{CsrBuilder, CsrMatrix};
pub use error::{AssemblyError, SolverError};
pub use krylov::{KrylovSettings, KrylovSolver, PreconditionerKind};
pub use multigrid::{MultigridMode, MultigridSettings, MultigridSolver};
pub use nnz::NnzCounts;
pub use nullspace::NullSpace;
pub use options::SolverOptions;
pub use partition::RowPartition;
pub use solver::{ConvergedReason, LinearSolver, SolveReport};
