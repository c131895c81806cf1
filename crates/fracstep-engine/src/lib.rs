//! Fractional-step time integration for fracstep.
//!
//! Reads a case directory into a [`SimulationConfig`], builds the
//! operators and linear solvers of a run, and advances the flow with the
//! [`NavierStokesSolver`] state machine. Solver backends are chosen per
//! system by [`create_solver`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod solver;
pub mod timing;

pub use config::{IbmScheme, SimulationConfig, SimulationParameters, SolveType};
pub use error::StepError;
pub use factory::{create_solver, SystemKind};
pub use metrics::StepMetrics;
pub use solver::{NavierStokesSolver, SolverState, StepVectors, SystemOperators};
pub use timing::{Stage, StageTimer, StageTimings};
