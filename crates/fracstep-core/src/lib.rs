//! Core types for the fracstep incompressible flow solver.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the fracstep workspace:
//! strongly-typed identifiers, the multi-component field vector and the
//! configuration error shared by every crate that reads user input.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;

pub use error::ConfigError;
pub use field::{FieldVector, PressureForceField, VelocityField};
pub use id::{Axis, Dim, TimeStep};
