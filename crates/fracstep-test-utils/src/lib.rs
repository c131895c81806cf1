//! Test utilities for fracstep development.
//!
//! - [`cases`]: complete case directories (cavity, periodic box,
//!   cylinder) written to temporary directories.
//! - [`numeric`]: seeded random vectors and comparison helpers.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cases;
pub mod numeric;

pub use cases::CaseDir;
pub use numeric::{max_abs_diff, seeded_vector};
