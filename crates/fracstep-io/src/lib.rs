//! Run files of the fracstep flow solver.
//!
//! - [`petsc`]: the PETSc binary vector and matrix format
//! - [`checkpoint`]: per-step solution directories used for output and
//!   restart
//! - [`logs`]: `grid.txt`, `iterationCounts.txt` and `forces.txt`
//!
//! All binary I/O uses a hand-written big-endian codec; there is no serde
//! dependency here.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod error;
pub mod logs;
pub mod petsc;

pub use checkpoint::{
    checkpoint_dir, read_checkpoint, write_checkpoint, History, SavedHistory,
};
pub use error::IoError;
pub use logs::{write_grid, ForceLog, IterationLog};
pub use petsc::{read_vector_file, write_matrix_file, write_vector_file};
