//! Operator assembly and explicit terms of the fractional-step scheme.
//!
//! Everything here works on a [`Discretization`]: the mesh, its boundary
//! conditions, the staggered numbering and an optional immersed body.
//!
//! - [`DiagonalScalings`]: `MHat`, `RInv`, `M` and `BN`.
//! - [`assemble_implicit_operator`]: `A = M/dt - θ ν L`.
//! - [`assemble_coupling`], [`assemble_bnq`],
//!   [`assemble_schur_complement`]: `QT`, `Q`, `BN Q` and `QT BN Q`.
//! - [`BoundaryGhosts`]: boundary values for every non-periodic face.
//! - [`ExplicitTerms`], [`BoundaryTerms`]: the explicit right-hand side `H`,
//!   the boundary vectors `bc1` and `r2`.
//!
//! Every matrix goes through a [`CsrBuilder`](fracstep_linalg::CsrBuilder)
//! preallocated from nonzero counts computed independently of the values.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary_terms;
pub mod coupling;
pub mod diagonal;
pub mod discretization;
pub mod explicit;
pub mod ghosts;
pub mod immersed;
pub mod implicit;
pub mod perturbation;
pub mod scheme;
pub mod stencil;

pub use boundary_terms::BoundaryTerms;
pub use coupling::{
    assemble_bnq, assemble_coupling, assemble_schur_complement, count_coupling_nonzeros,
    CouplingOperators,
};
pub use diagonal::DiagonalScalings;
pub use discretization::{Discretization, Partitions};
pub use explicit::{convection, ExplicitTerms};
pub use ghosts::BoundaryGhosts;
pub use immersed::{roma_delta, Body};
pub use implicit::{assemble_implicit_operator, assemble_laplacian, count_implicit_nonzeros};
pub use perturbation::add_perturbation;
pub use scheme::{ConvectionScheme, DiffusionCoefficients, DiffusionScheme};
pub use stencil::{laplacian_row, GhostTerm, StencilRow};
