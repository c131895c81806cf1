//! Staggered Cartesian meshes for the fracstep flow solver.
//!
//! Provides the grid descriptor ([`CartesianMesh`]), boundary-condition
//! metadata ([`BoundaryConditions`]) and the staggered unknown numbering
//! ([`StaggeredLayout`]).
//!
//! Two-dimensional meshes are stored with a single unit-depth cell along
//! z, so flux and area formulas are written once for both dimensions.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod edge;
pub mod layout;
pub mod mesh;

pub use boundary::{BoundaryCondition, BoundaryConditions, BoundaryKind, BoundaryLocation, Side};
pub use edge::{resolve_axis, EdgeBehavior, Resolved};
pub use layout::{FaceRef, StaggeredLayout};
pub use mesh::{CartesianMesh, StretchedSegment};
